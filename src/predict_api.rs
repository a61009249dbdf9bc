use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http_client::{endpoint, post_json_text};
use crate::prediction::{PredictionRequest, PredictionResult};

pub trait PredictionService: Send + Sync {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;
}

pub struct HttpPredictionService {
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl PredictionService for HttpPredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let url = endpoint(&self.base_url, &["api", "v1", "predict"])?;
        let body = post_json_text(url, request, self.timeout, None).context("predict call")?;
        parse_predict_response_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct PredictOutput {
    #[serde(default)]
    prediction: Option<u8>,
    probability_p1_wins: f64,
    probability_p2_wins: f64,
}

#[derive(Debug, Deserialize)]
struct PredictEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<PredictOutput>,
}

/// Accepts either the bare model output or the `{success, data, ..}` envelope.
pub fn parse_predict_response_json(raw: &str) -> Result<PredictionResult> {
    let trimmed = raw.trim();
    let value: serde_json::Value =
        serde_json::from_str(trimmed).context("invalid prediction json")?;

    let output = if value.get("probability_p1_wins").is_some() {
        serde_json::from_value::<PredictOutput>(value).context("invalid prediction output")?
    } else {
        let envelope: PredictEnvelope =
            serde_json::from_value(value).context("invalid prediction envelope")?;
        if envelope.success == Some(false) {
            let reason = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "unspecified".to_string());
            return Err(anyhow::anyhow!("prediction rejected: {reason}"));
        }
        envelope
            .data
            .ok_or_else(|| anyhow::anyhow!("prediction envelope has no data"))?
    };

    PredictionResult::validated(
        output.probability_p1_wins,
        output.probability_p2_wins,
        output.prediction,
    )
    .map_err(|reason| anyhow::anyhow!("malformed prediction: {reason}"))
}
