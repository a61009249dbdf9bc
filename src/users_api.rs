use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::auth::TokenSource;
use crate::http_client::{endpoint, get_text, post_json_text};
use crate::prediction::PredictionRequest;
use crate::user::{CreditTransaction, CreditUpdate, UserProfile};

/// Account endpoints backing the profile holder.
pub trait ProfileSource: Send + Sync {
    fn fetch_profile(&self) -> Result<UserProfile>;
    /// Creates or updates the account after sign-in; returns the stored profile.
    fn sync_profile(&self) -> Result<UserProfile>;
}

/// Charges one prediction and answers with the server-side balance.
pub trait CreditLedger: Send + Sync {
    fn record_prediction(&self, uid: &str, request: &PredictionRequest) -> Result<u32>;
}

pub struct HttpUsersApi {
    base_url: String,
    timeout: Duration,
    tokens: Arc<dyn TokenSource>,
}

impl HttpUsersApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            tokens,
        }
    }

    fn bearer(&self) -> Result<String> {
        self.tokens.bearer_token().context("identity token unavailable")
    }
}

impl ProfileSource for HttpUsersApi {
    fn fetch_profile(&self) -> Result<UserProfile> {
        let url = endpoint(&self.base_url, &["users", "me"])?;
        let token = self.bearer()?;
        let body = get_text(url, self.timeout, Some(&token)).context("profile fetch")?;
        parse_profile_json(&body)
    }

    fn sync_profile(&self) -> Result<UserProfile> {
        let url = endpoint(&self.base_url, &["users", "auth", "sync"])?;
        let token = self.bearer()?;
        let body = post_json_text(url, &serde_json::json!({}), self.timeout, Some(&token))
            .context("profile sync")?;
        parse_profile_json(&body)
    }
}

impl CreditLedger for HttpUsersApi {
    fn record_prediction(&self, uid: &str, request: &PredictionRequest) -> Result<u32> {
        let url = endpoint(&self.base_url, &["users", "predict"])?;
        let token = self.bearer()?;
        let tx = CreditTransaction {
            firebase_uid: uid,
            prediction_data: request,
            new_credits: 0,
        };
        let body = post_json_text(url, &tx, self.timeout, Some(&token)).context("credit update")?;
        parse_credit_update_json(&body).map(|update| update.new_credits)
    }
}

pub fn parse_profile_json(raw: &str) -> Result<UserProfile> {
    serde_json::from_str(raw.trim()).context("invalid profile json")
}

pub fn parse_credit_update_json(raw: &str) -> Result<CreditUpdate> {
    serde_json::from_str(raw.trim()).context("invalid credit update json")
}
