use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::prediction::PredictionRequest;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub firebase_uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub credits: u32,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(&self.firebase_uid)
    }
}

/// Ledger request for one paid prediction.
#[derive(Debug, Clone, Serialize)]
pub struct CreditTransaction<'a> {
    pub firebase_uid: &'a str,
    pub prediction_data: &'a PredictionRequest,
    /// Placeholder; the ledger computes the deduction and answers with the balance.
    pub new_credits: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditUpdate {
    #[serde(default)]
    pub firebase_uid: Option<String>,
    pub new_credits: u32,
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Backend timestamps arrive either with an offset or as naive UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::parse_timestamp;

    #[test]
    fn parses_naive_and_offset_timestamps() {
        let naive = parse_timestamp("2025-07-01T12:34:56.123456").unwrap();
        assert_eq!((naive.year(), naive.hour(), naive.second()), (2025, 12, 56));

        let offset = parse_timestamp("2025-07-01T14:00:00+02:00").unwrap();
        assert_eq!(offset.hour(), 12);

        assert!(parse_timestamp("yesterday").is_none());
    }
}
