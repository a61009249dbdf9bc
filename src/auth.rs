//! Seam to the external identity provider.
//!
//! The terminal never signs users in itself: an ID token is minted elsewhere and
//! handed over through the environment or a file that the provider's tooling keeps
//! fresh. Tokens are read again for every authenticated call and never cached.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::config::AppConfig;

pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Result<String>;
}

/// A token fixed for the lifetime of the process (`AUTH_TOKEN`).
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A token file rewritten by an external refresher (`AUTH_TOKEN_FILE`).
pub struct FileToken(pub PathBuf);

impl TokenSource for FileToken {
    fn bearer_token(&self) -> Result<String> {
        let raw = fs::read_to_string(&self.0)
            .with_context(|| format!("read token file {}", self.0.display()))?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(anyhow::anyhow!("token file {} is empty", self.0.display()));
        }
        Ok(token.to_string())
    }
}

pub fn token_source_from_config(cfg: &AppConfig) -> Option<Box<dyn TokenSource>> {
    if let Some(path) = cfg.auth_token_file.clone() {
        return Some(Box::new(FileToken(path)));
    }
    cfg.auth_token
        .clone()
        .map(|token| Box::new(StaticToken(token)) as Box<dyn TokenSource>)
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

/// Reads the account id out of a JWT payload without verifying it; the backend
/// does the verification.
pub fn uid_from_id_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims
        .user_id
        .or(claims.sub)
        .filter(|uid| !uid.trim().is_empty())
}
