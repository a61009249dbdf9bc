use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PREDICT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_USERS_TIMEOUT_SECS: u64 = 10;
const DEFAULT_THINK_MS: u64 = 3000;
const DEFAULT_DEMO_CREDITS: u32 = 5;
const DEFAULT_PLANS_URL: &str = "https://h2h.example/plans";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Demo,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub api_url: String,
    pub predict_api_url: String,
    pub directory_timeout: Duration,
    pub predict_timeout: Duration,
    pub users_timeout: Duration,
    pub think_delay: Duration,
    pub plans_url: String,
    pub auth_token: Option<String>,
    pub auth_token_file: Option<PathBuf>,
    pub demo_credits: u32,
    pub default_player1: Option<String>,
    pub default_player2: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_url = opt_env("API_URL")
            .map(|url| trim_base_url(&url))
            .unwrap_or_default();
        let predict_api_url = opt_env("PREDICT_API_URL")
            .map(|url| trim_base_url(&url))
            .unwrap_or_else(|| api_url.clone());

        let backend = match opt_env("BACKEND").map(|v| v.trim().to_ascii_lowercase()) {
            Some(kind) if kind == "http" => BackendKind::Http,
            Some(kind) if kind == "demo" => BackendKind::Demo,
            _ if api_url.is_empty() => BackendKind::Demo,
            _ => BackendKind::Http,
        };

        Self {
            backend,
            api_url,
            predict_api_url,
            directory_timeout: timeout_env("DIRECTORY_TIMEOUT_SECS", DEFAULT_DIRECTORY_TIMEOUT_SECS),
            predict_timeout: timeout_env("PREDICT_TIMEOUT_SECS", DEFAULT_PREDICT_TIMEOUT_SECS),
            users_timeout: timeout_env("USERS_TIMEOUT_SECS", DEFAULT_USERS_TIMEOUT_SECS),
            think_delay: Duration::from_millis(
                env::var("PREDICT_THINK_MS")
                    .ok()
                    .and_then(|val| val.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_THINK_MS)
                    .min(10_000),
            ),
            plans_url: opt_env("PLANS_URL").unwrap_or_else(|| DEFAULT_PLANS_URL.to_string()),
            auth_token: opt_env("AUTH_TOKEN").map(|s| s.trim().to_string()),
            auth_token_file: opt_env("AUTH_TOKEN_FILE").map(PathBuf::from),
            demo_credits: env::var("DEMO_CREDITS")
                .ok()
                .and_then(|val| val.trim().parse::<u32>().ok())
                .unwrap_or(DEFAULT_DEMO_CREDITS),
            default_player1: opt_env("DEFAULT_PLAYER1"),
            default_player2: opt_env("DEFAULT_PLAYER2"),
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.backend {
            BackendKind::Http => "HTTP",
            BackendKind::Demo => "DEMO",
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}

fn timeout_env(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        env::var(key)
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(default_secs)
            .clamp(1, 120),
    )
}

fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::trim_base_url;

    #[test]
    fn base_urls_lose_trailing_slashes() {
        assert_eq!(trim_base_url(" http://api.local/ "), "http://api.local");
        assert_eq!(trim_base_url("http://api.local//"), "http://api.local");
    }
}
