use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::auth::{TokenSource, uid_from_id_token};
use crate::config::{AppConfig, BackendKind};
use crate::demo_backend::DemoBackend;
use crate::directory::{HttpPlayerDirectory, PlayerDirectory};
use crate::orchestrator::Orchestrator;
use crate::predict_api::{HttpPredictionService, PredictionService};
use crate::state::{Delta, ProviderCommand};
use crate::users_api::{CreditLedger, HttpUsersApi, ProfileSource};

/// Remote collaborators the worker talks to.
pub struct Services {
    pub directory: Arc<dyn PlayerDirectory>,
    pub predictor: Arc<dyn PredictionService>,
    pub profiles: Option<Arc<dyn ProfileSource>>,
    pub ledger: Arc<dyn CreditLedger>,
    pub tokens: Option<Arc<dyn TokenSource>>,
}

impl Services {
    pub fn from_config(cfg: &AppConfig, tokens: Option<Arc<dyn TokenSource>>) -> Self {
        match cfg.backend {
            BackendKind::Demo => {
                let demo = Arc::new(DemoBackend::new(cfg.demo_credits));
                Self {
                    directory: demo.clone(),
                    predictor: demo.clone(),
                    profiles: Some(demo.clone()),
                    ledger: demo,
                    tokens,
                }
            }
            BackendKind::Http => {
                let directory = Arc::new(HttpPlayerDirectory::new(
                    cfg.api_url.clone(),
                    cfg.directory_timeout,
                ));
                let predictor = Arc::new(HttpPredictionService::new(
                    cfg.predict_api_url.clone(),
                    cfg.predict_timeout,
                ));
                let users = tokens.clone().map(|tokens| {
                    Arc::new(HttpUsersApi::new(cfg.api_url.clone(), cfg.users_timeout, tokens))
                });
                let ledger: Arc<dyn CreditLedger> = match users.clone() {
                    Some(users) => users,
                    None => Arc::new(SignedOutLedger),
                };
                Self {
                    directory,
                    predictor,
                    profiles: users.map(|u| u as Arc<dyn ProfileSource>),
                    ledger,
                    tokens,
                }
            }
        }
    }
}

struct SignedOutLedger;

impl CreditLedger for SignedOutLedger {
    fn record_prediction(
        &self,
        _uid: &str,
        _request: &crate::prediction::PredictionRequest,
    ) -> anyhow::Result<u32> {
        Err(anyhow::anyhow!("no identity token configured"))
    }
}

pub fn spawn_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    services: Services,
    cfg: AppConfig,
) {
    thread::spawn(move || {
        // Lookups run in arrival order here; predictions get their own thread.
        while let Ok(cmd) = cmd_rx.recv() {
            handle_command(cmd, &services, &cfg, &tx);
        }
    });
}

fn handle_command(cmd: ProviderCommand, services: &Services, cfg: &AppConfig, tx: &Sender<Delta>) {
    match cmd {
        ProviderCommand::SearchPlayer { side, name } => {
            let delta = match services.directory.player(&name) {
                Ok(player) => Delta::PlayerFound { side, player },
                Err(err) => Delta::PlayerSearchFailed {
                    side,
                    name,
                    error: format!("{err:#}"),
                },
            };
            let _ = tx.send(delta);
        }
        ProviderCommand::FetchHeadToHead { p1, p2 } => {
            let result = services
                .directory
                .head_to_head(&p1, &p2)
                .map_err(|err| format!("{err:#}"));
            let _ = tx.send(Delta::HeadToHead { p1, p2, result });
        }
        ProviderCommand::FetchNextMatches => {
            let result = services
                .directory
                .next_matches()
                .map_err(|err| format!("{err:#}"));
            let _ = tx.send(Delta::SetNextMatches(result));
        }
        ProviderCommand::SignIn { session } => {
            let Some(profiles) = services.profiles.as_ref() else {
                let _ = tx.send(Delta::Log(
                    "[INFO] No identity token configured; credits unavailable".to_string(),
                ));
                return;
            };
            if let Some(tokens) = services.tokens.as_ref()
                && let Ok(token) = tokens.bearer_token()
                && let Some(uid) = uid_from_id_token(&token)
            {
                let _ = tx.send(Delta::Log(format!("[INFO] Signing in as {uid}")));
            }
            let _ = tx.send(Delta::ProfileLoading { session });
            let result = profiles.sync_profile().map_err(|err| format!("{err:#}"));
            let _ = tx.send(Delta::ProfileLoaded { session, result });
        }
        ProviderCommand::RefreshProfile { session } => {
            let Some(profiles) = services.profiles.as_ref() else {
                let _ = tx.send(Delta::Log(
                    "[INFO] Profile refresh unavailable while signed out".to_string(),
                ));
                return;
            };
            let _ = tx.send(Delta::ProfileLoading { session });
            let result = profiles.fetch_profile().map_err(|err| format!("{err:#}"));
            let _ = tx.send(Delta::ProfileLoaded { session, result });
        }
        ProviderCommand::Predict(job) => {
            let directory = Arc::clone(&services.directory);
            let predictor = Arc::clone(&services.predictor);
            let ledger = Arc::clone(&services.ledger);
            let think_delay = cfg.think_delay;
            let tx = tx.clone();
            thread::spawn(move || {
                let session = job.session;
                Orchestrator::new(directory.as_ref(), predictor.as_ref(), ledger.as_ref())
                    .with_think_delay(think_delay)
                    .execute(&job, &mut |event| {
                        let _ = tx.send(Delta::Predict { session, event });
                    });
            });
        }
    }
}
