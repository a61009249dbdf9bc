//! The credit-gated "predict" action.
//!
//! `precheck` validates the form against the cached credit status without touching
//! the network. `Orchestrator::execute` then runs the three remote calls in a fixed
//! order and reports progress as [`PredictEvent`]s, always finishing with
//! [`PredictEvent::Settled`].

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::directory::PlayerDirectory;
use crate::player::{Surface, TournamentCategory};
use crate::predict_api::PredictionService;
use crate::prediction::PredictionResult;
use crate::profile::CreditStatus;
use crate::users_api::CreditLedger;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionForm {
    pub player1: String,
    pub player2: String,
    pub surface: Option<Surface>,
    pub category: Option<TournamentCategory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionJob {
    pub player1: String,
    pub player2: String,
    pub surface: Surface,
    pub category: TournamentCategory,
    /// Account charged for the prediction, when a profile is loaded.
    pub uid: Option<String>,
    /// Sign-in session the job was started in.
    pub session: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingPlayers,
    MissingSurface,
    MissingCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictError {
    Validation(ValidationError),
    InsufficientCredits,
    RemoteLookup(String),
    PredictionService(String),
    CreditLedger(String),
}

impl PredictError {
    /// Short text for the notice shown to the user; details go to the console.
    pub fn user_message(&self) -> &'static str {
        match self {
            PredictError::Validation(ValidationError::MissingPlayers) => {
                "Search both players before predicting."
            }
            PredictError::Validation(ValidationError::MissingSurface) => {
                "Select the match surface."
            }
            PredictError::Validation(ValidationError::MissingCategory) => {
                "Select the tournament type."
            }
            PredictError::InsufficientCredits => {
                "No credits left. Recharge to keep predicting."
            }
            PredictError::RemoteLookup(_) | PredictError::PredictionService(_) => {
                "Could not get the prediction. Try again."
            }
            PredictError::CreditLedger(_) => {
                "Credits may be out of date. Refresh to confirm."
            }
        }
    }

    /// Ledger trouble never retracts a prediction that was already shown.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, PredictError::CreditLedger(_))
    }
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::Validation(kind) => write!(f, "validation failed: {kind:?}"),
            PredictError::InsufficientCredits => write!(f, "insufficient credits"),
            PredictError::RemoteLookup(detail) => write!(f, "player lookup failed: {detail}"),
            PredictError::PredictionService(detail) => write!(f, "prediction failed: {detail}"),
            PredictError::CreditLedger(detail) => write!(f, "credit update failed: {detail}"),
        }
    }
}

impl std::error::Error for PredictError {}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictEvent {
    /// Probabilities for the pair the job was started with.
    Result {
        player1: String,
        player2: String,
        result: PredictionResult,
    },
    CreditsConfirmed(u32),
    CreditsStale(PredictError),
    Failed(PredictError),
    Settled,
}

/// Checks run before any network call, first failure wins.
pub fn precheck(
    credits: CreditStatus,
    uid: Option<&str>,
    form: &PredictionForm,
) -> Result<PredictionJob, PredictError> {
    // An unknown balance is not a zero balance.
    if credits == CreditStatus::Known(0) {
        return Err(PredictError::InsufficientCredits);
    }
    let player1 = form.player1.trim();
    let player2 = form.player2.trim();
    if player1.is_empty() || player2.is_empty() {
        return Err(PredictError::Validation(ValidationError::MissingPlayers));
    }
    let Some(surface) = form.surface else {
        return Err(PredictError::Validation(ValidationError::MissingSurface));
    };
    let Some(category) = form.category else {
        return Err(PredictError::Validation(ValidationError::MissingCategory));
    };
    Ok(PredictionJob {
        player1: player1.to_string(),
        player2: player2.to_string(),
        surface,
        category,
        uid: uid.map(str::to_string),
        session: 0,
    })
}

pub struct Orchestrator<'a> {
    directory: &'a dyn PlayerDirectory,
    predictor: &'a dyn PredictionService,
    ledger: &'a dyn CreditLedger,
    think_delay: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        directory: &'a dyn PlayerDirectory,
        predictor: &'a dyn PredictionService,
        ledger: &'a dyn CreditLedger,
    ) -> Self {
        Self {
            directory,
            predictor,
            ledger,
            think_delay: Duration::ZERO,
        }
    }

    /// Minimum time the "thinking" state stays visible before the first call.
    pub fn with_think_delay(mut self, delay: Duration) -> Self {
        self.think_delay = delay;
        self
    }

    pub fn execute(&self, job: &PredictionJob, emit: &mut dyn FnMut(PredictEvent)) {
        if let Err(err) = self.run(job, emit) {
            emit(PredictEvent::Failed(err));
        }
        emit(PredictEvent::Settled);
    }

    fn run(&self, job: &PredictionJob, emit: &mut dyn FnMut(PredictEvent)) -> Result<(), PredictError> {
        if !self.think_delay.is_zero() {
            thread::sleep(self.think_delay);
        }

        let features = self
            .directory
            .compare(&job.player1, &job.player2, job.surface, job.category)
            .map_err(|err| PredictError::RemoteLookup(format!("{err:#}")))?;

        let result = self
            .predictor
            .predict(&features)
            .map_err(|err| PredictError::PredictionService(format!("{err:#}")))?;
        emit(PredictEvent::Result {
            player1: job.player1.clone(),
            player2: job.player2.clone(),
            result,
        });

        let Some(uid) = job.uid.as_deref() else {
            emit(PredictEvent::CreditsStale(PredictError::CreditLedger(
                "no profile loaded".to_string(),
            )));
            return Ok(());
        };
        match self.ledger.record_prediction(uid, &features) {
            Ok(balance) => emit(PredictEvent::CreditsConfirmed(balance)),
            Err(err) => emit(PredictEvent::CreditsStale(PredictError::CreditLedger(format!(
                "{err:#}"
            )))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PredictionForm {
        PredictionForm {
            player1: "Carlos Alcaraz".to_string(),
            player2: "Rafael Nadal".to_string(),
            surface: Some(Surface::Clay),
            category: Some(TournamentCategory::GrandSlam),
        }
    }

    #[test]
    fn zero_credits_checked_before_form() {
        let empty = PredictionForm::default();
        assert_eq!(
            precheck(CreditStatus::Known(0), Some("u1"), &empty),
            Err(PredictError::InsufficientCredits)
        );
    }

    #[test]
    fn unknown_credits_do_not_block() {
        let job = precheck(CreditStatus::Unknown, None, &form()).unwrap();
        assert_eq!(job.uid, None);
        assert_eq!(job.surface, Surface::Clay);
    }

    #[test]
    fn validation_order_is_players_surface_category() {
        let mut f = PredictionForm {
            player2: "  ".to_string(),
            surface: None,
            category: None,
            ..form()
        };
        assert_eq!(
            precheck(CreditStatus::Known(3), None, &f),
            Err(PredictError::Validation(ValidationError::MissingPlayers))
        );
        f.player2 = "Rafael Nadal".to_string();
        assert_eq!(
            precheck(CreditStatus::Known(3), None, &f),
            Err(PredictError::Validation(ValidationError::MissingSurface))
        );
        f.surface = Some(Surface::Grass);
        assert_eq!(
            precheck(CreditStatus::Known(3), None, &f),
            Err(PredictError::Validation(ValidationError::MissingCategory))
        );
    }

    #[test]
    fn names_are_trimmed_into_the_job() {
        let f = PredictionForm {
            player1: " Carlos Alcaraz ".to_string(),
            ..form()
        };
        let job = precheck(CreditStatus::Known(1), Some("u1"), &f).unwrap();
        assert_eq!(job.player1, "Carlos Alcaraz");
        assert_eq!(job.uid.as_deref(), Some("u1"));
    }
}
