use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use h2h_terminal::directory::{PlayerDirectory, parse_comparison_json};
use h2h_terminal::orchestrator::{Orchestrator, PredictError, PredictEvent, PredictionJob};
use h2h_terminal::player::{
    HeadToHeadCount, NextMatch, PlayerIdentity, Surface, TournamentCategory,
};
use h2h_terminal::predict_api::PredictionService;
use h2h_terminal::prediction::{PredictionRequest, PredictionResult, Side};
use h2h_terminal::profile::CreditStatus;
use h2h_terminal::state::{
    AppState, Delta, NoticeKind, PredictBlocked, apply_delta,
};
use h2h_terminal::user::UserProfile;
use h2h_terminal::users_api::CreditLedger;

const COMPARE_JSON: &str = include_str!("fixtures/compare.json");

struct FakeDirectory {
    fail: bool,
    compare_calls: AtomicUsize,
}

impl FakeDirectory {
    fn ok() -> Self {
        Self {
            fail: false,
            compare_calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            compare_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }
}

impl PlayerDirectory for FakeDirectory {
    fn player(&self, name: &str) -> Result<PlayerIdentity> {
        Ok(PlayerIdentity::named(name))
    }

    fn head_to_head(&self, _p1: &str, _p2: &str) -> Result<HeadToHeadCount> {
        Ok(HeadToHeadCount::default())
    }

    fn compare(
        &self,
        _p1: &str,
        _p2: &str,
        _surface: Surface,
        _category: TournamentCategory,
    ) -> Result<PredictionRequest> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow::anyhow!("http 500: directory down"));
        }
        parse_comparison_json(COMPARE_JSON)
    }

    fn next_matches(&self) -> Result<Vec<NextMatch>> {
        Ok(Vec::new())
    }
}

struct FakePredictor {
    answer: (f64, f64),
    calls: AtomicUsize,
}

impl FakePredictor {
    fn new(p1: f64, p2: f64) -> Self {
        Self {
            answer: (p1, p2),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PredictionService for FakePredictor {
    fn predict(&self, _request: &PredictionRequest) -> Result<PredictionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PredictionResult::validated(self.answer.0, self.answer.1, None)
            .map_err(|reason| anyhow::anyhow!("malformed prediction: {reason}"))
    }
}

struct FakeLedger {
    balance: Mutex<u32>,
    fail: bool,
    calls: AtomicUsize,
    last_uid: Mutex<Option<String>>,
}

impl FakeLedger {
    fn with_balance(balance: u32) -> Self {
        Self {
            balance: Mutex::new(balance),
            fail: false,
            calls: AtomicUsize::new(0),
            last_uid: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_balance(0)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CreditLedger for FakeLedger {
    fn record_prediction(&self, uid: &str, _request: &PredictionRequest) -> Result<u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_uid.lock().unwrap() = Some(uid.to_string());
        if self.fail {
            return Err(anyhow::anyhow!("http 503: ledger unavailable"));
        }
        let mut balance = self.balance.lock().unwrap();
        *balance = balance.saturating_sub(1);
        Ok(*balance)
    }
}

fn profile(credits: u32) -> UserProfile {
    UserProfile {
        firebase_uid: "uid-123".to_string(),
        email: Some("fan@example.com".to_string()),
        display_name: None,
        photo_url: None,
        credits,
        created_at: None,
        updated_at: None,
    }
}

fn ready_state(credits: Option<u32>) -> AppState {
    let mut state = AppState::new();
    apply_delta(
        &mut state,
        Delta::PlayerFound {
            side: 0,
            player: PlayerIdentity::named("Carlos Alcaraz"),
        },
    );
    apply_delta(
        &mut state,
        Delta::PlayerFound {
            side: 1,
            player: PlayerIdentity::named("Rafael Nadal"),
        },
    );
    state.surface = Some(Surface::Clay);
    state.category = Some(TournamentCategory::GrandSlam);
    if let Some(credits) = credits {
        let session = state.session;
        apply_delta(
            &mut state,
            Delta::ProfileLoaded {
                session,
                result: Ok(profile(credits)),
            },
        );
    }
    state
}

fn run(
    state: &mut AppState,
    job: &PredictionJob,
    directory: &FakeDirectory,
    predictor: &FakePredictor,
    ledger: &FakeLedger,
) -> Vec<PredictEvent> {
    let mut events = Vec::new();
    Orchestrator::new(directory, predictor, ledger).execute(job, &mut |ev| events.push(ev));
    for event in events.clone() {
        apply_delta(
            state,
            Delta::Predict {
                session: job.session,
                event,
            },
        );
    }
    events
}

#[test]
fn paid_prediction_shows_result_and_new_balance() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.62, 0.38);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().expect("prediction should start");
    assert!(state.predict_busy);
    assert_eq!(job.uid.as_deref(), Some("uid-123"));

    let events = run(&mut state, &job, &directory, &predictor, &ledger);
    assert_eq!(events.last(), Some(&PredictEvent::Settled));
    assert_eq!(state.prediction.map(|r| r.percentages()), Some((62, 38)));
    assert_eq!(state.profile.credit_status(), CreditStatus::Known(4));
    assert!(state.profile.credits_stale_since().is_none());
    assert!(!state.predict_busy);
    assert!(state.notice.is_none());
    assert_eq!(
        (directory.calls(), predictor.calls(), ledger.calls()),
        (1, 1, 1)
    );
    assert_eq!(ledger.last_uid.lock().unwrap().as_deref(), Some("uid-123"));
}

#[test]
fn zero_credits_make_no_remote_calls() {
    let mut state = ready_state(Some(0));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.5, 0.5);
    let ledger = FakeLedger::with_balance(0);

    let blocked = state.begin_prediction();
    assert_eq!(
        blocked,
        Err(PredictBlocked::Rejected(PredictError::InsufficientCredits))
    );
    assert!(!state.predict_busy);
    assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Recharge));
    assert_eq!(
        (directory.calls(), predictor.calls(), ledger.calls()),
        (0, 0, 0)
    );
}

#[test]
fn incomplete_form_makes_no_remote_calls() {
    let mut state = ready_state(Some(3));
    state.surface = None;
    let blocked = state.begin_prediction();
    assert!(matches!(
        blocked,
        Err(PredictBlocked::Rejected(PredictError::Validation(_)))
    ));
    assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Blocking));
    assert!(!state.predict_busy);
}

#[test]
fn directory_failure_skips_prediction_and_ledger() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::failing();
    let predictor = FakePredictor::new(0.62, 0.38);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().unwrap();
    let events = run(&mut state, &job, &directory, &predictor, &ledger);

    assert!(matches!(
        events.as_slice(),
        [PredictEvent::Failed(PredictError::RemoteLookup(_)), PredictEvent::Settled]
    ));
    assert_eq!((predictor.calls(), ledger.calls()), (0, 0));
    assert!(state.prediction.is_none());
    assert!(!state.predict_busy);
    assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Blocking));
    assert_eq!(state.profile.credit_status(), CreditStatus::Known(5));
}

#[test]
fn malformed_prediction_is_a_service_error() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.7, 0.7);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().unwrap();
    let events = run(&mut state, &job, &directory, &predictor, &ledger);

    assert!(matches!(
        events.first(),
        Some(PredictEvent::Failed(PredictError::PredictionService(_)))
    ));
    assert_eq!(ledger.calls(), 0);
    assert!(state.prediction.is_none());
    assert_eq!(state.profile.credit_status(), CreditStatus::Known(5));
}

#[test]
fn ledger_failure_keeps_prediction_and_marks_balance_stale() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.62, 0.38);
    let ledger = FakeLedger::failing();

    let job = state.begin_prediction().unwrap();
    run(&mut state, &job, &directory, &predictor, &ledger);

    assert_eq!(state.prediction.map(|r| r.percentages()), Some((62, 38)));
    assert_eq!(state.profile.credit_status(), CreditStatus::Known(5));
    assert!(state.profile.credits_stale_since().is_some());
    assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Advisory));
    assert!(!state.predict_busy);
    assert_eq!(ledger.calls(), 1);
}

#[test]
fn second_press_while_busy_is_ignored() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.62, 0.38);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().expect("first press starts");
    assert_eq!(state.begin_prediction(), Err(PredictBlocked::Busy));
    assert!(state.predict_busy);

    run(&mut state, &job, &directory, &predictor, &ledger);
    assert_eq!(
        (directory.calls(), predictor.calls(), ledger.calls()),
        (1, 1, 1)
    );
    assert_eq!(state.profile.credit_status(), CreditStatus::Known(4));
    assert!(!state.predict_busy);
}

#[test]
fn unknown_balance_still_predicts_without_charging() {
    let mut state = ready_state(None);
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.62, 0.38);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().expect("unknown balance does not block");
    assert_eq!(job.uid, None);
    run(&mut state, &job, &directory, &predictor, &ledger);

    assert!(state.prediction.is_some());
    assert_eq!(ledger.calls(), 0);
    assert_eq!(state.profile.credit_status(), CreditStatus::Unknown);
    assert!(state.profile.credits_stale_since().is_some());
}

#[test]
fn celebration_fires_once_toward_the_favourite() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.38, 0.62);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().unwrap();
    run(&mut state, &job, &directory, &predictor, &ledger);
    let first = state.celebration.expect("celebration should start");
    assert_eq!(first.side, Side::Right);

    // Credit updates after the result do not restart the effect.
    apply_delta(
        &mut state,
        Delta::Predict {
            session: job.session,
            event: PredictEvent::CreditsConfirmed(3),
        },
    );
    assert_eq!(state.celebration.map(|c| c.started), Some(first.started));
}

#[test]
fn tie_has_no_celebration() {
    let mut state = ready_state(Some(5));
    let directory = FakeDirectory::ok();
    let predictor = FakePredictor::new(0.5, 0.5);
    let ledger = FakeLedger::with_balance(5);

    let job = state.begin_prediction().unwrap();
    run(&mut state, &job, &directory, &predictor, &ledger);
    assert_eq!(state.prediction.map(|r| r.percentages()), Some((50, 50)));
    assert!(state.celebration.is_none());
}
