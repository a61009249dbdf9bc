use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use h2h_terminal::profile::{CreditStatus, ProfileHolder};
use h2h_terminal::user::UserProfile;
use h2h_terminal::users_api::ProfileSource;

struct SequenceSource {
    answers: Vec<Option<u32>>,
    calls: AtomicUsize,
}

impl SequenceSource {
    fn new(answers: Vec<Option<u32>>) -> Self {
        Self {
            answers,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ProfileSource for SequenceSource {
    fn fetch_profile(&self) -> Result<UserProfile> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(idx).copied().flatten() {
            Some(credits) => Ok(UserProfile {
                firebase_uid: "uid-9".to_string(),
                email: None,
                display_name: Some("Nine".to_string()),
                photo_url: None,
                credits,
                created_at: None,
                updated_at: None,
            }),
            None => Err(anyhow::anyhow!("http 401: token expired")),
        }
    }

    fn sync_profile(&self) -> Result<UserProfile> {
        self.fetch_profile()
    }
}

#[test]
fn starts_unknown_and_loads() {
    let source = SequenceSource::new(vec![Some(7)]);
    let mut holder = ProfileHolder::new();
    assert_eq!(holder.credit_status(), CreditStatus::Unknown);
    assert_eq!(holder.uid(), None);

    holder.load_profile(&source);
    assert_eq!(holder.credit_status(), CreditStatus::Known(7));
    assert_eq!(holder.uid(), Some("uid-9"));
    assert!(!holder.is_loading());
    assert!(holder.error().is_none());
}

#[test]
fn failed_refresh_drops_the_old_balance() {
    let source = SequenceSource::new(vec![Some(7), None]);
    let mut holder = ProfileHolder::new();
    holder.load_profile(&source);
    holder.refresh(&source);
    assert_eq!(holder.credit_status(), CreditStatus::Unknown);
    assert!(holder.profile().is_none());
    assert!(holder.error().is_some_and(|e| e.contains("401")));
}

#[test]
fn credit_delta_replaces_balance_and_clears_stale() {
    let source = SequenceSource::new(vec![Some(5)]);
    let mut holder = ProfileHolder::new();
    holder.load_profile(&source);

    holder.mark_credits_stale("ledger down");
    let since = holder.credits_stale_since().expect("stale after failure");
    holder.mark_credits_stale("ledger still down");
    assert_eq!(holder.credits_stale_since(), Some(since));
    assert_eq!(holder.stale_reason(), Some("ledger still down"));

    holder.apply_credit_delta(4);
    assert_eq!(holder.credit_status(), CreditStatus::Known(4));
    assert!(holder.credits_stale_since().is_none());
    assert!(holder.profile().is_some_and(|p| p.updated_at.is_some()));
}

#[test]
fn latest_completion_wins() {
    let mut holder = ProfileHolder::new();
    holder.begin_load();
    assert!(holder.is_loading());
    holder.apply_loaded(Err("first attempt failed".to_string()));
    holder.apply_loaded(Ok(UserProfile {
        firebase_uid: "uid-1".to_string(),
        email: None,
        display_name: None,
        photo_url: None,
        credits: 2,
        created_at: None,
        updated_at: None,
    }));
    assert_eq!(holder.credit_status(), CreditStatus::Known(2));
    assert!(holder.error().is_none());
}

#[test]
fn sign_out_forgets_everything() {
    let source = SequenceSource::new(vec![Some(3)]);
    let mut holder = ProfileHolder::new();
    holder.load_profile(&source);
    holder.sign_out();
    assert_eq!(holder.credit_status(), CreditStatus::Unknown);
    assert!(holder.uid().is_none());
}
