//! In-memory owner of the signed-in user's profile and credit balance.
//!
//! There is one holder per session, owned by the UI state. Its transitions are the
//! only way the balance changes: a whole-profile replace after a fetch, and a
//! server-confirmed credit update after a paid prediction.

use chrono::{DateTime, Utc};

use crate::user::UserProfile;
use crate::users_api::ProfileSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditStatus {
    /// No profile loaded (signed out, loading, or the fetch failed).
    Unknown,
    Known(u32),
}

#[derive(Debug, Clone, Default)]
pub struct ProfileHolder {
    profile: Option<UserProfile>,
    error: Option<String>,
    loading: bool,
    credits_stale_since: Option<DateTime<Utc>>,
    stale_reason: Option<String>,
}

impl ProfileHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn credit_status(&self) -> CreditStatus {
        match &self.profile {
            Some(profile) => CreditStatus::Known(profile.credits),
            None => CreditStatus::Unknown,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.firebase_uid.as_str())
    }

    pub fn credits_stale_since(&self) -> Option<DateTime<Utc>> {
        self.credits_stale_since
    }

    pub fn stale_reason(&self) -> Option<&str> {
        self.stale_reason.as_deref()
    }

    /// Fetches and stores the profile in one step.
    pub fn load_profile(&mut self, source: &dyn ProfileSource) {
        self.begin_load();
        let result = source.fetch_profile().map_err(|err| format!("{err:#}"));
        self.apply_loaded(result);
    }

    pub fn refresh(&mut self, source: &dyn ProfileSource) {
        self.load_profile(source);
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Completes a load started elsewhere. The most recent completion wins.
    pub fn apply_loaded(&mut self, result: Result<UserProfile, String>) {
        self.loading = false;
        match result {
            Ok(profile) => {
                self.profile = Some(profile);
                self.error = None;
                self.clear_stale();
            }
            Err(err) => {
                // A failed fetch must not leave an outdated balance on screen.
                self.profile = None;
                self.error = Some(err);
                self.clear_stale();
            }
        }
    }

    /// Replaces the cached balance with the ledger's answer.
    pub fn apply_credit_delta(&mut self, new_balance: u32) {
        if let Some(profile) = self.profile.as_mut() {
            profile.credits = new_balance;
            profile.updated_at = Some(Utc::now());
        }
        self.clear_stale();
    }

    pub fn mark_credits_stale(&mut self, reason: impl Into<String>) {
        if self.credits_stale_since.is_none() {
            self.credits_stale_since = Some(Utc::now());
        }
        self.stale_reason = Some(reason.into());
    }

    pub fn sign_out(&mut self) {
        *self = Self::default();
    }

    fn clear_stale(&mut self) {
        self.credits_stale_since = None;
        self.stale_reason = None;
    }
}
