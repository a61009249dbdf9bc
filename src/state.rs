use std::collections::VecDeque;
use std::time::Instant;

use crate::orchestrator::{PredictError, PredictEvent, PredictionForm, PredictionJob, precheck};
use crate::player::{
    HeadToHeadCount, NextMatch, PlayerIdentity, Surface, TournamentCategory, cycle_option,
};
use crate::prediction::{PredictionResult, Side};
use crate::profile::ProfileHolder;
use crate::user::UserProfile;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Predict,
    Matches,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerCard {
    pub identity: Option<PlayerIdentity>,
    pub loading: bool,
}

impl PlayerCard {
    pub fn name(&self) -> &str {
        self.identity.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInput {
    pub side: usize,
    pub buffer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Dismissable error that stops the action.
    Blocking,
    /// Informational, the action already went through.
    Advisory,
    /// Offers the purchase flow.
    Recharge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    pub side: Side,
    pub started: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictBlocked {
    /// A prediction is already in flight.
    Busy,
    Rejected(PredictError),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub players: [PlayerCard; 2],
    pub search_error: Option<String>,
    pub input: Option<SearchInput>,
    pub h2h: Option<HeadToHeadCount>,
    pub h2h_loading: bool,
    pub h2h_dirty: bool,
    pub surface: Option<Surface>,
    pub category: Option<TournamentCategory>,
    pub profile: ProfileHolder,
    pub signed_in: bool,
    /// Bumped on sign-out; answers tagged with an older value are dropped.
    pub session: u64,
    pub predict_busy: bool,
    pub prediction: Option<PredictionResult>,
    pub celebration: Option<Celebration>,
    pub celebration_fired: bool,
    pub notice: Option<Notice>,
    pub next_matches: Vec<NextMatch>,
    pub matches_selected: usize,
    pub matches_loading: bool,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Predict,
            players: [PlayerCard::default(), PlayerCard::default()],
            search_error: None,
            input: None,
            h2h: None,
            h2h_loading: false,
            h2h_dirty: false,
            surface: None,
            category: None,
            profile: ProfileHolder::new(),
            signed_in: false,
            session: 0,
            predict_busy: false,
            prediction: None,
            celebration: None,
            celebration_fired: false,
            notice: None,
            next_matches: Vec::new(),
            matches_selected: 0,
            matches_loading: false,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn player_names(&self) -> (&str, &str) {
        (self.players[0].name(), self.players[1].name())
    }

    pub fn prediction_form(&self) -> PredictionForm {
        let (p1, p2) = self.player_names();
        PredictionForm {
            player1: p1.to_string(),
            player2: p2.to_string(),
            surface: self.surface,
            category: self.category,
        }
    }

    /// Marks a side as searching; the card keeps its previous player until the
    /// result arrives.
    pub fn begin_search(&mut self, side: usize) {
        if let Some(card) = self.players.get_mut(side) {
            card.loading = true;
        }
        self.search_error = None;
    }

    /// Head-to-head pair to fetch after a player changed, if both sides are set.
    pub fn take_h2h_request(&mut self) -> Option<(String, String)> {
        if !self.h2h_dirty {
            return None;
        }
        self.h2h_dirty = false;
        let (p1, p2) = self.player_names();
        if p1.is_empty() || p2.is_empty() {
            self.h2h = None;
            self.h2h_loading = false;
            return None;
        }
        let pair = (p1.to_string(), p2.to_string());
        self.h2h_loading = true;
        Some(pair)
    }

    pub fn cycle_surface(&mut self) {
        self.surface = cycle_option(self.surface, &Surface::ALL);
    }

    pub fn cycle_category(&mut self) {
        self.category = cycle_option(self.category, &TournamentCategory::ALL);
    }

    /// Prefills the form from an upcoming match. Players still have to be searched.
    pub fn apply_match_selection(&mut self, m: &NextMatch) {
        self.surface = Surface::normalize(&m.surface);
        self.category = TournamentCategory::normalize(&m.tournament_type);
        self.begin_search(0);
        self.begin_search(1);
        self.screen = Screen::Predict;
    }

    pub fn selected_next_match(&self) -> Option<&NextMatch> {
        self.next_matches.get(self.matches_selected)
    }

    pub fn select_next(&mut self) {
        if self.matches_selected + 1 < self.next_matches.len() {
            self.matches_selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.matches_selected = self.matches_selected.saturating_sub(1);
    }

    /// Runs the pre-flight checks and, when they pass, enters the busy state.
    /// Nothing is sent over the network from here.
    pub fn begin_prediction(&mut self) -> Result<PredictionJob, PredictBlocked> {
        if self.predict_busy {
            return Err(PredictBlocked::Busy);
        }
        let form = self.prediction_form();
        match precheck(self.profile.credit_status(), self.profile.uid(), &form) {
            Ok(mut job) => {
                job.session = self.session;
                self.predict_busy = true;
                self.notice = None;
                self.prediction = None;
                self.celebration = None;
                self.push_log(format!(
                    "[INFO] Predicting {} vs {} ({}, {})",
                    job.player1,
                    job.player2,
                    job.surface.as_str(),
                    job.category.label()
                ));
                Ok(job)
            }
            Err(err) => {
                let kind = match err {
                    PredictError::InsufficientCredits => NoticeKind::Recharge,
                    _ => NoticeKind::Blocking,
                };
                self.notice = Some(Notice {
                    kind,
                    text: err.user_message().to_string(),
                });
                self.push_log(format!("[INFO] Prediction not started: {err}"));
                Err(PredictBlocked::Rejected(err))
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn sign_out(&mut self) {
        self.profile.sign_out();
        self.signed_in = false;
        self.session += 1;
        self.push_log("[INFO] Signed out");
    }

    fn show_prediction(&mut self, result: PredictionResult) {
        let (left, right) = result.percentages();
        self.push_log(format!("[INFO] Prediction {left}% / {right}%"));
        self.prediction = Some(result);
        self.celebration_fired = false;
        self.maybe_celebrate();
    }

    /// Fires the one-shot effect toward the favourite of the current result.
    fn maybe_celebrate(&mut self) {
        if self.celebration_fired {
            return;
        }
        let Some(side) = self.prediction.and_then(|r| r.favourite()) else {
            return;
        };
        self.celebration = Some(Celebration {
            side,
            started: Instant::now(),
        });
        self.celebration_fired = true;
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    PlayerFound {
        side: usize,
        player: PlayerIdentity,
    },
    PlayerSearchFailed {
        side: usize,
        name: String,
        error: String,
    },
    HeadToHead {
        p1: String,
        p2: String,
        result: Result<HeadToHeadCount, String>,
    },
    SetNextMatches(Result<Vec<NextMatch>, String>),
    ProfileLoading {
        session: u64,
    },
    ProfileLoaded {
        session: u64,
        result: Result<UserProfile, String>,
    },
    Predict {
        session: u64,
        event: PredictEvent,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    SearchPlayer { side: usize, name: String },
    FetchHeadToHead { p1: String, p2: String },
    FetchNextMatches,
    SignIn { session: u64 },
    RefreshProfile { session: u64 },
    Predict(PredictionJob),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::PlayerFound { side, player } => {
            let Some(card) = state.players.get_mut(side) else {
                return;
            };
            let changed = card.name() != player.name;
            card.identity = Some(player);
            card.loading = false;
            if changed {
                state.h2h_dirty = true;
                state.prediction = None;
                state.celebration = None;
            }
        }
        Delta::PlayerSearchFailed { side, name, error } => {
            if let Some(card) = state.players.get_mut(side) {
                card.loading = false;
            }
            state.search_error = Some(format!(
                "Could not find {name:?}. Check the name and try again."
            ));
            state.push_log(format!("[WARN] Player search error: {error}"));
        }
        Delta::HeadToHead { p1, p2, result } => {
            // Drop answers for a pair that is no longer on screen.
            if state.player_names() != (p1.as_str(), p2.as_str()) {
                return;
            }
            state.h2h_loading = false;
            match result {
                Ok(h2h) => state.h2h = Some(h2h),
                Err(err) => {
                    state.h2h = Some(HeadToHeadCount::default());
                    state.push_log(format!("[WARN] H2H error: {err}"));
                }
            }
        }
        Delta::SetNextMatches(result) => {
            state.matches_loading = false;
            match result {
                Ok(matches) => {
                    state.push_log(format!("[INFO] {} upcoming matches", matches.len()));
                    state.next_matches = matches;
                }
                Err(err) => {
                    state.next_matches.clear();
                    state.push_log(format!("[WARN] Upcoming matches error: {err}"));
                }
            }
            state.matches_selected = state
                .matches_selected
                .min(state.next_matches.len().saturating_sub(1));
        }
        Delta::ProfileLoading { session } => {
            if session == state.session {
                state.profile.begin_load();
            }
        }
        Delta::ProfileLoaded { session, result } => {
            if session != state.session {
                state.push_log("[INFO] Dropped profile answer from a signed-out session");
                return;
            }
            match &result {
                Ok(profile) => {
                    state.signed_in = true;
                    state.push_log(format!(
                        "[INFO] Profile loaded: {} ({} credits)",
                        profile.label(),
                        profile.credits
                    ));
                }
                Err(err) => state.push_log(format!("[WARN] Profile error: {err}")),
            }
            state.profile.apply_loaded(result);
        }
        Delta::Predict { session, event } => apply_predict_event(state, session, event),
        Delta::Log(msg) => state.push_log(msg),
    }
}

fn apply_predict_event(state: &mut AppState, session: u64, event: PredictEvent) {
    let current_session = session == state.session;
    match event {
        PredictEvent::Result {
            player1,
            player2,
            result,
        } => {
            // The cards changed while the job was running.
            if state.player_names() != (player1.as_str(), player2.as_str()) {
                state.push_log(format!(
                    "[INFO] Dropped prediction for {player1} vs {player2}"
                ));
                return;
            }
            state.show_prediction(result);
        }
        PredictEvent::CreditsConfirmed(_) | PredictEvent::CreditsStale(_) if !current_session => {
            state.push_log("[INFO] Dropped credit update from a signed-out session");
        }
        PredictEvent::CreditsConfirmed(balance) => {
            state.profile.apply_credit_delta(balance);
            state.push_log(format!("[INFO] Credits now {balance}"));
        }
        PredictEvent::CreditsStale(err) => {
            state.push_log(format!("[WARN] {err}"));
            state.profile.mark_credits_stale(err.to_string());
            state.notice = Some(Notice {
                kind: NoticeKind::Advisory,
                text: err.user_message().to_string(),
            });
        }
        PredictEvent::Failed(err) => {
            state.push_log(format!("[ERR] {err}"));
            state.prediction = None;
            state.celebration = None;
            state.notice = Some(Notice {
                kind: if err.is_blocking() {
                    NoticeKind::Blocking
                } else {
                    NoticeKind::Advisory
                },
                text: err.user_message().to_string(),
            });
        }
        PredictEvent::Settled => state.predict_busy = false,
    }
}
