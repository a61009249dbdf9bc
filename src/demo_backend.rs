//! Offline stand-in for the player, prediction and user services.
//!
//! Used when no `API_URL` is configured so the terminal can be explored without the
//! backend. Answers are deterministic; the credit balance lives in memory.

use std::sync::Mutex;

use anyhow::Result;

use crate::directory::PlayerDirectory;
use crate::player::{HeadToHeadCount, NextMatch, PlayerIdentity, Surface, TournamentCategory};
use crate::predict_api::PredictionService;
use crate::prediction::{PredictionRequest, PredictionResult};
use crate::user::UserProfile;
use crate::users_api::{CreditLedger, ProfileSource};

const DEMO_UID: &str = "demo-user";
const CREDITS_PER_PREDICTION: u32 = 1;

struct SeedPlayer {
    name: &'static str,
    country: &'static str,
    rank: u32,
    min_rank: u32,
    age: u32,
    height_cm: u32,
    left_handed: bool,
    // First-serve in, first-serve won, second-serve won, return points won.
    serve: (f64, f64, f64, f64),
    clay: f64,
    grass: f64,
    hard: f64,
    recent: f64,
}

const SEED_PLAYERS: &[SeedPlayer] = &[
    SeedPlayer {
        name: "Carlos Alcaraz",
        country: "ESP",
        rank: 2,
        min_rank: 1,
        age: 23,
        height_cm: 183,
        left_handed: false,
        serve: (0.66, 0.74, 0.56, 0.41),
        clay: 0.86,
        grass: 0.88,
        hard: 0.80,
        recent: 0.84,
    },
    SeedPlayer {
        name: "Rafael Nadal",
        country: "ESP",
        rank: 150,
        min_rank: 1,
        age: 40,
        height_cm: 185,
        left_handed: true,
        serve: (0.68, 0.71, 0.57, 0.42),
        clay: 0.91,
        grass: 0.78,
        hard: 0.78,
        recent: 0.55,
    },
    SeedPlayer {
        name: "Jannik Sinner",
        country: "ITA",
        rank: 1,
        min_rank: 1,
        age: 25,
        height_cm: 191,
        left_handed: false,
        serve: (0.62, 0.76, 0.56, 0.40),
        clay: 0.78,
        grass: 0.80,
        hard: 0.86,
        recent: 0.88,
    },
    SeedPlayer {
        name: "Novak Djokovic",
        country: "SRB",
        rank: 5,
        min_rank: 1,
        age: 39,
        height_cm: 188,
        left_handed: false,
        serve: (0.65, 0.75, 0.57, 0.41),
        clay: 0.80,
        grass: 0.85,
        hard: 0.84,
        recent: 0.70,
    },
    SeedPlayer {
        name: "Holger Rune",
        country: "DEN",
        rank: 9,
        min_rank: 4,
        age: 23,
        height_cm: 188,
        left_handed: false,
        serve: (0.63, 0.72, 0.53, 0.37),
        clay: 0.68,
        grass: 0.60,
        hard: 0.64,
        recent: 0.60,
    },
    SeedPlayer {
        name: "Giovanni Mpetshi",
        country: "FRA",
        rank: 43,
        min_rank: 29,
        age: 23,
        height_cm: 203,
        left_handed: false,
        serve: (0.61, 0.80, 0.54, 0.30),
        clay: 0.45,
        grass: 0.62,
        hard: 0.55,
        recent: 0.52,
    },
];

// (player a, player b, wins a, wins b)
const SEED_H2H: &[(&str, &str, u32, u32)] = &[
    ("Carlos Alcaraz", "Rafael Nadal", 1, 2),
    ("Carlos Alcaraz", "Jannik Sinner", 7, 4),
    ("Carlos Alcaraz", "Novak Djokovic", 3, 5),
    ("Jannik Sinner", "Novak Djokovic", 5, 4),
    ("Holger Rune", "Novak Djokovic", 2, 4),
    ("Rafael Nadal", "Novak Djokovic", 29, 31),
];

pub struct DemoBackend {
    credits: Mutex<u32>,
}

impl DemoBackend {
    pub fn new(credits: u32) -> Self {
        Self {
            credits: Mutex::new(credits),
        }
    }

    fn balance(&self) -> Result<u32> {
        self.credits
            .lock()
            .map(|guard| *guard)
            .map_err(|_| anyhow::anyhow!("demo ledger lock poisoned"))
    }

    fn profile(&self) -> Result<UserProfile> {
        Ok(UserProfile {
            firebase_uid: DEMO_UID.to_string(),
            email: Some("demo@h2h.local".to_string()),
            display_name: Some("Demo".to_string()),
            photo_url: None,
            credits: self.balance()?,
            created_at: None,
            updated_at: None,
        })
    }
}

fn seed(name: &str) -> Result<&'static SeedPlayer> {
    SEED_PLAYERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| anyhow::anyhow!("http 404 Not Found: player {name:?} not found"))
}

fn h2h(a: &str, b: &str) -> HeadToHeadCount {
    for (x, y, wx, wy) in SEED_H2H {
        if x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b) {
            return HeadToHeadCount {
                p1_wins: *wx,
                p2_wins: *wy,
                met: true,
            };
        }
        if x.eq_ignore_ascii_case(b) && y.eq_ignore_ascii_case(a) {
            return HeadToHeadCount {
                p1_wins: *wy,
                p2_wins: *wx,
                met: true,
            };
        }
    }
    HeadToHeadCount::default()
}

fn surface_rate(p: &SeedPlayer, surface: Surface) -> f64 {
    match surface {
        Surface::Hard => p.hard,
        Surface::Clay => p.clay,
        Surface::Grass => p.grass,
    }
}

fn tourney_rate(p: &SeedPlayer, category: TournamentCategory) -> f64 {
    let bump = match category {
        TournamentCategory::GrandSlam | TournamentCategory::TourFinals => 0.04,
        TournamentCategory::Masters1000 => 0.02,
        _ => 0.0,
    };
    (p.recent + bump).min(0.99)
}

impl PlayerDirectory for DemoBackend {
    fn player(&self, name: &str) -> Result<PlayerIdentity> {
        let p = seed(name)?;
        Ok(PlayerIdentity {
            name: p.name.to_string(),
            country: Some(p.country.to_string()),
            rank: Some(p.rank),
            min_rank: Some(p.min_rank),
            age: Some(p.age),
            height_cm: Some(p.height_cm),
            hand: Some(if p.left_handed { "Left-handed" } else { "Right-handed" }.to_string()),
            image_url: None,
        })
    }

    fn head_to_head(&self, p1: &str, p2: &str) -> Result<HeadToHeadCount> {
        seed(p1)?;
        seed(p2)?;
        Ok(h2h(p1, p2))
    }

    fn compare(
        &self,
        p1: &str,
        p2: &str,
        surface: Surface,
        category: TournamentCategory,
    ) -> Result<PredictionRequest> {
        let a = seed(p1)?;
        let b = seed(p2)?;
        let meetings = h2h(p1, p2);
        let hand = |p: &SeedPlayer| if p.left_handed { 0.0 } else { 1.0 };
        Ok(PredictionRequest {
            p1_age: a.age as f64,
            p2_age: b.age as f64,
            p1_ht: a.height_cm as f64,
            p2_ht: b.height_cm as f64,
            p1_hand_encoded: hand(a),
            p2_hand_encoded: hand(b),
            p1_rank: a.rank as f64,
            p2_rank: b.rank as f64,
            p1_min_rank: a.min_rank as f64,
            p2_min_rank: b.min_rank as f64,
            p1_pct_1st_in: a.serve.0,
            p2_pct_1st_in: b.serve.0,
            p1_pct_1st_won: a.serve.1,
            p2_pct_1st_won: b.serve.1,
            p1_pct_2nd_won: a.serve.2,
            p2_pct_2nd_won: b.serve.2,
            p1_pct_sv_pts_won: a.serve.0 * a.serve.1 + (1.0 - a.serve.0) * a.serve.2,
            p2_pct_sv_pts_won: b.serve.0 * b.serve.1 + (1.0 - b.serve.0) * b.serve.2,
            p1_pct_bp_conv: 0.40,
            p2_pct_bp_conv: 0.40,
            p1_pct_bp_saved: 0.63,
            p2_pct_bp_saved: 0.63,
            p1_pct_1st_ret_pts_won: a.serve.3 - 0.08,
            p2_pct_1st_ret_pts_won: b.serve.3 - 0.08,
            p1_pct_2nd_ret_pts_won: a.serve.3 + 0.12,
            p2_pct_2nd_ret_pts_won: b.serve.3 + 0.12,
            p1_h2h_won: meetings.p1_wins as f64,
            p2_h2h_won: meetings.p2_wins as f64,
            p1_rec_perf: a.recent,
            p2_rec_perf: b.recent,
            p1_surface_w_rate: surface_rate(a, surface),
            p2_surface_w_rate: surface_rate(b, surface),
            p1_tourney_w_rate: tourney_rate(a, category),
            p2_tourney_w_rate: tourney_rate(b, category),
        })
    }

    fn next_matches(&self) -> Result<Vec<NextMatch>> {
        let row = |date: &str, tournament: &str, kind: &str, surface: &str, p1: &str, p2: &str| {
            NextMatch {
                date: date.to_string(),
                tournament: tournament.to_string(),
                tournament_type: kind.to_string(),
                surface: surface.to_string(),
                player1: p1.to_string(),
                player2: p2.to_string(),
            }
        };
        Ok(vec![
            row("2026-10-20", "Paris", "M", "Hard", "Jannik Sinner", "Carlos Alcaraz"),
            row("2026-10-21", "Vienna", "A", "Hard", "Holger Rune", "Giovanni Mpetshi"),
            row("2026-11-09", "Turin", "F", "Hard", "Novak Djokovic", "Jannik Sinner"),
            row("2026-11-18", "Malaga", "D", "Hard", "Rafael Nadal", "Holger Rune"),
        ])
    }
}

impl PredictionService for DemoBackend {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let form = (request.p1_surface_w_rate - request.p2_surface_w_rate) * 3.0
            + (request.p1_rec_perf - request.p2_rec_perf) * 2.0
            + (request.p1_pct_sv_pts_won - request.p2_pct_sv_pts_won) * 4.0;
        let rank = (request.p2_rank.max(1.0).ln() - request.p1_rank.max(1.0).ln()) * 0.35;
        let meetings = (request.p1_h2h_won - request.p2_h2h_won) * 0.03;
        let p1 = 1.0 / (1.0 + (-(form + rank + meetings)).exp());
        PredictionResult::validated(p1, 1.0 - p1, Some(if p1 >= 0.5 { 0 } else { 1 }))
            .map_err(|reason| anyhow::anyhow!("demo model produced {reason}"))
    }
}

impl ProfileSource for DemoBackend {
    fn fetch_profile(&self) -> Result<UserProfile> {
        self.profile()
    }

    fn sync_profile(&self) -> Result<UserProfile> {
        self.profile()
    }
}

impl CreditLedger for DemoBackend {
    fn record_prediction(&self, uid: &str, _request: &PredictionRequest) -> Result<u32> {
        if uid != DEMO_UID {
            return Err(anyhow::anyhow!("http 404 Not Found: user {uid:?} not found"));
        }
        let mut credits = self
            .credits
            .lock()
            .map_err(|_| anyhow::anyhow!("demo ledger lock poisoned"))?;
        if *credits < CREDITS_PER_PREDICTION {
            return Err(anyhow::anyhow!("http 402 Payment Required: insufficient credits"));
        }
        *credits -= CREDITS_PER_PREDICTION;
        Ok(*credits)
    }
}
