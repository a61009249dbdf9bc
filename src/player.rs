use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "actual_rank")]
    pub rank: Option<u32>,
    #[serde(default)]
    pub min_rank: Option<u32>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, rename = "height")]
    pub height_cm: Option<u32>,
    #[serde(default)]
    pub hand: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl PlayerIdentity {
    /// Identity known only by name, before any metadata is fetched.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: None,
            rank: None,
            min_rank: None,
            age: None,
            height_cm: None,
            hand: None,
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadToHeadCount {
    pub p1_wins: u32,
    pub p2_wins: u32,
    /// False when the backend has no meeting on record for the pair.
    pub met: bool,
}

impl HeadToHeadCount {
    pub fn total(&self) -> u32 {
        self.p1_wins + self.p2_wins
    }

    /// Rounded share of meetings won by each side, 50/50 when they never met.
    pub fn percentages(&self) -> (u32, u32) {
        let total = self.total();
        if total == 0 {
            return (50, 50);
        }
        let left = ((self.p1_wins as f64 / total as f64) * 100.0).round() as u32;
        (left, 100 - left)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NextMatch {
    pub date: String,
    pub tournament: String,
    pub tournament_type: String,
    pub surface: String,
    pub player1: String,
    pub player2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Hard, Surface::Clay, Surface::Grass];

    /// Maps free text (English or Spanish court names) onto the closed set.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hard" | "dura" => Some(Surface::Hard),
            "clay" | "arcilla" => Some(Surface::Clay),
            "grass" | "césped" | "cesped" => Some(Surface::Grass),
            _ => None,
        }
    }

    /// Value sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Hard => "Hard",
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TournamentCategory {
    GrandSlam,
    Masters1000,
    AtpTour,
    TourFinals,
    DavisCup,
    Olympics,
}

impl TournamentCategory {
    pub const ALL: [TournamentCategory; 6] = [
        TournamentCategory::GrandSlam,
        TournamentCategory::Masters1000,
        TournamentCategory::AtpTour,
        TournamentCategory::TourFinals,
        TournamentCategory::DavisCup,
        TournamentCategory::Olympics,
    ];

    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "g" | "grand slam" | "grand slams" | "gs" => Some(TournamentCategory::GrandSlam),
            "m" | "masters" | "masters 1000" | "masters1000" => {
                Some(TournamentCategory::Masters1000)
            }
            "a" | "atp" | "atp tour" | "tour" | "other tour-level events" | "atp 250"
            | "atp 500" => Some(TournamentCategory::AtpTour),
            "f" | "finals" | "tour finals" => Some(TournamentCategory::TourFinals),
            "d" | "davis" | "davis cup" => Some(TournamentCategory::DavisCup),
            "o" | "olympics" | "olimpicos" | "olímpicos" | "olimpics" => {
                Some(TournamentCategory::Olympics)
            }
            _ => None,
        }
    }

    /// Single-letter tier code the backend expects.
    pub fn code(self) -> &'static str {
        match self {
            TournamentCategory::GrandSlam => "G",
            TournamentCategory::Masters1000 => "M",
            TournamentCategory::AtpTour => "A",
            TournamentCategory::TourFinals => "F",
            TournamentCategory::DavisCup => "D",
            TournamentCategory::Olympics => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TournamentCategory::GrandSlam => "Grand Slam",
            TournamentCategory::Masters1000 => "Masters 1000",
            TournamentCategory::AtpTour => "ATP Tour",
            TournamentCategory::TourFinals => "Tour Finals",
            TournamentCategory::DavisCup => "Davis Cup",
            TournamentCategory::Olympics => "Olympics",
        }
    }
}

/// Steps through `None -> all[0] -> .. -> all[n-1] -> None`, the selector order.
pub fn cycle_option<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => {
            let idx = all.iter().position(|v| *v == value)?;
            all.get(idx + 1).copied()
        }
    }
}
