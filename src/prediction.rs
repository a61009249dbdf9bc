use serde::{Deserialize, Serialize};

pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Feature payload shared by the prediction model and the credit ledger.
///
/// Field names follow the model's schema verbatim. Every field is required on
/// decode: a comparison response with a missing or null feature is rejected
/// rather than zero-filled here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub p1_age: f64,
    pub p2_age: f64,
    pub p1_ht: f64,
    pub p2_ht: f64,
    pub p1_hand_encoded: f64,
    pub p2_hand_encoded: f64,
    pub p1_rank: f64,
    pub p2_rank: f64,
    pub p1_min_rank: f64,
    pub p2_min_rank: f64,
    #[serde(rename = "p1_pct_1stIn")]
    pub p1_pct_1st_in: f64,
    #[serde(rename = "p2_pct_1stIn")]
    pub p2_pct_1st_in: f64,
    #[serde(rename = "p1_pct_1stWon")]
    pub p1_pct_1st_won: f64,
    #[serde(rename = "p2_pct_1stWon")]
    pub p2_pct_1st_won: f64,
    #[serde(rename = "p1_pct_2ndWon")]
    pub p1_pct_2nd_won: f64,
    #[serde(rename = "p2_pct_2ndWon")]
    pub p2_pct_2nd_won: f64,
    #[serde(rename = "p1_pct_SvPtsWon")]
    pub p1_pct_sv_pts_won: f64,
    #[serde(rename = "p2_pct_SvPtsWon")]
    pub p2_pct_sv_pts_won: f64,
    #[serde(rename = "p1_pct_bpConv")]
    pub p1_pct_bp_conv: f64,
    #[serde(rename = "p2_pct_bpConv")]
    pub p2_pct_bp_conv: f64,
    #[serde(rename = "p1_pct_bpSaved")]
    pub p1_pct_bp_saved: f64,
    #[serde(rename = "p2_pct_bpSaved")]
    pub p2_pct_bp_saved: f64,
    #[serde(rename = "p1_pct_1stRetPtsWon")]
    pub p1_pct_1st_ret_pts_won: f64,
    #[serde(rename = "p2_pct_1stRetPtsWon")]
    pub p2_pct_1st_ret_pts_won: f64,
    #[serde(rename = "p1_pct_2ndRetPtsWon")]
    pub p1_pct_2nd_ret_pts_won: f64,
    #[serde(rename = "p2_pct_2ndRetPtsWon")]
    pub p2_pct_2nd_ret_pts_won: f64,
    pub p1_h2h_won: f64,
    pub p2_h2h_won: f64,
    #[serde(rename = "p1_recPerf")]
    pub p1_rec_perf: f64,
    #[serde(rename = "p2_recPerf")]
    pub p2_rec_perf: f64,
    #[serde(rename = "p1_surface_wRate")]
    pub p1_surface_w_rate: f64,
    #[serde(rename = "p2_surface_wRate")]
    pub p2_surface_w_rate: f64,
    #[serde(rename = "p1_tourney_wRate")]
    pub p1_tourney_w_rate: f64,
    #[serde(rename = "p2_tourney_wRate")]
    pub p2_tourney_w_rate: f64,
}

impl PredictionRequest {
    pub fn values(&self) -> [f64; 34] {
        [
            self.p1_age,
            self.p2_age,
            self.p1_ht,
            self.p2_ht,
            self.p1_hand_encoded,
            self.p2_hand_encoded,
            self.p1_rank,
            self.p2_rank,
            self.p1_min_rank,
            self.p2_min_rank,
            self.p1_pct_1st_in,
            self.p2_pct_1st_in,
            self.p1_pct_1st_won,
            self.p2_pct_1st_won,
            self.p1_pct_2nd_won,
            self.p2_pct_2nd_won,
            self.p1_pct_sv_pts_won,
            self.p2_pct_sv_pts_won,
            self.p1_pct_bp_conv,
            self.p2_pct_bp_conv,
            self.p1_pct_bp_saved,
            self.p2_pct_bp_saved,
            self.p1_pct_1st_ret_pts_won,
            self.p2_pct_1st_ret_pts_won,
            self.p1_pct_2nd_ret_pts_won,
            self.p2_pct_2nd_ret_pts_won,
            self.p1_h2h_won,
            self.p2_h2h_won,
            self.p1_rec_perf,
            self.p2_rec_perf,
            self.p1_surface_w_rate,
            self.p2_surface_w_rate,
            self.p1_tourney_w_rate,
            self.p2_tourney_w_rate,
        ]
    }

    pub fn all_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub p1: f64,
    pub p2: f64,
    pub predicted_winner: Option<u8>,
}

impl PredictionResult {
    /// Accepts a model answer only if it is a proper two-way distribution.
    pub fn validated(p1: f64, p2: f64, predicted_winner: Option<u8>) -> Result<Self, String> {
        if !p1.is_finite() || !p2.is_finite() {
            return Err(format!("non-finite probabilities ({p1}, {p2})"));
        }
        if !(0.0..=1.0).contains(&p1) || !(0.0..=1.0).contains(&p2) {
            return Err(format!("probabilities out of range ({p1}, {p2})"));
        }
        if (p1 + p2 - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(format!("probabilities sum to {} not 1", p1 + p2));
        }
        Ok(Self {
            p1,
            p2,
            predicted_winner,
        })
    }

    /// Rounded percentages for the split bar; they always add up to 100.
    pub fn percentages(&self) -> (u32, u32) {
        let left = ((self.p1 * 100.0).round() as u32).min(100);
        (left, 100 - left)
    }

    /// Side with the strictly greater probability; `None` on an exact tie.
    pub fn favourite(&self) -> Option<Side> {
        if self.p1 > self.p2 {
            Some(Side::Left)
        } else if self.p2 > self.p1 {
            Some(Side::Right)
        } else {
            None
        }
    }
}
