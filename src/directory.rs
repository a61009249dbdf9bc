use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::{endpoint, get_text};
use crate::player::{HeadToHeadCount, NextMatch, PlayerIdentity, Surface, TournamentCategory};
use crate::prediction::PredictionRequest;

/// Player metadata, head-to-head counts and comparison features by player name.
pub trait PlayerDirectory: Send + Sync {
    fn player(&self, name: &str) -> Result<PlayerIdentity>;
    fn head_to_head(&self, p1: &str, p2: &str) -> Result<HeadToHeadCount>;
    fn compare(
        &self,
        p1: &str,
        p2: &str,
        surface: Surface,
        category: TournamentCategory,
    ) -> Result<PredictionRequest>;
    fn next_matches(&self) -> Result<Vec<NextMatch>>;
}

pub struct HttpPlayerDirectory {
    base_url: String,
    timeout: Duration,
}

impl HttpPlayerDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl PlayerDirectory for HttpPlayerDirectory {
    fn player(&self, name: &str) -> Result<PlayerIdentity> {
        let url = endpoint(&self.base_url, &["players", "player", name, "basic"])?;
        let body = get_text(url, self.timeout, None)
            .with_context(|| format!("player lookup {name:?}"))?;
        parse_player_json(&body)
    }

    fn head_to_head(&self, p1: &str, p2: &str) -> Result<HeadToHeadCount> {
        let url = endpoint(&self.base_url, &["players", "h2h", p1, p2])?;
        let body = get_text(url, self.timeout, None)
            .with_context(|| format!("h2h lookup {p1:?} vs {p2:?}"))?;
        parse_h2h_json(&body)
    }

    fn compare(
        &self,
        p1: &str,
        p2: &str,
        surface: Surface,
        category: TournamentCategory,
    ) -> Result<PredictionRequest> {
        let mut url = endpoint(&self.base_url, &["players", "compare", p1, p2])?;
        url.query_pairs_mut()
            .append_pair("surface", surface.as_str())
            .append_pair("tourney_type", category.code());
        let body = get_text(url, self.timeout, None)
            .with_context(|| format!("comparison {p1:?} vs {p2:?}"))?;
        parse_comparison_json(&body)
    }

    fn next_matches(&self) -> Result<Vec<NextMatch>> {
        let url = endpoint(&self.base_url, &["players", "matches"])?;
        let body = get_text(url, self.timeout, None).context("next matches")?;
        parse_next_matches_json(&body)
    }
}

pub fn parse_player_json(raw: &str) -> Result<PlayerIdentity> {
    let player: PlayerIdentity =
        serde_json::from_str(raw.trim()).context("invalid player json")?;
    if player.name.trim().is_empty() {
        return Err(anyhow::anyhow!("player response has an empty name"));
    }
    Ok(player)
}

#[derive(Debug, Deserialize)]
struct H2hResponse {
    p1_h2h_won: Option<u32>,
    p2_h2h_won: Option<u32>,
}

pub fn parse_h2h_json(raw: &str) -> Result<HeadToHeadCount> {
    let resp: H2hResponse = serde_json::from_str(raw.trim()).context("invalid h2h json")?;
    Ok(match (resp.p1_h2h_won, resp.p2_h2h_won) {
        (None, None) => HeadToHeadCount::default(),
        (p1, p2) => HeadToHeadCount {
            p1_wins: p1.unwrap_or(0),
            p2_wins: p2.unwrap_or(0),
            met: true,
        },
    })
}

pub fn parse_comparison_json(raw: &str) -> Result<PredictionRequest> {
    let request: PredictionRequest =
        serde_json::from_str(raw.trim()).context("invalid comparison json")?;
    if !request.all_finite() {
        return Err(anyhow::anyhow!("comparison contains non-finite features"));
    }
    Ok(request)
}

pub fn parse_next_matches_json(raw: &str) -> Result<Vec<NextMatch>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid matches json")?;
    let rows = match &root {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => root
            .get("matches")
            .and_then(|v| v.as_array())
            .map(|items| items.as_slice())
            .unwrap_or(&[]),
        _ => &[],
    };

    Ok(rows
        .iter()
        .map(|row| NextMatch {
            date: pick_string(row, &["snapshot_date", "date"]).unwrap_or_default(),
            player1: pick_string(row, &["player1_name", "player1"]).unwrap_or_default(),
            player2: pick_string(row, &["player2_name", "player2"]).unwrap_or_default(),
            tournament: pick_string(row, &["tourney_name", "tournament"]).unwrap_or_default(),
            tournament_type: pick_string(row, &["tourney_type", "tournamentType"])
                .unwrap_or_default(),
            surface: pick_string(row, &["surface"]).unwrap_or_default(),
        })
        .filter(|m| !m.player1.is_empty() && !m.player2.is_empty())
        .collect())
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
