use serde_json::Value;
use tracing::warn;

use crate::adapters::MetricAdapter;
use crate::error::AdapterError;
use crate::metrics::{MetricMap, MetricValue};
use crate::roster::{Resolver, pick_id};

pub const MATCHUP_KEY: &str = "matchupQualities";
pub const MATCHUP_QUALITY: &str = "matchupquality";
pub const PRED_WIN_PCT: &str = "teampredwinpct";
pub const PRED_MOV: &str = "teampredmov";

/// Per-date matchup predictions, keyed by game id.
///
/// Each fragment is `{home: {matchupQualities: {..}}, away: {..}}` so it can be
/// merged straight onto the two team snapshots of the scheduled game.
#[derive(Debug, Clone)]
pub struct MatchupAdapter {
    pub name: String,
}

impl MetricAdapter for MatchupAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(
        &self,
        raw: &str,
        _resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError> {
        let root: Value = serde_json::from_str(raw.trim()).map_err(|source| AdapterError::Json {
            feed: self.name.clone(),
            source,
        })?;
        let events = root
            .get("events")
            .and_then(Value::as_array)
            .ok_or_else(|| AdapterError::missing(&self.name, "events"))?;
        if events.is_empty() {
            return Err(AdapterError::Empty {
                feed: self.name.clone(),
            });
        }

        let mut out = Vec::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            let Some(game_id) = event.get("id").and_then(pick_id) else {
                warn!(feed = %self.name, row = idx, "matchup event without id, skipping");
                continue;
            };
            let Some(matchup) = event.get("matchup").filter(|m| m.is_object()) else {
                warn!(feed = %self.name, game = %game_id, "event has no matchup block, skipping");
                continue;
            };

            let quality = matchup
                .get("matchupQuality")
                .or_else(|| matchup.get(MATCHUP_QUALITY))
                .and_then(number);

            let mut fragment = MetricMap::new();
            for (side, key) in [("home", "homeTeam"), ("away", "awayTeam")] {
                let mut block = matchup.get(key).map(side_stats).unwrap_or_default();
                if let Some(q) = quality {
                    block.insert(MATCHUP_QUALITY.to_string(), MetricValue::Number(q));
                }
                if block.is_empty() {
                    continue;
                }
                let mut team = MetricMap::new();
                team.insert(MATCHUP_KEY.to_string(), MetricValue::Map(block));
                fragment.insert(side.to_string(), MetricValue::Map(team));
            }
            out.push((game_id, fragment));
        }
        Ok(out)
    }
}

/// Numeric fields of a side block, keys lowercased and prefixed like the
/// provider's flat vocabulary (`predWinPct` -> `teampredwinpct`).
fn side_stats(side: &Value) -> MetricMap {
    let Some(obj) = side.as_object() else {
        return MetricMap::new();
    };
    obj.iter()
        .filter(|(k, _)| k.as_str() != "id")
        .filter_map(|(k, v)| {
            let key = k.to_ascii_lowercase();
            let key = if key.starts_with("team") || key.starts_with("opp") {
                key
            } else {
                format!("team{key}")
            };
            number(v).map(|n| (key, MetricValue::Number(n)))
        })
        .collect()
}

fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}
