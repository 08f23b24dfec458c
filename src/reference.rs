use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::metrics::{MetricMap, MetricValue, nest};
use crate::model::{Sport, Team};

/// On-disk shape. Sport keys are lowercase sport codes, team keys canonical ids.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceFile {
    #[serde(default)]
    popularity: HashMap<String, HashMap<String, f64>>,
    /// Median combined (home + away) follower count per sport.
    #[serde(default)]
    popularity_median: HashMap<String, f64>,
    #[serde(default)]
    conference_strength: HashMap<String, HashMap<String, f64>>,
    /// Independent team id -> conference it is scored as.
    #[serde(default)]
    independents: HashMap<String, HashMap<String, String>>,
}

/// Popularity and conference-strength tables, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    followers: HashMap<Sport, HashMap<String, f64>>,
    popularity_median: HashMap<Sport, f64>,
    /// Already min-max scaled to `[0, 1]`.
    conference_strength: HashMap<Sport, HashMap<String, f64>>,
    independents: HashMap<Sport, HashMap<String, String>>,
}

impl ReferenceTables {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read reference tables {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse reference tables {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ReferenceFile = serde_json::from_str(raw).context("invalid reference json")?;
        let mut out = Self::default();

        for (sport, teams) in by_sport(file.popularity) {
            let teams: HashMap<String, f64> = teams
                .into_iter()
                .filter(|(_, n)| n.is_finite() && *n >= 0.0)
                .collect();
            out.followers.insert(sport, teams);
        }
        for (sport, median) in by_sport(file.popularity_median) {
            if median.is_finite() && median > 0.0 {
                out.popularity_median.insert(sport, median);
            }
        }
        // Sports without an explicit median derive one from their own table.
        for (sport, teams) in &out.followers {
            if out.popularity_median.contains_key(sport) {
                continue;
            }
            let values: Vec<f64> = teams.values().copied().collect();
            if let Some(median) = median_f64(&values).filter(|m| *m > 0.0) {
                out.popularity_median.insert(*sport, median * 2.0);
            }
        }
        for (sport, raw) in by_sport(file.conference_strength) {
            out.conference_strength.insert(sport, min_max_scale(raw));
        }
        out.independents = by_sport(file.independents).collect();

        Ok(out)
    }

    pub fn followers(&self, sport: Sport, team_id: &str) -> Option<f64> {
        self.followers.get(&sport)?.get(team_id).copied()
    }

    pub fn popularity_median(&self, sport: Sport) -> Option<f64> {
        self.popularity_median.get(&sport).copied()
    }

    /// `{popularity: {followers: n}}` for merging into a team's metrics.
    pub fn popularity_fragment(&self, sport: Sport, team_id: &str) -> Option<MetricMap> {
        self.followers(sport, team_id)
            .map(|n| nest(&["popularity", "followers"], MetricValue::Number(n)))
    }

    /// Conference the team is scored as; independents use their mapped conference.
    pub fn scoring_conference<'a>(&'a self, sport: Sport, team: &'a Team) -> Option<&'a str> {
        self.independents
            .get(&sport)
            .and_then(|m| m.get(&team.id))
            .map(String::as_str)
            .or(team.conference.as_deref())
    }

    /// Normalized `[0, 1]` strength of the team's scoring conference.
    pub fn conference_strength(&self, sport: Sport, team: &Team) -> Option<f64> {
        let conference = self.scoring_conference(sport, team)?;
        self.conference_strength
            .get(&sport)?
            .get(conference.trim())
            .copied()
    }
}

fn by_sport<T>(raw: HashMap<String, T>) -> impl Iterator<Item = (Sport, T)> {
    raw.into_iter().filter_map(|(key, value)| match key.parse::<Sport>() {
        Ok(sport) => Some((sport, value)),
        Err(err) => {
            warn!(%err, "ignoring reference table entry");
            None
        }
    })
}

/// A single conference (or all-equal strengths) scales to 0.5.
fn min_max_scale(raw: HashMap<String, f64>) -> HashMap<String, f64> {
    let finite: Vec<(String, f64)> = raw.into_iter().filter(|(_, v)| v.is_finite()).collect();
    let min = finite.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = finite.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    finite
        .into_iter()
        .map(|(name, v)| {
            let scaled = if span > 0.0 { (v - min) / span } else { 0.5 };
            (name, scaled)
        })
        .collect()
}

fn median_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
