use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calibration::Bands;
use crate::error::ConfigError;
use crate::metrics::{MetricMap, lookup_f64};
use crate::model::{Component, Sport};

/// Pseudo-count added to both wins and losses before computing win %.
pub const RECORD_PSEUDO_COUNT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidParams {
    pub scale: f64,
    pub center: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub matchup_quality: f64,
    pub win_probability: f64,
    pub record: f64,
    pub power_index: f64,
    pub spread: f64,
    pub popularity: f64,
    pub conference: f64,
    pub rank: f64,
}

impl Weights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::MatchupQuality => self.matchup_quality,
            Component::WinProbability => self.win_probability,
            Component::Record => self.record,
            Component::PowerIndex => self.power_index,
            Component::Spread => self.spread,
            Component::Popularity => self.popularity,
            Component::Conference => self.conference,
            Component::Rank => self.rank,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            matchup_quality: 1.0,
            win_probability: 0.5,
            record: 1.0,
            power_index: 1.5,
            spread: 0.75,
            popularity: 0.75,
            conference: 0.5,
            rank: 0.75,
        }
    }
}

/// One place a provider may have put a team's power-index value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerIndexField {
    pub label: String,
    pub path: Vec<String>,
}

impl PowerIndexField {
    pub fn new(label: &str, path: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn read(&self, metrics: &MetricMap) -> Option<f64> {
        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        lookup_f64(metrics, &path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportConfig {
    pub sport: Sport,
    pub weights: Weights,
    pub power_index: SigmoidParams,
    /// Divisor inside `exp(-mov^2 / scale)`.
    pub spread_scale: f64,
    pub bands: Bands,
    /// Tried in order; the first present value wins.
    pub power_index_fields: Vec<PowerIndexField>,
}

impl SportConfig {
    pub fn defaults(sport: Sport) -> Self {
        let pi = |category: &str, stat: &str| {
            PowerIndexField::new(
                &format!("{category}.{stat}"),
                &["powerIndexes", category, stat],
            )
        };
        let no_college_terms = Weights {
            conference: 0.0,
            rank: 0.0,
            ..Weights::default()
        };

        let (weights, power_index, spread_scale, bands, power_index_fields) = match sport {
            // FPI is points better than an average team on a neutral field.
            Sport::Nfl => (
                no_college_terms,
                SigmoidParams {
                    scale: 6.0,
                    center: 0.0,
                },
                100.0,
                Bands::new(0.1, 0.6, 1.0),
                vec![pi("fpi", "fpi"), pi("fpi", "powerindex")],
            ),
            Sport::Nba => (
                no_college_terms,
                SigmoidParams {
                    scale: 5.0,
                    center: 0.0,
                },
                100.0,
                Bands::new(0.05, 0.45, 0.95),
                vec![pi("bpi", "bpi"), pi("bpi", "powerindex")],
            ),
            Sport::Mlb => (
                Weights {
                    record: 1.25,
                    ..no_college_terms
                },
                SigmoidParams {
                    scale: 1.0,
                    center: 0.0,
                },
                4.0,
                Bands::new(0.0, 0.35, 0.85),
                vec![pi("ratings", "Rating"), pi("ratings", "RunDiff")],
            ),
            // SRS is goals per game above average.
            Sport::Nhl => (
                no_college_terms,
                SigmoidParams {
                    scale: 0.4,
                    center: 0.0,
                },
                2.25,
                Bands::new(0.0, 0.4, 0.9),
                vec![pi("srs", "SRS"), pi("srs", "srs")],
            ),
            Sport::Ncaaf => (
                Weights::default(),
                SigmoidParams {
                    scale: 10.0,
                    center: 0.0,
                },
                225.0,
                Bands::new(0.0, 0.4, 1.0),
                vec![pi("fpi", "fpi"), pi("fpi", "powerindex")],
            ),
            Sport::Ncaab => (
                Weights::default(),
                SigmoidParams {
                    scale: 8.0,
                    center: 0.0,
                },
                150.0,
                Bands::new(0.0, 0.35, 0.95),
                vec![pi("bpi", "bpi"), pi("bpi", "powerindex")],
            ),
        };

        Self {
            sport,
            weights,
            power_index,
            spread_scale,
            bands,
            power_index_fields,
        }
    }

    /// First configured power-index field that is present on the team.
    pub fn power_index_value(&self, metrics: &MetricMap) -> Option<f64> {
        self.power_index_fields
            .iter()
            .find_map(|field| field.read(metrics))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sport = self.sport;
        for (field, value) in [
            ("power index", self.power_index.scale),
            ("spread", self.spread_scale),
        ] {
            if value == 0.0 || !value.is_finite() {
                return Err(ConfigError::Scale {
                    sport,
                    field,
                    value,
                });
            }
        }
        if !self.power_index.center.is_finite() {
            return Err(ConfigError::Scale {
                sport,
                field: "power index center",
                value: self.power_index.center,
            });
        }
        if !self.bands.is_well_ordered() {
            return Err(ConfigError::Bands {
                sport,
                low: self.bands.low,
                baseline: self.bands.baseline,
                high: self.bands.high,
            });
        }
        if let Some(component) = Component::ALL
            .into_iter()
            .find(|c| !self.weights.get(*c).is_finite())
        {
            return Err(ConfigError::Weight {
                sport,
                component: component.as_str(),
            });
        }
        if self.power_index_fields.is_empty() {
            return Err(ConfigError::PowerIndexFields { sport });
        }
        Ok(())
    }
}

/// Validated per-sport configs; constructed once at startup.
#[derive(Debug, Clone)]
pub struct SportConfigs {
    configs: HashMap<Sport, SportConfig>,
}

impl SportConfigs {
    pub fn validated() -> Result<Self, ConfigError> {
        Self::from_configs(Sport::ALL.into_iter().map(SportConfig::defaults))
    }

    pub fn from_configs(configs: impl IntoIterator<Item = SportConfig>) -> Result<Self, ConfigError> {
        let mut out = HashMap::new();
        for config in configs {
            config.validate()?;
            out.insert(config.sport, config);
        }
        Ok(Self { configs: out })
    }

    pub fn get(&self, sport: Sport) -> Option<&SportConfig> {
        self.configs.get(&sport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricValue, nest};

    #[test]
    fn defaults_validate_for_every_sport() {
        let configs = SportConfigs::validated().expect("defaults are valid");
        for sport in Sport::ALL {
            assert!(configs.get(sport).is_some(), "{sport}");
        }
    }

    #[test]
    fn non_college_sports_carry_no_college_weight() {
        let nba = SportConfig::defaults(Sport::Nba);
        assert_eq!(nba.weights.get(Component::Conference), 0.0);
        assert_eq!(nba.weights.get(Component::Rank), 0.0);
        let ncaaf = SportConfig::defaults(Sport::Ncaaf);
        assert!(ncaaf.weights.get(Component::Rank) > 0.0);
    }

    #[test]
    fn power_index_uses_first_present_field() {
        let config = SportConfig::defaults(Sport::Nba);
        let fallback = nest(
            &["powerIndexes", "bpi", "powerindex"],
            MetricValue::Number(3.5),
        );
        assert_eq!(config.power_index_value(&fallback), Some(3.5));

        let mut both = fallback.clone();
        crate::metrics::merge(
            &mut both,
            &nest(&["powerIndexes", "bpi", "bpi"], MetricValue::Number(6.1)),
        );
        assert_eq!(config.power_index_value(&both), Some(6.1));
        assert_eq!(config.power_index_value(&MetricMap::new()), None);
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut config = SportConfig::defaults(Sport::Nhl);
        config.spread_scale = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Scale { .. })));

        let mut config = SportConfig::defaults(Sport::Nhl);
        config.bands = Bands::new(0.5, 0.4, 0.9);
        assert!(matches!(config.validate(), Err(ConfigError::Bands { .. })));

        let mut config = SportConfig::defaults(Sport::Nhl);
        config.weights.spread = f64::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Weight { .. })));

        let mut config = SportConfig::defaults(Sport::Nhl);
        config.power_index_fields.clear();
        assert!(SportConfigs::from_configs([config]).is_err());
    }
}
