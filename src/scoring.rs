use std::collections::BTreeMap;

use tracing::debug;

use crate::matchup_fetch::{MATCHUP_KEY, MATCHUP_QUALITY, PRED_MOV, PRED_WIN_PCT};
use crate::metrics::lookup_f64;
use crate::model::{Component, Game, GameScore, ScoreComponent, Team};
use crate::normalize::{inverse_sigmoid, neg_exp, sigmoid};
use crate::reference::ReferenceTables;
use crate::sport_config::{RECORD_PSEUDO_COUNT, SportConfig};

const RANKED_CUTOFF: u32 = 25;

/// Regularized win fraction for a `wins-losses[-ties]` record.
///
/// Returns `None` when the record does not start with two integers.
pub fn calculate_win_percentage(record: &str, pseudo: f64) -> Option<f64> {
    let mut parts = record.trim().split('-').map(|p| p.trim().parse::<u32>());
    let wins = f64::from(parts.next()?.ok()?);
    let losses = f64::from(parts.next()?.ok()?);
    let denom = wins + losses + 2.0 * pseudo;
    if denom <= 0.0 {
        return Some(0.5);
    }
    Some((wins + pseudo) / denom)
}

fn rank_adjustment(rank: u32) -> f64 {
    if rank <= RANKED_CUTOFF {
        f64::from(26 - rank) / 25.0
    } else {
        0.0
    }
}

fn matchup_stat(team: &Team, stat: &str) -> Option<f64> {
    lookup_f64(&team.metrics, &[MATCHUP_KEY, stat])
}

fn both<T>(home: Option<T>, away: Option<T>) -> Option<(T, T)> {
    home.zip(away)
}

/// Scores games of one sport against its config and the shared reference tables.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    config: &'a SportConfig,
    reference: &'a ReferenceTables,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a SportConfig, reference: &'a ReferenceTables) -> Self {
        Self { config, reference }
    }

    /// Centered value of one component, or `None` unless both sides have its inputs.
    pub fn component_value(&self, component: Component, game: &Game) -> Option<f64> {
        let (home, away) = (&game.home, &game.away);
        let sport = game.sport;
        match component {
            Component::MatchupQuality => {
                let (mq, _) = both(
                    matchup_stat(home, MATCHUP_QUALITY),
                    matchup_stat(away, MATCHUP_QUALITY),
                )?;
                Some((mq - 50.0) / 50.0)
            }
            Component::WinProbability => {
                let (h, a) = both(
                    matchup_stat(home, PRED_WIN_PCT),
                    matchup_stat(away, PRED_WIN_PCT),
                )?;
                Some((1.0 - (h - a).abs() / 50.0) / 2.0)
            }
            Component::Record => {
                let win_pct = |t: &Team| {
                    t.record
                        .as_deref()
                        .and_then(|r| calculate_win_percentage(r, RECORD_PSEUDO_COUNT))
                };
                let (h, a) = both(win_pct(home), win_pct(away))?;
                Some(h + a - 1.0)
            }
            Component::PowerIndex => {
                let (h, a) = both(
                    self.config.power_index_value(&home.metrics),
                    self.config.power_index_value(&away.metrics),
                )?;
                let p = self.config.power_index;
                Some(sigmoid(h, p.scale, p.center) + sigmoid(a, p.scale, p.center) - 1.0)
            }
            Component::Spread => {
                let (mov, _) = both(matchup_stat(home, PRED_MOV), matchup_stat(away, PRED_MOV))?;
                Some(2.0 * neg_exp(mov, self.config.spread_scale) - 1.0)
            }
            Component::Popularity => {
                let median = self.reference.popularity_median(sport)?;
                let followers = |t: &Team| lookup_f64(&t.metrics, &["popularity", "followers"]);
                let (h, a) = both(followers(home), followers(away))?;
                let (scale, center) = (median / 4.0, median / 2.0);
                Some(sigmoid(h, scale, center) + sigmoid(a, scale, center) - 1.0)
            }
            Component::Conference => {
                if !sport.is_ncaa() {
                    return None;
                }
                let (h, a) = both(
                    self.reference.conference_strength(sport, home),
                    self.reference.conference_strength(sport, away),
                )?;
                Some(h + a - 1.0)
            }
            Component::Rank => {
                if !sport.is_ncaa() {
                    return None;
                }
                let (h, a) = both(home.rank, away.rank)?;
                Some(rank_adjustment(h) + rank_adjustment(a) - 1.0)
            }
        }
    }

    pub fn components(&self, game: &Game) -> BTreeMap<Component, ScoreComponent> {
        let dampening = game.season_phase.weight_dampening();
        Component::ALL
            .into_iter()
            .filter_map(|name| {
                let value = self.component_value(name, game)?;
                Some((
                    name,
                    ScoreComponent {
                        name,
                        value,
                        weight: self.config.weights.get(name) * dampening,
                    },
                ))
            })
            .collect()
    }

    pub fn score(&self, game: &Game) -> GameScore {
        let components = self.components(game);
        if components.is_empty() {
            debug!(sport = %game.sport, game = %game.id, "no scoring components available");
            return GameScore::unscored();
        }

        let bands = self.config.bands.for_phase(game.season_phase);
        let raw = inverse_sigmoid(bands.baseline, 1.0, 0.0)
            + components
                .values()
                .map(|c| c.value * c.weight)
                .sum::<f64>();
        let unbaselined = sigmoid(raw, 1.0, 0.0);
        let slate_score = bands.calibrate(unbaselined);

        debug!(
            sport = %game.sport,
            game = %game.id,
            components = components.len(),
            raw,
            slate_score,
            "scored game"
        );
        GameScore {
            slate_score,
            components,
            unbaselined_slate_score: unbaselined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricMap, MetricValue, merge, nest};
    use crate::model::{GameTime, SeasonPhase, Sport, UNSCORED};

    fn team(id: &str, record: Option<&str>, metrics: MetricMap) -> Team {
        Team {
            id: id.to_string(),
            record: record.map(str::to_string),
            metrics,
            ..Team::default()
        }
    }

    fn game(sport: Sport, phase: SeasonPhase, home: Team, away: Team) -> Game {
        Game {
            id: "g1".to_string(),
            sport,
            time: GameTime::Undetermined,
            season_phase: phase,
            home,
            away,
            broadcasts: BTreeMap::new(),
            notes: Vec::new(),
            score: None,
        }
    }

    fn bpi(v: f64) -> MetricMap {
        nest(&["powerIndexes", "bpi", "bpi"], MetricValue::Number(v))
    }

    #[test]
    fn win_percentage_is_regularized() {
        assert_eq!(calculate_win_percentage("10-0", 2.0), Some(12.0 / 14.0));
        assert_eq!(calculate_win_percentage("0-0", 2.0), Some(0.5));
        assert_eq!(calculate_win_percentage("0-0", 0.0), Some(0.5));
        assert_eq!(calculate_win_percentage("8-4-1", 2.0), Some(10.0 / 16.0));
        assert_eq!(calculate_win_percentage("n/a", 2.0), None);
    }

    #[test]
    fn no_components_yields_sentinel() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference = ReferenceTables::empty();
        let engine = ScoringEngine::new(&config, &reference);
        let g = game(
            Sport::Nba,
            SeasonPhase::RegularSeason,
            team("1", None, MetricMap::new()),
            team("2", Some("4-1"), MetricMap::new()),
        );
        let score = engine.score(&g);
        assert_eq!(score.slate_score, UNSCORED);
        assert!(score.components.is_empty());
    }

    #[test]
    fn strong_matchup_scores_above_baseline() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference = ReferenceTables::empty();
        let engine = ScoringEngine::new(&config, &reference);
        let g = game(
            Sport::Nba,
            SeasonPhase::RegularSeason,
            team("1", Some("50-20"), bpi(6.0)),
            team("2", Some("40-30"), bpi(4.0)),
        );
        let score = engine.score(&g);
        let names: Vec<Component> = score.components.keys().copied().collect();
        assert_eq!(names, vec![Component::Record, Component::PowerIndex]);
        assert!(score.slate_score.is_finite());
        assert!(score.slate_score > config.bands.baseline);
        assert!(score.slate_score <= 1.0);
    }

    #[test]
    fn pre_season_dampens_weights() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference = ReferenceTables::empty();
        let engine = ScoringEngine::new(&config, &reference);
        let g = game(
            Sport::Nba,
            SeasonPhase::PreSeason,
            team("1", Some("0-0"), MetricMap::new()),
            team("2", Some("0-0"), MetricMap::new()),
        );
        let score = engine.score(&g);
        let record = score.components[&Component::Record];
        assert!((record.weight - config.weights.record * 0.2).abs() < 1e-12);
        // A neutral component leaves the game on the shifted baseline.
        assert!((record.value).abs() < 1e-12);
        assert!((score.slate_score - config.bands.baseline / 2.0).abs() < 1e-9);
    }

    #[test]
    fn matchup_components_read_game_fragment() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference = ReferenceTables::empty();
        let engine = ScoringEngine::new(&config, &reference);
        let side = |win: f64, mov: f64| {
            let mut m = nest(
                &[MATCHUP_KEY, MATCHUP_QUALITY],
                MetricValue::Number(80.0),
            );
            merge(&mut m, &nest(&[MATCHUP_KEY, PRED_WIN_PCT], MetricValue::Number(win)));
            merge(&mut m, &nest(&[MATCHUP_KEY, PRED_MOV], MetricValue::Number(mov)));
            m
        };
        let g = game(
            Sport::Nba,
            SeasonPhase::RegularSeason,
            team("1", None, side(55.0, 0.0)),
            team("2", None, side(45.0, 0.0)),
        );
        let components = engine.components(&g);
        assert!((components[&Component::MatchupQuality].value - 0.6).abs() < 1e-12);
        assert!((components[&Component::WinProbability].value - 0.4).abs() < 1e-12);
        // Pick'em game maxes the spread term.
        assert!((components[&Component::Spread].value - 1.0).abs() < 1e-12);
        assert!(!components.contains_key(&Component::Rank));
    }

    #[test]
    fn lopsided_win_probability_goes_negative() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference = ReferenceTables::empty();
        let engine = ScoringEngine::new(&config, &reference);
        let side = |win: f64| nest(&[MATCHUP_KEY, PRED_WIN_PCT], MetricValue::Number(win));
        let value = |h: f64, a: f64| {
            let g = game(
                Sport::Nba,
                SeasonPhase::RegularSeason,
                team("1", None, side(h)),
                team("2", None, side(a)),
            );
            engine.components(&g)[&Component::WinProbability].value
        };

        assert!((value(50.0, 50.0) - 0.5).abs() < 1e-12);
        assert!(value(75.0, 25.0).abs() < 1e-12);
        assert!((value(100.0, 0.0) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn college_terms_need_both_sides() {
        let config = SportConfig::defaults(Sport::Ncaaf);
        let reference = ReferenceTables::from_json(
            r#"{"conferenceStrength":{"ncaaf":{"SEC":10.0,"MAC":0.0}}}"#,
        )
        .unwrap();
        let engine = ScoringEngine::new(&config, &reference);
        let mut home = team("1", None, MetricMap::new());
        home.rank = Some(1);
        home.conference = Some("SEC".to_string());
        let mut away = team("2", None, MetricMap::new());
        away.rank = Some(99);
        away.conference = Some("SEC".to_string());

        let g = game(Sport::Ncaaf, SeasonPhase::RegularSeason, home.clone(), away);
        let components = engine.components(&g);
        assert!((components[&Component::Rank].value - 0.0).abs() < 1e-12);
        assert!((components[&Component::Conference].value - 1.0).abs() < 1e-12);

        let mut unknown = team("3", None, MetricMap::new());
        unknown.conference = Some("Big Sky".to_string());
        let g = game(Sport::Ncaaf, SeasonPhase::RegularSeason, home, unknown);
        let components = engine.components(&g);
        assert!(!components.contains_key(&Component::Rank));
        assert!(!components.contains_key(&Component::Conference));
    }

    #[test]
    fn popularity_centers_on_sport_median() {
        let config = SportConfig::defaults(Sport::Nba);
        let reference =
            ReferenceTables::from_json(r#"{"popularityMedian":{"nba":1000.0}}"#).unwrap();
        let engine = ScoringEngine::new(&config, &reference);
        let fans = |n: f64| nest(&["popularity", "followers"], MetricValue::Number(n));
        let g = game(
            Sport::Nba,
            SeasonPhase::RegularSeason,
            team("1", None, fans(500.0)),
            team("2", None, fans(500.0)),
        );
        let value = engine.component_value(Component::Popularity, &g).unwrap();
        assert!(value.abs() < 1e-12);
    }
}
