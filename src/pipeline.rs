use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::adapters::{AdapterRegistry, MetricAdapter, MetricKind, SportFeeds};
use crate::error::{FailureKind, IngestCause, IngestError};
use crate::http_client::Fetch;
use crate::metrics::{MetricMap, MetricValue, merge_owned};
use crate::model::{Game, Sport, Team};
use crate::reference::ReferenceTables;
use crate::roster::{Resolver, Roster, parse_roster_json};
use crate::schedule_fetch::parse_schedule_json;
use crate::scoring::ScoringEngine;
use crate::sport_config::{SportConfig, SportConfigs};

/// Game id -> scored game for one `(date, sport)`.
pub type SportSlate = BTreeMap<String, Game>;

/// A sport's roster with every team-scoped feed merged in.
#[derive(Debug, Clone)]
pub struct SportTeams {
    pub sport: Sport,
    pub roster: Roster,
}

impl SportTeams {
    pub fn by_id(&self) -> BTreeMap<&str, &Team> {
        self.roster
            .teams()
            .map(|team| (team.id.as_str(), team))
            .collect()
    }

    pub fn has_power_index(&self, config: &SportConfig) -> bool {
        self.roster
            .teams()
            .any(|team| config.power_index_value(&team.metrics).is_some())
    }
}

#[derive(Debug, Default)]
pub struct SlateAggregate {
    pub slates: BTreeMap<NaiveDate, BTreeMap<Sport, SportSlate>>,
    pub failures: Vec<IngestError>,
}

impl SlateAggregate {
    pub fn insert(&mut self, date: NaiveDate, sport: Sport, slate: SportSlate) {
        self.slates.entry(date).or_default().insert(sport, slate);
    }

    pub fn slate(&self, date: NaiveDate, sport: Sport) -> Option<&SportSlate> {
        self.slates.get(&date)?.get(&sport)
    }

    pub fn game_count(&self) -> usize {
        self.slates
            .values()
            .flat_map(|by_sport| by_sport.values())
            .map(|slate| slate.len())
            .sum()
    }

    pub fn failed_sports(&self) -> Vec<(Sport, Option<NaiveDate>)> {
        self.failures.iter().map(|f| (f.sport, f.date)).collect()
    }

    /// Every game across dates and sports, best slate score first.
    /// Unscored games sort last; ties break on game id.
    pub fn flattened(&self) -> Vec<&Game> {
        let mut games: Vec<&Game> = self
            .slates
            .values()
            .flat_map(|by_sport| by_sport.values())
            .flat_map(|slate| slate.values())
            .collect();
        games.sort_by(|a, b| {
            b.slate_score()
                .partial_cmp(&a.slate_score())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        games
    }

    fn absorb(&mut self, other: SlateAggregate) {
        for (date, by_sport) in other.slates {
            self.slates.entry(date).or_default().extend(by_sport);
        }
        self.failures.extend(other.failures);
    }
}

pub struct Pipeline<F: Fetch> {
    fetcher: F,
    registry: AdapterRegistry,
    configs: SportConfigs,
    reference: Arc<ReferenceTables>,
    pool: Option<rayon::ThreadPool>,
    team_cache: Mutex<HashMap<Sport, Arc<SportTeams>>>,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(
        fetcher: F,
        registry: AdapterRegistry,
        configs: SportConfigs,
        reference: Arc<ReferenceTables>,
        parallelism: usize,
    ) -> Self {
        Self {
            fetcher,
            registry,
            configs,
            reference,
            pool: build_pool(parallelism),
            team_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Team-scoped metrics for a sport, fetched once per pipeline and then cached.
    pub fn ingest_teams(&self, sport: Sport) -> Result<Arc<SportTeams>, IngestError> {
        if let Some(hit) = self.cache().get(&sport) {
            return Ok(Arc::clone(hit));
        }

        let feeds = self.feeds(sport, None)?;
        let raw = self
            .fetcher
            .fetch(&feeds.roster_url)
            .map_err(failure(sport, None, FailureKind::Roster))?;
        let mut roster =
            parse_roster_json(sport, &raw).map_err(failure(sport, None, FailureKind::Roster))?;

        let mut fragments = Vec::new();
        let resolver = Resolver::new(sport, &roster);
        for feed in self.registry.lookup(sport, MetricKind::Team) {
            let raw = self
                .fetcher
                .fetch(&feed.url_for(None))
                .map_err(failure(sport, None, FailureKind::TeamMetrics))?;
            let rows = feed
                .adapter
                .parse(&raw, &resolver)
                .map_err(failure(sport, None, FailureKind::TeamMetrics))?;
            info!(sport = %sport, feed = feed.adapter.name(), rows = rows.len(), "team feed parsed");
            fragments.extend(rows);
        }

        for (team_id, fragment) in fragments {
            match roster.get_mut(&team_id) {
                Some(team) => merge_owned(&mut team.metrics, fragment),
                None => warn!(sport = %sport, team = %team_id, "metrics for team not on roster"),
            }
        }
        for team in roster.teams_mut() {
            if let Some(fragment) = self.reference.popularity_fragment(sport, &team.id) {
                merge_owned(&mut team.metrics, fragment);
            }
        }

        info!(sport = %sport, teams = roster.len(), "team metrics ingested");
        let teams = Arc::new(SportTeams { sport, roster });
        Ok(Arc::clone(self.cache().entry(sport).or_insert(teams)))
    }

    /// Schedule plus game-scoped metrics for one date, merged and scored.
    pub fn ingest_games(&self, date: NaiveDate, sport: Sport) -> Result<SportSlate, IngestError> {
        let config = self.configs.get(sport).ok_or_else(|| {
            IngestError::new(
                sport,
                Some(date),
                FailureKind::Schedule,
                IngestCause::Other(format!("no scoring config for {sport}")),
            )
        })?;
        let teams = self.ingest_teams(sport).map_err(|mut e| {
            e.date = Some(date);
            e
        })?;
        let feeds = self.feeds(sport, Some(date))?;
        let raw = self
            .fetcher
            .fetch(&feeds.schedule_url_for(date))
            .map_err(failure(sport, Some(date), FailureKind::Schedule))?;
        let resolver = Resolver::new(sport, &teams.roster);
        let games = parse_schedule_json(sport, &raw, &resolver)
            .map_err(failure(sport, Some(date), FailureKind::Schedule))?;
        if games.is_empty() {
            info!(sport = %sport, %date, "no games scheduled");
            return Ok(SportSlate::new());
        }
        if !teams.has_power_index(config) {
            return Err(IngestError::new(
                sport,
                Some(date),
                FailureKind::MissingPowerIndex,
                IngestCause::Other(format!(
                    "{} games scheduled but no team has a power index",
                    games.len()
                )),
            ));
        }

        let mut game_metrics: HashMap<String, MetricMap> = HashMap::new();
        for feed in self.registry.lookup(sport, MetricKind::Game) {
            let raw = self
                .fetcher
                .fetch(&feed.url_for(Some(date)))
                .map_err(failure(sport, Some(date), FailureKind::GameMetrics))?;
            let rows = feed
                .adapter
                .parse(&raw, &resolver)
                .map_err(failure(sport, Some(date), FailureKind::GameMetrics))?;
            debug!(sport = %sport, feed = feed.adapter.name(), rows = rows.len(), "game feed parsed");
            for (game_id, fragment) in rows {
                merge_owned(game_metrics.entry(game_id).or_default(), fragment);
            }
        }

        let engine = ScoringEngine::new(config, &self.reference);
        let mut slate = SportSlate::new();
        for mut game in games {
            if let Some(fragment) = game_metrics.remove(&game.id) {
                apply_game_fragment(&mut game, fragment);
            }
            game.score = Some(engine.score(&game));
            slate.insert(game.id.clone(), game);
        }

        let unscored = slate.values().filter(|g| g.slate_score() < 0.0).count();
        info!(sport = %sport, %date, games = slate.len(), unscored, "slate scored");
        Ok(slate)
    }

    /// Scores every requested sport for one date. One sport failing leaves the
    /// others in the aggregate.
    pub fn run(&self, date: NaiveDate, sports: &[Sport]) -> SlateAggregate {
        let mut sports_unique: Vec<Sport> = Vec::with_capacity(sports.len());
        for sport in sports {
            if !sports_unique.contains(sport) {
                sports_unique.push(*sport);
            }
        }

        let results: Vec<(Sport, Result<SportSlate, IngestError>)> = with_pool(&self.pool, || {
            sports_unique
                .par_iter()
                .map(|sport| (*sport, self.ingest_games(date, *sport)))
                .collect()
        });

        let mut aggregate = SlateAggregate::default();
        for (sport, result) in results {
            match result {
                Ok(slate) => aggregate.insert(date, sport, slate),
                Err(err) => {
                    error!(sport = %sport, %date, error = %err, "sport ingestion failed");
                    aggregate.failures.push(err);
                }
            }
        }
        aggregate
    }

    /// Runs several dates in order; team-scoped metrics are fetched once.
    pub fn run_dates(&self, dates: &[NaiveDate], sports: &[Sport]) -> SlateAggregate {
        let mut aggregate = SlateAggregate::default();
        for date in dates {
            aggregate.absorb(self.run(*date, sports));
        }
        aggregate
    }

    /// Drops cached team metrics so the next run starts a fresh cycle.
    pub fn clear_team_cache(&self) {
        self.cache().clear();
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<Sport, Arc<SportTeams>>> {
        self.team_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn feeds(&self, sport: Sport, date: Option<NaiveDate>) -> Result<&SportFeeds, IngestError> {
        self.registry.sport(sport).ok_or_else(|| {
            IngestError::new(
                sport,
                date,
                FailureKind::Roster,
                IngestCause::Other(format!("no feeds registered for {sport}")),
            )
        })
    }
}

fn failure<E: Into<IngestCause>>(
    sport: Sport,
    date: Option<NaiveDate>,
    kind: FailureKind,
) -> impl FnOnce(E) -> IngestError {
    move |cause| IngestError::new(sport, date, kind, cause)
}

/// Merges `{home: .., away: ..}` onto the game's team snapshots.
fn apply_game_fragment(game: &mut Game, fragment: MetricMap) {
    for (side, value) in fragment {
        let target = match side.as_str() {
            "home" => &mut game.home.metrics,
            "away" => &mut game.away.metrics,
            _ => {
                debug!(game = %game.id, key = %side, "ignoring game metric outside home/away");
                continue;
            }
        };
        match value {
            MetricValue::Map(map) => merge_owned(target, map),
            _ => debug!(game = %game.id, key = %side, "ignoring scalar side metric"),
        }
    }
}

fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
