use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::AdapterError;
use crate::feed_delimited::DelimitedAdapter;
use crate::feed_html::HtmlTableAdapter;
use crate::feed_json::JsonCategoryAdapter;
use crate::matchup_fetch::MatchupAdapter;
use crate::metrics::MetricMap;
use crate::model::Sport;
use crate::roster::Resolver;

const API_BASE: &str = "https://site.api.espn.com/apis/site/v2/sports";
const POWER_INDEX_BASE: &str = "https://site.web.api.espn.com/apis/fitt/v3/sports";

/// One provider format: raw payload in, `(entity id, metric fragment)` out.
pub trait MetricAdapter {
    fn name(&self) -> &str;

    fn parse(
        &self,
        raw: &str,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Season-long, fetched once per run, keyed by team id.
    Team,
    /// Per date, keyed by game id.
    Game,
}

#[derive(Debug, Clone)]
pub enum Adapter {
    JsonCategories(JsonCategoryAdapter),
    HtmlTable(HtmlTableAdapter),
    Delimited(DelimitedAdapter),
    Matchup(MatchupAdapter),
}

impl MetricAdapter for Adapter {
    fn name(&self) -> &str {
        match self {
            Adapter::JsonCategories(a) => a.name(),
            Adapter::HtmlTable(a) => a.name(),
            Adapter::Delimited(a) => a.name(),
            Adapter::Matchup(a) => a.name(),
        }
    }

    fn parse(
        &self,
        raw: &str,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError> {
        match self {
            Adapter::JsonCategories(a) => a.parse(raw, resolver),
            Adapter::HtmlTable(a) => a.parse(raw, resolver),
            Adapter::Delimited(a) => a.parse(raw, resolver),
            Adapter::Matchup(a) => a.parse(raw, resolver),
        }
    }
}

/// A feed url plus the adapter that understands its payload.
///
/// `{date}` in the url is replaced with `YYYYMMDD` for game-scoped feeds.
#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub url: String,
    pub adapter: Adapter,
}

impl FeedSpec {
    pub fn new(url: impl Into<String>, adapter: Adapter) -> Self {
        Self {
            url: url.into(),
            adapter,
        }
    }

    pub fn url_for(&self, date: Option<NaiveDate>) -> String {
        expand_url(&self.url, date)
    }
}

/// Every url a sport's ingestion needs.
#[derive(Debug, Clone)]
pub struct SportFeeds {
    pub roster_url: String,
    pub schedule_url: String,
    pub team: Vec<FeedSpec>,
    pub game: Vec<FeedSpec>,
}

impl SportFeeds {
    pub fn schedule_url_for(&self, date: NaiveDate) -> String {
        expand_url(&self.schedule_url, Some(date))
    }

    pub fn feeds(&self, kind: MetricKind) -> &[FeedSpec] {
        match kind {
            MetricKind::Team => &self.team,
            MetricKind::Game => &self.game,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    sports: HashMap<Sport, SportFeeds>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sport: Sport, feeds: SportFeeds) {
        self.sports.insert(sport, feeds);
    }

    pub fn sport(&self, sport: Sport) -> Option<&SportFeeds> {
        self.sports.get(&sport)
    }

    pub fn lookup(&self, sport: Sport, kind: MetricKind) -> &[FeedSpec] {
        self.sports
            .get(&sport)
            .map(|feeds| feeds.feeds(kind))
            .unwrap_or(&[])
    }

    /// Production feeds for every supported sport.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        for sport in Sport::ALL {
            registry.insert(sport, default_feeds(sport));
        }
        registry
    }
}

fn default_feeds(sport: Sport) -> SportFeeds {
    let (group, league) = sport.feed_path();
    let roster_url = format!("{API_BASE}/{group}/{league}/teams?limit=1000");
    let schedule_url = format!("{API_BASE}/{group}/{league}/scoreboard?dates={{date}}&limit=500");
    let matchups = FeedSpec::new(
        format!("{POWER_INDEX_BASE}/{group}/{league}/powerindex/matchups?dates={{date}}"),
        Adapter::Matchup(MatchupAdapter {
            name: format!("{sport}-matchups"),
        }),
    );
    let power_index = |category: &str| {
        FeedSpec::new(
            format!("{POWER_INDEX_BASE}/{group}/{league}/powerindex?limit=500"),
            Adapter::JsonCategories(JsonCategoryAdapter::new(
                format!("{sport}-{category}"),
                "powerIndexes",
            )),
        )
    };

    let team = match sport {
        Sport::Nba | Sport::Ncaab => vec![power_index("bpi")],
        Sport::Nfl | Sport::Ncaaf => vec![power_index("fpi")],
        Sport::Nhl => vec![FeedSpec::new(
            "https://www.hockey-reference.com/leagues/NHL_2026.html",
            Adapter::HtmlTable(HtmlTableAdapter {
                name: "nhl-srs".to_string(),
                target_key: "powerIndexes".to_string(),
                category: "srs".to_string(),
                table_selector: "table#stats".to_string(),
                skip_rows: 2,
                header_row: 1,
                link_segment: 1,
            }),
        )],
        Sport::Mlb => vec![FeedSpec::new(
            "https://www.fangraphs.com/api/depth-charts/team-ratings.csv",
            Adapter::Delimited(DelimitedAdapter {
                name: "mlb-ratings".to_string(),
                target_key: "powerIndexes".to_string(),
                category: "ratings".to_string(),
                delimiter: b',',
            }),
        )],
    };

    SportFeeds {
        roster_url,
        schedule_url,
        team,
        game: vec![matchups],
    }
}

fn expand_url(template: &str, date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => template.replace("{date}", &date.format("%Y%m%d").to_string()),
        None => template.to_string(),
    }
}
