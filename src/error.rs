use std::fmt;

use chrono::NaiveDate;

use crate::model::Sport;

/// Raised by the fetch collaborator; never an empty payload in disguise.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("http {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Whole-payload parse failure. Row-level problems are logged, not raised.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{feed}: invalid json: {source}")]
    Json {
        feed: String,
        source: serde_json::Error,
    },

    #[error("{feed}: invalid delimited text: {source}")]
    Delimited { feed: String, source: csv::Error },

    #[error("{feed}: missing {what}")]
    Missing { feed: String, what: String },

    #[error("{feed}: feed returned no rows")]
    Empty { feed: String },
}

impl AdapterError {
    pub fn missing(feed: &str, what: impl Into<String>) -> Self {
        AdapterError::Missing {
            feed: feed.to_string(),
            what: what.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{sport}: {field} scale must be non-zero and finite (got {value})")]
    Scale {
        sport: Sport,
        field: &'static str,
        value: f64,
    },

    #[error("{sport}: baseline bands must satisfy 0 <= low < baseline < high <= 1 (got {low}, {baseline}, {high})")]
    Bands {
        sport: Sport,
        low: f64,
        baseline: f64,
        high: f64,
    },

    #[error("{sport}: weight for {component} is not finite")]
    Weight {
        sport: Sport,
        component: &'static str,
    },

    #[error("{sport}: no power-index fields configured")]
    PowerIndexFields { sport: Sport },
}

/// Which stage of a sport's ingestion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Roster,
    Schedule,
    TeamMetrics,
    GameMetrics,
    MissingPowerIndex,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Roster => "roster",
            FailureKind::Schedule => "schedule",
            FailureKind::TeamMetrics => "team metrics",
            FailureKind::GameMetrics => "game metrics",
            FailureKind::MissingPowerIndex => "power index",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestCause {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("{0}")]
    Other(String),
}

/// Failure of one sport's ingestion, tagged so a caller can report a partial result.
#[derive(Debug, thiserror::Error)]
#[error("{sport}{} {kind} failed: {cause}", date_suffix(.date))]
pub struct IngestError {
    pub sport: Sport,
    pub date: Option<NaiveDate>,
    pub kind: FailureKind,
    #[source]
    pub cause: IngestCause,
}

impl IngestError {
    pub fn new(
        sport: Sport,
        date: Option<NaiveDate>,
        kind: FailureKind,
        cause: impl Into<IngestCause>,
    ) -> Self {
        Self {
            sport,
            date,
            kind,
            cause: cause.into(),
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self.cause, IngestCause::Fetch(_))
    }
}

fn date_suffix(date: &Option<NaiveDate>) -> String {
    date.map(|d| format!(" {}", d.format("%Y-%m-%d")))
        .unwrap_or_default()
}
