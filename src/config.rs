use std::env;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use tracing::warn;

use crate::model::Sport;

const DEFAULT_PARALLELISM: usize = 6;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Process-level settings, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sports: Vec<Sport>,
    pub date: NaiveDate,
    pub reference_path: Option<PathBuf>,
    pub fetch_parallelism: usize,
    pub http_timeout_secs: u64,
}

impl PipelineConfig {
    /// Loads `.env.local` then `.env` (first value wins) before reading variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sports = opt("SLATE_SPORTS")
            .map(|raw| parse_sports(&raw))
            .filter(|sports| !sports.is_empty())
            .unwrap_or_else(|| Sport::ALL.to_vec());
        let date = opt("SLATE_DATE")
            .and_then(|raw| {
                let parsed = parse_date(&raw);
                if parsed.is_none() {
                    warn!(value = %raw, "SLATE_DATE is not a date, using today");
                }
                parsed
            })
            .unwrap_or_else(|| Utc::now().date_naive());
        let reference_path = opt("SLATE_REFERENCE_PATH").map(|raw| PathBuf::from(raw.trim()));
        let fetch_parallelism = opt("SLATE_FETCH_PARALLELISM")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(1, 32);
        let http_timeout_secs = opt("SLATE_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            sports,
            date,
            reference_path,
            fetch_parallelism,
            http_timeout_secs,
        }
    }
}

fn parse_sports(raw: &str) -> Vec<Sport> {
    let mut out = Vec::new();
    for token in raw.split(',').filter(|t| !t.trim().is_empty()) {
        match token.parse::<Sport>() {
            Ok(sport) if !out.contains(&sport) => out.push(sport),
            Ok(_) => {}
            Err(err) => warn!(%err, "ignoring SLATE_SPORTS entry"),
        }
    }
    out
}

/// `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> PipelineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_cover_every_sport() {
        let cfg = config(&[]);
        assert_eq!(cfg.sports, Sport::ALL.to_vec());
        assert_eq!(cfg.fetch_parallelism, 6);
        assert_eq!(cfg.http_timeout_secs, 10);
        assert!(cfg.reference_path.is_none());
    }

    #[test]
    fn reads_and_clamps_overrides() {
        let cfg = config(&[
            ("SLATE_SPORTS", "nba, cfb,curling,nba"),
            ("SLATE_DATE", "2025-01-15"),
            ("SLATE_FETCH_PARALLELISM", "500"),
            ("SLATE_HTTP_TIMEOUT_SECS", "0"),
            ("SLATE_REFERENCE_PATH", "ref.json"),
        ]);
        assert_eq!(cfg.sports, vec![Sport::Nba, Sport::Ncaaf]);
        assert_eq!(cfg.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(cfg.fetch_parallelism, 32);
        assert_eq!(cfg.http_timeout_secs, 10);
        assert_eq!(cfg.reference_path, Some(PathBuf::from("ref.json")));
    }

    #[test]
    fn dates_accept_both_forms() {
        let want = NaiveDate::from_ymd_opt(2024, 12, 31);
        assert_eq!(parse_date("20241231"), want);
        assert_eq!(parse_date("2024-12-31"), want);
        assert_eq!(parse_date("2024-13-31"), None);
        assert_eq!(parse_date("tomorrow"), None);
    }
}
