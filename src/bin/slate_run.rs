use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDate};
use tracing_subscriber::EnvFilter;

use slate_score::adapters::AdapterRegistry;
use slate_score::config::{PipelineConfig, parse_date};
use slate_score::http_client::HttpFetcher;
use slate_score::pipeline::Pipeline;
use slate_score::reference::ReferenceTables;
use slate_score::sport_config::SportConfigs;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = PipelineConfig::from_env();
    let configs = SportConfigs::validated().context("invalid sport configuration")?;
    let reference = match config.reference_path.as_deref() {
        Some(path) => ReferenceTables::load(path)?,
        None => ReferenceTables::empty(),
    };
    let fetcher = HttpFetcher::new(Some(config.http_timeout_secs))?;

    let start = parse_date_arg().unwrap_or(config.date);
    let days = parse_days_arg().unwrap_or(1);
    let dates = slate_dates(start, days)?;

    let pipeline = Pipeline::new(
        fetcher,
        AdapterRegistry::defaults(),
        configs,
        Arc::new(reference),
        config.fetch_parallelism,
    );
    let aggregate = pipeline.run_dates(&dates, &config.sports);

    let slate = aggregate.flattened();
    println!("{}", serde_json::to_string_pretty(&slate)?);

    eprintln!(
        "Scored {} games across {} date(s)",
        aggregate.game_count(),
        dates.len()
    );
    for failure in &aggregate.failures {
        eprintln!("  failed: {failure}");
    }

    Ok(())
}

const MAX_DAYS: u32 = 366;

fn slate_dates(start: NaiveDate, days: u32) -> Result<Vec<NaiveDate>> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(anyhow!("--days must be between 1 and {MAX_DAYS}"));
    }
    (0..days)
        .map(|offset| {
            start
                .checked_add_signed(Duration::days(i64::from(offset)))
                .ok_or_else(|| anyhow!("date range starting {start} runs past the calendar"))
        })
        .collect()
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("--{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return Some(raw.trim().to_string());
        }
        if arg == &format!("--{name}")
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_date_arg() -> Option<NaiveDate> {
    arg_value("date").and_then(|raw| parse_date(&raw))
}

fn parse_days_arg() -> Option<u32> {
    arg_value("days").and_then(|raw| raw.parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_range_is_bounded() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let dates = slate_dates(start, 3).unwrap();
        assert_eq!(dates.last(), NaiveDate::from_ymd_opt(2025, 1, 17).as_ref());
        assert!(slate_dates(start, 0).is_err());
        assert!(slate_dates(start, u32::MAX).is_err());
        assert!(slate_dates(NaiveDate::MAX, 2).is_err());
    }
}
