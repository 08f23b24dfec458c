pub mod adapters;
pub mod calibration;
pub mod config;
pub mod error;
pub mod feed_delimited;
pub mod feed_html;
pub mod feed_json;
pub mod http_client;
pub mod matchup_fetch;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reference;
pub mod roster;
pub mod schedule_fetch;
pub mod scoring;
pub mod sport_config;
