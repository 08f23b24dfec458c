use std::collections::BTreeMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use slate_score::metrics::{MetricMap, MetricValue, merge, nest};
use slate_score::model::{Game, GameTime, SeasonPhase, Sport, Team};
use slate_score::reference::ReferenceTables;
use slate_score::scoring::ScoringEngine;
use slate_score::sport_config::SportConfig;

fn side(power_index: f64, win_pct: f64) -> MetricMap {
    let mut metrics = nest(
        &["powerIndexes", "bpi", "bpi"],
        MetricValue::Number(power_index),
    );
    for (stat, value) in [
        ("matchupquality", 64.0),
        ("teampredwinpct", win_pct),
        ("teampredmov", (win_pct - 50.0) / 4.0),
    ] {
        merge(
            &mut metrics,
            &nest(&["matchupQualities", stat], MetricValue::Number(value)),
        );
    }
    merge(
        &mut metrics,
        &nest(&["popularity", "followers"], MetricValue::Number(1.2e7)),
    );
    metrics
}

fn sample_game(idx: usize) -> Game {
    let team = |id: String, record: &str, metrics: MetricMap| Team {
        id,
        record: Some(record.to_string()),
        metrics,
        ..Team::default()
    };
    let pi = (idx % 17) as f64 - 8.0;
    Game {
        id: format!("g{idx}"),
        sport: Sport::Nba,
        time: GameTime::Undetermined,
        season_phase: SeasonPhase::RegularSeason,
        home: team(format!("h{idx}"), "41-29", side(pi, 58.0)),
        away: team(format!("a{idx}"), "33-37", side(-pi / 2.0, 42.0)),
        broadcasts: BTreeMap::new(),
        notes: Vec::new(),
        score: None,
    }
}

fn bench_score_slate(c: &mut Criterion) {
    let config = SportConfig::defaults(Sport::Nba);
    let reference =
        ReferenceTables::from_json(r#"{"popularityMedian": {"nba": 20000000}}"#).unwrap();
    let engine = ScoringEngine::new(&config, &reference);
    let games: Vec<Game> = (0..400).map(sample_game).collect();

    c.bench_function("score_slate_400", |b| {
        b.iter(|| {
            let total: f64 = games
                .iter()
                .map(|g| engine.score(black_box(g)).slate_score)
                .sum();
            black_box(total);
        })
    });
}

fn bench_merge_fragments(c: &mut Criterion) {
    let fragments: Vec<MetricMap> = (0..200)
        .map(|i| {
            let category = format!("cat{}", i % 8);
            let stat = format!("stat{i}");
            nest(
                &["powerIndexes", category.as_str(), stat.as_str()],
                MetricValue::Number(i as f64),
            )
        })
        .collect();

    c.bench_function("merge_team_fragments", |b| {
        b.iter(|| {
            let mut target = MetricMap::new();
            for fragment in &fragments {
                merge(&mut target, black_box(fragment));
            }
            black_box(target.len());
        })
    });
}

criterion_group!(benches, bench_score_slate, bench_merge_fragments);
criterion_main!(benches);
