use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use h2h_terminal::directory::{parse_comparison_json, parse_next_matches_json};
use h2h_terminal::orchestrator::{PredictionForm, precheck};
use h2h_terminal::player::{Surface, TournamentCategory};
use h2h_terminal::predict_api::parse_predict_response_json;
use h2h_terminal::profile::CreditStatus;
use h2h_terminal::state::{AppState, Delta, apply_delta};

fn bench_comparison_parse(c: &mut Criterion) {
    c.bench_function("comparison_parse", |b| {
        b.iter(|| {
            let features = parse_comparison_json(black_box(COMPARE_JSON)).unwrap();
            black_box(features.p1_rank);
        })
    });
}

fn bench_next_matches_parse(c: &mut Criterion) {
    c.bench_function("next_matches_parse", |b| {
        b.iter(|| {
            let rows = parse_next_matches_json(black_box(MATCHES_JSON)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_predict_parse(c: &mut Criterion) {
    c.bench_function("predict_envelope_parse", |b| {
        b.iter(|| {
            let result = parse_predict_response_json(black_box(PREDICT_JSON)).unwrap();
            black_box(result.p1);
        })
    });
}

fn bench_precheck(c: &mut Criterion) {
    let form = PredictionForm {
        player1: " Carlos Alcaraz ".to_string(),
        player2: "Rafael Nadal".to_string(),
        surface: Some(Surface::Clay),
        category: Some(TournamentCategory::GrandSlam),
    };
    c.bench_function("precheck", |b| {
        b.iter(|| {
            let job = precheck(black_box(CreditStatus::Known(5)), Some("uid-1"), &form);
            black_box(job.is_ok());
        })
    });
}

fn bench_console_churn(c: &mut Criterion) {
    c.bench_function("console_churn", |b| {
        b.iter(|| {
            let mut state = AppState::new();
            for i in 0..500 {
                apply_delta(&mut state, Delta::Log(format!("[INFO] line {i}")));
            }
            black_box(state.logs.len());
        })
    });
}

criterion_group!(
    perf,
    bench_comparison_parse,
    bench_next_matches_parse,
    bench_predict_parse,
    bench_precheck,
    bench_console_churn
);
criterion_main!(perf);

static COMPARE_JSON: &str = include_str!("../tests/fixtures/compare.json");
static MATCHES_JSON: &str = include_str!("../tests/fixtures/matches.json");
static PREDICT_JSON: &str = include_str!("../tests/fixtures/predict_envelope.json");
