// Scoring strategies, fallback and hybrid merge through the public engine API

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Duration;
use helpers::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use scorewatch::core::AppError;
use scorewatch::modules::scoring::models::{DataQuality, ScoringMethod};
use scorewatch::modules::scoring::repositories::StaticAccountingDataSource;
use scorewatch::modules::scoring::services::{
    merge_hybrid, traditional_outcome, ScoreComputationEngine, StrategyOutcome,
    TraditionalHeuristics, HYBRID_MODEL_VERSION, TRADITIONAL_MODEL_VERSION,
};

const COMPANY: &str = "company-42";

async fn engine_with(ml: StubScoringClient) -> (ScoreComputationEngine, Arc<StaticAccountingDataSource>) {
    let accounting = Arc::new(StaticAccountingDataSource::new());
    accounting
        .insert(activity(COMPANY, dec!(10000), dec!(8000), 60))
        .await;
    let engine = ScoreComputationEngine::new(accounting.clone(), Arc::new(ml));
    (engine, accounting)
}

#[tokio::test]
async fn test_traditional_score_is_valid_for_thirty_days() {
    let (engine, _) = engine_with(StubScoringClient::failing()).await;

    let score = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Traditional)
        .await
        .unwrap();

    // 76.5*.25 + 61*.2 + 66*.25 + 80*.2 + 60*.1 = 69.825
    assert_eq!(score.score, 70);
    assert_eq!(score.method, ScoringMethod::Traditional);
    assert_eq!(score.model_version, TRADITIONAL_MODEL_VERSION);
    assert_eq!(score.confidence_score, 0.85);
    assert_eq!(score.valid_until - score.calculated_at, Duration::days(30));
    assert!(score.components.is_some());
}

#[tokio::test]
async fn test_ml_failure_falls_back_to_traditional() {
    let ml = StubScoringClient::failing();
    let (engine, _) = engine_with(ml).await;

    let score = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Ml)
        .await
        .unwrap();

    assert_eq!(score.method, ScoringMethod::Traditional);
    assert_eq!(score.model_version, TRADITIONAL_MODEL_VERSION);
    assert_eq!(score.score, 70);
}

#[tokio::test]
async fn test_ml_success_maps_prediction_to_score() {
    let (engine, _) = engine_with(StubScoringClient::returning(0.734, 0.9)).await;

    let score = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Ml)
        .await
        .unwrap();

    assert_eq!(score.method, ScoringMethod::Ml);
    assert_eq!(score.score, 73);
    assert_eq!(score.model_version, "ml-test-v2");
    assert_eq!(score.recommendations, vec!["Diversify revenue".to_string()]);
}

#[tokio::test]
async fn test_hybrid_blends_both_branches() {
    let (engine, _) = engine_with(StubScoringClient::returning(0.80, 0.7)).await;

    let score = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Hybrid)
        .await
        .unwrap();

    // 70 * 0.4 + 80 * 0.6
    assert_eq!(score.score, 76);
    assert_eq!(score.confidence_score, 0.85);
    assert_eq!(score.data_quality, DataQuality::Excellent);
    assert_eq!(score.method, ScoringMethod::Hybrid);
    assert_eq!(score.model_version, HYBRID_MODEL_VERSION);
}

#[tokio::test]
async fn test_hybrid_degrades_when_ml_is_down() {
    let (engine, _) = engine_with(StubScoringClient::failing()).await;

    let score = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Hybrid)
        .await
        .unwrap();

    assert_eq!(score.score, 70);
    assert!((score.confidence_score - 0.68).abs() < 1e-9);
    assert_eq!(score.data_quality, DataQuality::Good);
}

#[tokio::test]
async fn test_hybrid_fails_when_every_path_fails() {
    let (engine, accounting) = engine_with(StubScoringClient::failing()).await;
    accounting.mark_unavailable(COMPANY).await;

    let result = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Hybrid)
        .await;

    assert!(matches!(result, Err(AppError::Computation(_))));
}

#[tokio::test]
async fn test_traditional_surfaces_data_source_failure() {
    let (engine, accounting) = engine_with(StubScoringClient::failing()).await;
    accounting.mark_unavailable(COMPANY).await;

    let result = engine
        .compute(COMPANY, utc(2026, 1, 1, 0), utc(2026, 1, 31, 23), ScoringMethod::Traditional)
        .await;

    assert!(result.is_err());
    assert!(!matches!(result, Err(AppError::Computation(_))));
}

#[tokio::test]
async fn test_rejects_inverted_window_and_blank_company() {
    let (engine, _) = engine_with(StubScoringClient::failing()).await;

    let inverted = engine
        .compute(COMPANY, utc(2026, 2, 1, 0), utc(2026, 1, 1, 0), ScoringMethod::Traditional)
        .await;
    assert!(matches!(inverted, Err(AppError::Validation(_))));

    let blank = engine
        .compute("  ", utc(2026, 1, 1, 0), utc(2026, 1, 31, 0), ScoringMethod::Traditional)
        .await;
    assert!(matches!(blank, Err(AppError::Validation(_))));
}

fn outcome(method: ScoringMethod, score: i32, confidence: f64) -> StrategyOutcome {
    StrategyOutcome {
        method,
        score,
        confidence,
        data_quality: DataQuality::Fair,
        components: None,
        model_version: "test".to_string(),
        data_source: "test".to_string(),
        explanations: Vec::new(),
        recommendations: Vec::new(),
    }
}

proptest! {
    /// Property: the rule-based score stays within 1..=100 for any activity
    #[test]
    fn test_traditional_score_range(
        inflows in 0u64..10_000_000u64,
        outflows in 0u64..10_000_000u64,
        count in 0i64..5_000i64,
    ) {
        let summary = activity(COMPANY, Decimal::from(inflows), Decimal::from(outflows), count);
        let result = traditional_outcome(&summary, &TraditionalHeuristics::default());

        prop_assert!((1..=100).contains(&result.score));
        prop_assert!((0.0..=1.0).contains(&result.confidence));
    }

    /// Property: the blended score lies between the two branch scores
    #[test]
    fn test_hybrid_blend_is_bounded(t in 1i32..=100, m in 1i32..=100) {
        let merged = merge_hybrid(
            Ok(outcome(ScoringMethod::Traditional, t, 0.7)),
            Ok(outcome(ScoringMethod::Ml, m, 0.6)),
        )
        .unwrap();

        prop_assert!(merged.score >= t.min(m) && merged.score <= t.max(m));
        prop_assert_eq!(merged.confidence, 0.7);
    }

    /// Property: a single surviving branch keeps its score at 80% confidence
    #[test]
    fn test_hybrid_single_branch_penalty(score in 1i32..=100, confidence in 0.0f64..=1.0) {
        let merged = merge_hybrid(
            Ok(outcome(ScoringMethod::Traditional, score, confidence)),
            Err(AppError::external("down")),
        )
        .unwrap();

        prop_assert_eq!(merged.score, score);
        prop_assert!((merged.confidence - confidence * 0.8).abs() < 1e-9);
    }
}
