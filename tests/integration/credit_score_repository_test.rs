// Credit score persistence: MySQL repository (needs a database) and the in-memory store

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Duration;
use helpers::*;
use sqlx::MySqlPool;

use scorewatch::core::AppError;
use scorewatch::modules::scoring::models::{RiskLevel, ScoreComponents};
use scorewatch::modules::scoring::repositories::{
    CreditScoreStore, InMemoryCreditScoreStore, MySqlCreditScoreRepository,
};

async fn create_test_pool() -> MySqlPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set for database tests");

    let pool = MySqlPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

async fn cleanup(pool: &MySqlPool, company_id: &str) {
    sqlx::query("DELETE FROM credit_scores WHERE company_id = ?")
        .bind(company_id)
        .execute(pool)
        .await
        .ok();
}

fn unique_company() -> String {
    format!("test-company-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore = "Requires test database configuration"]
async fn test_mysql_round_trip_keeps_components_and_change() {
    let pool = create_test_pool().await;
    let repo = MySqlCreditScoreRepository::new(pool.clone());
    let company = unique_company();

    let previous = credit_score(&company, 72, utc(2026, 2, 1, 9));
    let mut current = credit_score(&company, 58, utc(2026, 3, 1, 9)).with_previous(Some(&previous));
    current.components = Some(ScoreComponents {
        cash_flow_quality: 61.5,
        business_stability: 55.0,
        financial_health: 48.0,
        payment_behavior: 80.0,
        growth_trend: 60.0,
    });
    current.explanations = vec!["Strong payment behavior (80/100)".to_string()];

    repo.save(&previous).await.unwrap();
    repo.save(&current).await.unwrap();

    let loaded = repo.find_by_id(&current.id).await.unwrap().unwrap();
    assert_eq!(loaded.score, 58);
    assert_eq!(loaded.risk_level, RiskLevel::Medium);
    assert_eq!(loaded.components, current.components);
    assert_eq!(loaded.score_change.unwrap().delta, -14);
    assert_eq!(loaded.explanations, current.explanations);

    let latest = repo.find_latest(&company).await.unwrap().unwrap();
    assert_eq!(latest.id, current.id);

    let history = repo.find_by_company(&company, 10).await.unwrap();
    assert_eq!(
        history.iter().map(|s| s.score).collect::<Vec<_>>(),
        vec![58, 72]
    );

    cleanup(&pool, &company).await;
}

#[tokio::test]
#[ignore = "Requires test database configuration"]
async fn test_mysql_mark_distributed() {
    let pool = create_test_pool().await;
    let repo = MySqlCreditScoreRepository::new(pool.clone());
    let company = unique_company();

    let score = credit_score(&company, 66, utc(2026, 3, 1, 9));
    repo.save(&score).await.unwrap();
    repo.mark_distributed(&score.id).await.unwrap();

    assert!(repo.find_by_id(&score.id).await.unwrap().unwrap().distributed);
    assert!(matches!(
        repo.mark_distributed("missing-id").await,
        Err(AppError::NotFound(_))
    ));

    cleanup(&pool, &company).await;
}

#[tokio::test]
#[ignore = "Requires test database configuration"]
async fn test_mysql_expiry_is_announced_once_for_current_score() {
    let pool = create_test_pool().await;
    let repo = MySqlCreditScoreRepository::new(pool.clone());
    let company = unique_company();

    let superseded = credit_score(&company, 50, utc(2026, 1, 1, 9));
    let current = credit_score(&company, 60, utc(2026, 1, 10, 9));
    repo.save(&superseded).await.unwrap();
    repo.save(&current).await.unwrap();

    let now = current.valid_until + Duration::hours(1);
    let expired: Vec<_> = repo
        .find_unannounced_expired(now)
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.company_id == company)
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, current.id);

    repo.mark_expiry_announced(&current.id).await.unwrap();
    let again = repo.find_unannounced_expired(now).await.unwrap();
    assert!(again.iter().all(|s| s.company_id != company));

    cleanup(&pool, &company).await;
}

#[tokio::test]
async fn test_in_memory_rejects_duplicate_ids() {
    let store = InMemoryCreditScoreStore::new();
    let score = credit_score("company-1", 70, utc(2026, 3, 1, 9));

    store.save(&score).await.unwrap();
    assert!(matches!(
        store.save(&score).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_in_memory_expiry_ignores_superseded_scores() {
    let store = InMemoryCreditScoreStore::new();
    let superseded = credit_score("company-1", 50, utc(2026, 1, 1, 9));
    let current = credit_score("company-1", 60, utc(2026, 1, 10, 9));
    let other = credit_score("company-2", 80, utc(2026, 1, 20, 9));
    store.save(&superseded).await.unwrap();
    store.save(&current).await.unwrap();
    store.save(&other).await.unwrap();

    // Only company-1's current score has run out by then
    let now = current.valid_until + Duration::hours(1);
    let expired = store.find_unannounced_expired(now).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, current.id);

    store.mark_expiry_announced(&current.id).await.unwrap();
    assert!(store.find_unannounced_expired(now).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_in_memory_history_is_newest_first_and_limited() {
    let store = InMemoryCreditScoreStore::new();
    for (day, value) in [(1, 40), (2, 45), (3, 50)] {
        store
            .save(&credit_score("company-1", value, utc(2026, 3, day, 9)))
            .await
            .unwrap();
    }

    let history = store.find_by_company("company-1", 2).await.unwrap();
    assert_eq!(history.iter().map(|s| s.score).collect::<Vec<_>>(), vec![50, 45]);
}
