pub mod activity;
pub mod credit_score;

pub use activity::{ActivitySummary, BusinessContext, MonthlyAggregate};
pub use credit_score::{
    CreditScore, DataQuality, RiskLevel, ScoreChange, ScoreClass, ScoreComponent, ScoreComponents,
    ScoringMethod, VALIDITY_DAYS,
};
