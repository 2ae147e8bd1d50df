pub mod credit_score_service;
pub mod features;
pub mod ml_client;
pub mod score_engine;

pub use credit_score_service::{CalculationOutcome, CreditScoreService};
pub use features::{build_features, FeatureSet, MlScoringRequest, StandardizedRatios};
pub use ml_client::{ExternalScoringClient, HttpScoringClient, MlScoringResponse};
pub use score_engine::{
    merge_hybrid, traditional_confidence, traditional_outcome, ScoreComputationEngine,
    StrategyOutcome, TraditionalHeuristics, HYBRID_MODEL_VERSION, TRADITIONAL_MODEL_VERSION,
};
