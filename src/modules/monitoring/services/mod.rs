pub mod ledger;
pub mod period_calculator;
pub mod scheduler;

pub use ledger::{
    derive_alerts, period_change, ActiveAlert, HealthDashboard, IntervalOverview, IntervalTrend,
    MonitoringLedger, NewSnapshot, TrendComparison,
};
pub use period_calculator::MonitoringPeriodCalculator;
pub use scheduler::{MonitoringScheduler, TickReport};
