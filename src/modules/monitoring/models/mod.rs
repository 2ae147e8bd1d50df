pub mod snapshot;

pub use snapshot::{
    Alert, AlertSeverity, AlertType, HealthStatus, MonitoringInterval, MonitoringSnapshot,
    PeriodBounds, PeriodChange, PeriodCumulative, Trend,
};
