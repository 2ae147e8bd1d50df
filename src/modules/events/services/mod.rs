pub mod distributor;
pub mod event_bus;
pub mod metrics;
pub mod outbox;

pub use distributor::{threshold_alerts, DistributionResult, EventDistributor};
pub use event_bus::{EventBus, InProcessEventBus};
pub use metrics::{PublishMetrics, PublishStats};
pub use outbox::{DeferredJob, DeferredPublisher};
