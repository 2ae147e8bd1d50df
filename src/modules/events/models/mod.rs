pub mod event;
pub mod topics;

pub use event::{
    DomainEvent, ScoreAlertKind, ScoreAlertPayload, ScoreCalculatedPayload, ScoreExpiredPayload,
    ScoreRequestPayload, ScoreResponsePayload, ScoreUpdatedPayload,
};
pub use topics::resolve_topic;
