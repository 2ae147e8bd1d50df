pub mod authorizer;
pub mod command_consumer;
pub mod resource_store;

pub use authorizer::InboundCommandAuthorizer;
pub use command_consumer::CommandConsumer;
pub use resource_store::{InMemoryResourceStore, ResourceStore};
