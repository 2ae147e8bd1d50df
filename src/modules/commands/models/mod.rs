pub mod command;

pub use command::{
    Action, CommandOutcome, ReadRequest, ReadResponse, ResourceType, UpdateCommand,
};
