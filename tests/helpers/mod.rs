// Shared fakes and fixtures for the unit and integration test targets
//
// Include from a test target with:
//   #[path = "../helpers/mod.rs"]
//   mod helpers;

#![allow(dead_code)]

pub mod fakes;

pub use fakes::*;
pub use fixtures::*;
