// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod board;
pub mod config;
pub mod display;
pub mod driver;
pub mod fetch;
pub mod priority;
pub mod protocol;
pub mod schedule;
pub mod tui;
