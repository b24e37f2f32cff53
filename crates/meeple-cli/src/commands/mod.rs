// crates/meeple-cli/src/commands/mod.rs
//
// Command module declarations for the Meeple CLI.

pub mod health;
pub mod model;
pub mod recommend;
