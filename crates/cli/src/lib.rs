//! Command implementations behind the `wager-sim` binary.

pub mod commands;
