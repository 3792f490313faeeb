//! Command handlers.

pub mod check_config;
pub mod launch_command;
pub mod serve;
