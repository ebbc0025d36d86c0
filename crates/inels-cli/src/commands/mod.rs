//! Command handlers: bridge CLI args to core calls and output formatting.

pub mod config_cmd;
pub mod entities;
