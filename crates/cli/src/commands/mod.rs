//! Subcommand implementations.

pub mod nav;
pub mod whois;
