//! CLI command implementations.

pub mod filetree;
pub mod reset_build;
pub mod serve;
