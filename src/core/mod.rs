//! Core types: errors, configuration, shared helpers.

pub mod config;
pub mod errors;
pub mod helpers;
