#![forbid(unsafe_code)]

//! Sprinkler panel (spkl): terminal control panel for a network sprinkler
//! controller.
//!
//! Two engines drive the panel:
//! 1. **View stack**: static view catalog with push/pop navigation and
//!    per-view header state (title, back button, right-hand action)
//! 2. **Status sync**: one "latest status" record fed by server-sent pushes
//!    and on-demand pulls, projected onto the display panel
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use sprinkler_panel::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use sprinkler_panel::core::config::Config;
//! use sprinkler_panel::panel::views::{ViewId, ViewStack};
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod panel;
pub mod transport;
