//! The control panel: view navigation, status reconciliation and the
//! per-screen actions, wired together as an Elm-style model/update pair.
//!
//! - [`registry`] / [`views`]: shared UI elements and the navigation stack
//! - [`status`]: latest controller status and its projection
//! - [`screens`] / [`actions`]: per-view state and reply handling
//! - [`model`] / [`update`]: messages, commands and the pure state transition
//! - [`runtime`]: executes commands against a transport

pub mod actions;
pub mod model;
pub mod registry;
pub mod runtime;
pub mod screens;
pub mod status;
pub mod update;
pub mod views;

#[cfg(feature = "cli")]
pub mod input;
#[cfg(feature = "cli")]
pub mod render;
#[cfg(feature = "signals")]
pub mod signals;
