//! esp-overlay library crate.
//!
//! Capture, detection, aim control and overlay rendering, wired together by
//! [`pipeline::run`].

pub mod aim;
pub mod capture;
pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod hotkeys;
pub mod logging;
pub mod pipeline;
pub mod present;
pub mod queue;
pub mod state;
