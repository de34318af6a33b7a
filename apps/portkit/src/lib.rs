//! # portkit
//!
//! Command layer of the portkit binary: argument grammar, configuration
//! layering and command implementations on top of `portkit-core`.

pub mod cli;
pub mod config;
