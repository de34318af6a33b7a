//! # Formats
//!
//! Text formats read from or written to source trees and projects:
//! module descriptions, the settings cache and `configure.ac`.

pub mod autoconf;
pub mod cache;
pub mod module_desc;
