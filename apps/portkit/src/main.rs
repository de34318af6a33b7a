//! # portkit
//!
//! Imports portable source modules, with everything they depend on, into an
//! autoconf project and keeps them up to date.
//!
//! ## Usage
//!
//! ```bash
//! # Import two modules into the current project
//! portkit --source-dir ~/src/modules import strdup getopt-gnu
//!
//! # Re-run the cached import after the module tree changed
//! portkit update --dry-run
//!
//! # Inspect module descriptions
//! portkit extract dependencies strdup
//! ```
//!
//! ## Exit Status
//!
//! | Status | Meaning                                       |
//! |--------|-----------------------------------------------|
//! | 0      | success                                       |
//! | 64     | usage error                                   |
//! | 65     | data error (unknown module, license, config)  |
//! | 70     | software error (I/O, patch program)           |

use clap::Parser;
use portkit::cli;
use portkit_core::ErrorCategory;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_USAGE: u8 = 64;
const EXIT_DATA: u8 = 65;
const EXIT_SOFTWARE: u8 = 70;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    match cli::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(match e.category() {
                ErrorCategory::Usage => EXIT_USAGE,
                ErrorCategory::Data => EXIT_DATA,
                ErrorCategory::Software => EXIT_SOFTWARE,
            })
        }
    }
}

/// Install the subscriber. PORTKIT_LOG_FORMAT=json enables machine-parseable
/// output.
fn init_tracing(verbose: bool) {
    let log_format = std::env::var("PORTKIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "portkit=debug,portkit_core=debug"
    } else {
        "portkit=info,portkit_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
