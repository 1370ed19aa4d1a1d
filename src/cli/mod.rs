//! CLI module for rota-session.
//!
//! This module provides the command-line interface:
//! - Argument parsing
//! - Version and usage display
//! - Session commands (`status`, `watch`, `sign-in`, `sign-out`)
//!
//! # Usage
//!
//! ```ignore
//! use rota_session::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command).await?;
//! ```

pub mod args;
pub mod session;
pub mod version;

pub use args::{parse_args, usage, CliCommand};
pub use session::{
    handle_sign_in_command, handle_sign_out_command, handle_status_command, handle_watch_command,
};
pub use version::{version_line, VERSION};

use color_eyre::eyre::eyre;
use color_eyre::{Report, Result};

use crate::config::SessionConfig;
use crate::error::SessionError;

/// Wrap a synchronizer error for the terminal, headed by its category's
/// description so the first line says what kind of problem it is.
pub(crate) fn categorized(err: impl Into<SessionError>) -> Report {
    let err = err.into();
    let description = err.category().description();
    Report::new(err).wrap_err(description)
}

fn env_config() -> Result<SessionConfig> {
    SessionConfig::from_env().map_err(categorized)
}

/// Run a parsed CLI command.
///
/// Session commands read their configuration from the environment.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", usage());
            Ok(())
        }
        CliCommand::Invalid(reason) => {
            eprintln!("{}\n", usage());
            Err(eyre!(reason))
        }
        CliCommand::Status => handle_status_command(&env_config()?).await,
        CliCommand::Watch => handle_watch_command(&env_config()?).await,
        CliCommand::SignIn { email } => handle_sign_in_command(&env_config()?, &email).await,
        CliCommand::SignOut => handle_sign_out_command(&env_config()?).await,
    }
}
