//! Command-line argument parsing for the rota-session CLI.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Print the resolved session once (default)
    Status,
    /// Print every session state change until Ctrl-C
    Watch,
    /// Sign in with email and a prompted password
    SignIn { email: String },
    /// End the current session
    SignOut,
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Arguments that could not be understood, with the reason
    Invalid(String),
}

/// Parse command-line arguments and return the appropriate command.
///
/// Flags win over subcommands; the first subcommand wins over later ones.
///
/// # Examples
///
/// ```
/// use rota_session::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["rota-session".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let args: Vec<String> = args.skip(1).collect();

    for arg in &args {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            _ => {}
        }
    }

    let mut rest = args.iter();
    match rest.next().map(String::as_str) {
        None | Some("status") => CliCommand::Status,
        Some("watch") => CliCommand::Watch,
        Some("sign-out") | Some("signout") => CliCommand::SignOut,
        Some("sign-in") | Some("signin") => match rest.next() {
            Some(email) if email.contains('@') => CliCommand::SignIn {
                email: email.clone(),
            },
            Some(other) => CliCommand::Invalid(format!("not an email address: {}", other)),
            None => CliCommand::Invalid("sign-in requires an email address".to_string()),
        },
        Some(other) => CliCommand::Invalid(format!("unknown command: {}", other)),
    }
}

/// Usage text for `--help`.
pub fn usage() -> String {
    format!(
        "rota-session {}

Usage: rota-session [COMMAND]

Commands:
  status          Print the current session (default)
  watch           Print every session change until Ctrl-C
  sign-in <EMAIL> Sign in; the password is prompted for
  sign-out        End the current session

Options:
  -h, --help      Print help
  -V, --version   Print version

Environment:
  ROTA_BACKEND_URL       Backend base URL (required)
  ROTA_ANON_KEY          Public anon key (required)
  ROTA_PROFILE_TABLE     Profile table (default: users)
  ROTA_STORAGE_PATH      Local storage file (default: ~/.rota/local_storage.json)
  ROTA_PROBE_TIMEOUT_MS  Startup session check timeout (default: 5000)
  RUST_LOG               Log filter (default: warn)",
        super::VERSION
    )
}
