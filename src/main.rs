use rota_session::cli::{parse_args, run_cli_command};

use color_eyre::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Logs go to stderr so command output on stdout stays machine readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let command = parse_args(std::env::args());
    run_cli_command(command).await
}
