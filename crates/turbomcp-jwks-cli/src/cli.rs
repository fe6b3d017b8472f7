//! Top-level argument parsing and tracing setup

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::commands::Command;
use crate::error::CliResult;
use crate::output::OutputFormat;
use crate::settings;

/// turbomcp-jwks - inspect OIDC discovery, JWKS endpoints and token keys
#[derive(Parser, Debug)]
#[command(
    name = "turbomcp-jwks",
    version,
    about = "Resolve token verification keys through OIDC discovery and JWKS endpoints",
    author
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE", env = "TURBOMCP_JWKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::CliError`] if config loading or the command fails.
    pub async fn execute(self) -> CliResult<()> {
        self.init_tracing();

        if self.no_color || !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }

        let config = settings::load(self.config.as_deref())?;
        let mut stdout = std::io::stdout().lock();
        self.command
            .execute(config, self.format, &mut stdout)
            .await
    }

    /// Log level selected by `-q` / `-v`
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        }
    }

    // Logs go to stderr so JSON output on stdout stays parseable
    fn init_tracing(&self) {
        tracing_subscriber::fmt()
            .with_max_level(self.log_level())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}
