//! CLI error type and user-facing error display

use colored::Colorize;
use thiserror::Error;
use turbomcp_jwks::{ErrorCategory, JwksError};

/// Errors surfaced by the `turbomcp-jwks` binary
#[derive(Error, Debug)]
pub enum CliError {
    /// Key resolution, discovery or fetch failed
    #[error(transparent)]
    Jwks(#[from] JwksError),

    /// Config file or environment could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Output could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Output could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl CliError {
    /// Hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Jwks(err) => match err.category() {
                ErrorCategory::Request => vec![
                    "Check that the token is a compact JWS (header.payload.signature)",
                    "The token header must carry a `kid`",
                ],
                ErrorCategory::Discovery => vec![
                    "Verify the issuer URL, including any path component",
                    "Run `turbomcp-jwks discover <ISSUER>` to inspect discovery",
                ],
                ErrorCategory::Fetch => vec![
                    "Verify the JWKS URL is reachable",
                    "Increase request_timeout_secs if the provider is slow",
                ],
                ErrorCategory::Lookup => vec![
                    "Run `turbomcp-jwks keys <JWKS_URL>` to list published key IDs",
                ],
                ErrorCategory::Configuration | ErrorCategory::Scheduling => vec![
                    "Check the config file and TURBOMCP_JWKS_* environment variables",
                ],
            },
            Self::Config(_) => vec![
                "Check the config file syntax (TOML, YAML or JSON by extension)",
                "Check TURBOMCP_JWKS_* environment variables",
            ],
            Self::InvalidArguments(_) => vec!["Use --help to see expected arguments"],
            _ => vec![],
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Format an error for terminal display
#[must_use]
pub fn format_error(error: &CliError) -> String {
    let title = match error {
        CliError::Jwks(err) => format!("{} error", err.category()),
        CliError::Config(_) => "Configuration error".to_string(),
        CliError::Json(_) => "Serialization error".to_string(),
        CliError::Io(_) => "I/O error".to_string(),
        CliError::InvalidArguments(_) => "Invalid arguments".to_string(),
    };

    let mut out = format!("{} {}\n  {}", "✗".red().bold(), title, error);
    let suggestions = error.suggestions();
    if !suggestions.is_empty() {
        out.push_str(&format!("\n\n{}", "Suggestion:".yellow()));
        for suggestion in suggestions {
            out.push_str(&format!("\n  {suggestion}"));
        }
    }
    out
}

/// Display an error to stderr and return the exit code
#[must_use]
pub fn display_error(error: &CliError) -> i32 {
    eprintln!("{}", format_error(error));
    match error {
        CliError::InvalidArguments(_) | CliError::Config(_) => 2,
        _ => 1,
    }
}
