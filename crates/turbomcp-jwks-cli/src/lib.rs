//! # turbomcp-jwks CLI
//!
//! Command-line front end for `turbomcp-jwks`: resolve the verification key
//! for a token, inspect an issuer's discovery document, or list the keys a
//! JWKS endpoint publishes.
//!
//! ```bash
//! # Key for a token, following its `iss` claim
//! turbomcp-jwks resolve eyJhbGciOi...
//!
//! # Same, against a fixed JWKS endpoint, as JSON
//! turbomcp-jwks -f json resolve --jwks-url https://example.com/jwks eyJhbGciOi...
//!
//! # Where does an issuer publish its keys?
//! turbomcp-jwks discover https://accounts.google.com
//!
//! # Which key IDs are live?
//! turbomcp-jwks keys https://www.googleapis.com/oauth2/v3/certs
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod settings;

pub use cli::Cli;
pub use commands::Command;
pub use error::{CliError, CliResult};
pub use output::OutputFormat;
