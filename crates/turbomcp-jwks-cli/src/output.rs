//! Command results and their human / JSON renderings

use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use turbomcp_jwks::jsonwebtoken::jwk::PublicKeyUse;
use turbomcp_jwks::{Key, KeySet};

use crate::error::CliResult;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output (default)
    Human,
    /// Compact JSON (for scripting)
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Something a command prints
pub trait Report: Serialize {
    /// Write the human-readable form
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_human(&self, writer: &mut dyn Write) -> CliResult<()>;
}

/// Write `report` in `format`
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report<R: Report>(
    report: &R,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Human => report.write_human(writer),
        OutputFormat::Json => {
            writeln!(writer, "{}", serde_json::to_string(report)?)?;
            Ok(())
        }
        OutputFormat::JsonPretty => {
            writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?;
            Ok(())
        }
    }
}

/// A resolved verification key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub kid: String,
    pub kty: &'static str,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl From<&Key> for KeyReport {
    fn from(key: &Key) -> Self {
        Self {
            kid: key.key_id().to_string(),
            kty: key.key_type(),
            key_use: key.key_use().map(|u| match u {
                PublicKeyUse::Signature => "sig".to_string(),
                PublicKeyUse::Encryption => "enc".to_string(),
                PublicKeyUse::Other(other) => other.clone(),
            }),
            alg: key.algorithm().map(|alg| format!("{alg:?}")),
        }
    }
}

impl Report for KeyReport {
    fn write_human(&self, writer: &mut dyn Write) -> CliResult<()> {
        writeln!(writer, "{} {}", "✓".green().bold(), "Key resolved".bold())?;
        writeln!(writer, "  kid: {}", self.kid.cyan())?;
        writeln!(writer, "  kty: {}", self.kty)?;
        writeln!(writer, "  use: {}", self.key_use.as_deref().unwrap_or("-"))?;
        writeln!(writer, "  alg: {}", self.alg.as_deref().unwrap_or("-"))?;
        Ok(())
    }
}

/// Outcome of discovering an issuer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub issuer: String,
    pub discovery_url: String,
    pub jwks_uri: String,
}

impl Report for DiscoveryReport {
    fn write_human(&self, writer: &mut dyn Write) -> CliResult<()> {
        writeln!(writer, "{}", self.issuer.bold())?;
        writeln!(writer, "  discovery: {}", self.discovery_url)?;
        writeln!(writer, "  jwks_uri:  {}", self.jwks_uri.cyan())?;
        Ok(())
    }
}

/// Key IDs published at a JWKS endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySetReport {
    pub jwks_url: String,
    pub key_ids: Vec<String>,
}

impl From<&KeySet> for KeySetReport {
    fn from(set: &KeySet) -> Self {
        Self {
            jwks_url: set.jwks_url().to_string(),
            key_ids: set.key_ids().map(str::to_string).collect(),
        }
    }
}

impl Report for KeySetReport {
    fn write_human(&self, writer: &mut dyn Write) -> CliResult<()> {
        writeln!(
            writer,
            "{} ({} key{})",
            self.jwks_url.bold(),
            self.key_ids.len(),
            if self.key_ids.len() == 1 { "" } else { "s" }
        )?;
        for kid in &self.key_ids {
            writeln!(writer, "  {kid}")?;
        }
        Ok(())
    }
}
