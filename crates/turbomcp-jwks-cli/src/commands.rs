//! Subcommands

use std::io::{Read, Write};

use clap::{Args, Subcommand};
use tracing::info;
use turbomcp_jwks::discovery::{DiscoveryResolver, discovery_url};
use turbomcp_jwks::fetch::KeySetFetcher;
use turbomcp_jwks::{JwksCache, JwksConfig, KeySource};

use crate::error::{CliError, CliResult};
use crate::output::{
    DiscoveryReport, KeyReport, KeySetReport, OutputFormat, write_report,
};

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the verification key for a token
    Resolve(ResolveArgs),

    /// Show the discovery URL of an issuer and the JWKS URL it advertises
    Discover {
        /// Issuer, e.g. `https://accounts.google.com`
        issuer: String,
    },

    /// List the key IDs published at a JWKS endpoint
    Keys {
        /// JWKS endpoint URL
        jwks_url: String,
    },
}

/// Arguments for `resolve`
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Compact JWS token, or `-` to read it from stdin
    pub token: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Where `resolve` looks for the key set
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct SourceArgs {
    /// Follow the token's `iss` claim (default)
    #[arg(long)]
    pub issuer_claim: bool,

    /// Use a fixed discovery document
    #[arg(long, value_name = "URL")]
    pub discovery_url: Option<String>,

    /// Use a fixed JWKS endpoint
    #[arg(long, value_name = "URL")]
    pub jwks_url: Option<String>,
}

impl SourceArgs {
    /// Key source selected by the flags
    pub fn key_source(&self) -> KeySource {
        match (&self.discovery_url, &self.jwks_url) {
            (Some(url), _) => KeySource::DiscoveryUrl(url.clone()),
            (None, Some(url)) => KeySource::JwksUrl(url.clone()),
            (None, None) => KeySource::IssuerClaim,
        }
    }
}

impl Command {
    /// Run the command and write its result to `writer`
    ///
    /// # Errors
    ///
    /// Returns a [`CliError`] if resolution, discovery or fetching fails.
    pub async fn execute(
        self,
        config: JwksConfig,
        format: OutputFormat,
        writer: &mut dyn Write,
    ) -> CliResult<()> {
        match self {
            Self::Resolve(args) => {
                let token = read_token(&args.token)?;
                let source = args.source.key_source();

                let cache = JwksCache::new(config)?;
                cache.init_from_config().await?;

                info!(?source, "Resolving token key");
                let result = cache.resolve_with(&token, &source).await;
                cache.stop_refresh();

                write_report(&KeyReport::from(&result?), format, writer)
            }
            Self::Discover { issuer } => {
                let url = discovery_url(&issuer)?;
                let jwks_uri = DiscoveryResolver::new(&config)?
                    .jwks_url(url.as_str())
                    .await?;

                write_report(
                    &DiscoveryReport {
                        issuer,
                        discovery_url: url.to_string(),
                        jwks_uri,
                    },
                    format,
                    writer,
                )
            }
            Self::Keys { jwks_url } => {
                let set = KeySetFetcher::new(&config)?.fetch(&jwks_url).await?;
                write_report(&KeySetReport::from(&set), format, writer)
            }
        }
    }
}

fn read_token(arg: &str) -> CliResult<String> {
    let token = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        arg.to_string()
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::InvalidArguments("token is empty".to_string()));
    }
    Ok(token.strip_prefix("Bearer ").unwrap_or(token).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_defaults_to_issuer_claim() {
        assert_eq!(SourceArgs::default().key_source(), KeySource::IssuerClaim);
        assert_eq!(
            SourceArgs {
                jwks_url: Some("https://a/jwks".to_string()),
                ..SourceArgs::default()
            }
            .key_source(),
            KeySource::JwksUrl("https://a/jwks".to_string())
        );
    }

    #[test]
    fn test_read_token_strips_bearer_prefix() {
        assert_eq!(read_token("  Bearer a.b.c \n").unwrap(), "a.b.c");
        assert_eq!(read_token("a.b.c").unwrap(), "a.b.c");
        assert!(matches!(
            read_token("   "),
            Err(CliError::InvalidArguments(_))
        ));
    }
}
