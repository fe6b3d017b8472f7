//! turbomcp-jwks CLI entry point

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = turbomcp_jwks_cli::Cli::parse();

    if let Err(e) = cli.execute().await {
        let exit_code = turbomcp_jwks_cli::error::display_error(&e);
        std::process::exit(exit_code);
    }
}
