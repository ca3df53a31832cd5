use clap::Parser;
use tracing::error;

use oddsmill::cli::{self, Cli};
use oddsmill::config::Config;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // A missing config file falls back to defaults (environment
    // overrides still apply); a malformed one is an error the user
    // needs to see.
    let loaded = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config)
    } else {
        Config::parse_toml("")
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load {}: {e}", cli.config);
            std::process::exit(1);
        }
    };

    config.init_logging();

    if let Err(e) = cli::run(cli, config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
