//! ember-run - generates a firmware build tree from a configuration file.

mod loader;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ember_pipeline::ComponentRegistry;

#[derive(Parser, Debug)]
#[command(name = "ember-run")]
#[command(about = "Generate a firmware project from a configuration file")]
struct Cli {
    /// Path to the YAML configuration
    config: PathBuf,

    /// Directory to generate the project into
    #[arg(long, env = "EMBER_BUILD_PATH")]
    build_path: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("EMBER_LOG")
                .unwrap_or_else(|_| "ember_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from: {}", cli.config.display());

    let text = match std::fs::read_to_string(&cli.config) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };
    let yaml: serde_yaml::Value = match serde_yaml::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to parse YAML: {}", e);
            std::process::exit(1);
        }
    };
    let document = match loader::from_yaml(yaml) {
        Ok(d) => d,
        Err(e) => {
            error!("Invalid document:\n{}", e);
            std::process::exit(1);
        }
    };

    let registry = ComponentRegistry::with_builtins();
    let build = match ember_pipeline::run_and_write(&registry, &cli.config, document, cli.build_path)
    {
        Ok(b) => b,
        Err(e) => {
            error!("Build failed:\n{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Generated project for '{}' at {}",
        build.context.name(),
        build.context.build_path().display()
    );
}
