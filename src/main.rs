use std::process::ExitCode;

use tracing::{error, info};

use graphauth::{Config, Database, GraphicalVerifier, ImagePool, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = graphauth::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        graphauth::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: Config) -> graphauth::Result<()> {
    config.validate()?;

    info!("graphauth - Graphical Password Authentication");

    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    let pool = ImagePool::from_config(&config.graphical, &config.web.static_path)?;
    let verifier = GraphicalVerifier::from_config(&config.graphical, pool)?;
    info!(
        images = verifier.pool().len(),
        min = verifier.min_images(),
        max = verifier.max_images(),
        algorithm = %verifier.algorithm(),
        "Graphical password pool ready"
    );

    WebServer::new(&config.web, db, verifier)?.run().await
}
