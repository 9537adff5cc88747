use blogorm::config::{load_config, AppConfig};
use blogorm::models::register_blog_models;
use blogorm::{close_pool, create_pool, Registry, Result};
use std::process::ExitCode;
use tracing::{error, info, Level};

const USAGE: &str = "usage: blogorm <config.toml> [status|init]";

fn init_logging(config: &AppConfig) {
    let level = config.log.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: AppConfig, command: &str) -> Result<()> {
    let pool = create_pool(config.database)?;

    let mut registry = Registry::new();
    let models = register_blog_models(&mut registry)?;
    registry.create_tables(&pool)?;
    info!("tables ready");

    if command == "status" {
        for model in [&models.user, &models.blog, &models.comment] {
            let count = model.count(&pool)?;
            println!("{:<10} {}", model.schema().table_name(), count);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let (path, command) = match args.as_slice() {
        [_, path] => (path.as_str(), "status"),
        [_, path, command] if command == "status" || command == "init" => {
            (path.as_str(), command.as_str())
        }
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    let result = run(config, command);
    close_pool();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
