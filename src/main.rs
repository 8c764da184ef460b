use dotenvy::dotenv;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use eduvillage::accounts::{AccountEngine, SeedOutcome, TEST_USER_PASSWORD};
use eduvillage::core::config::AppConfig;
use eduvillage::main_module::run_server;
use eduvillage::shared::utils::{create_conn, run_migrations};

const USAGE: &str = "Usage: eduvillage [COMMAND]

Commands:
  serve              Run the web server (default)
  migrate            Apply pending database migrations and exit
  create-test-users  Create student1, teacher1 and admin1 accounts
  --help, -h         Show this message

Configuration is read from eduvillage.toml (override with EDUVILLAGE_CONFIG)
and EDUVILLAGE_* environment variables; DATABASE_URL is honoured.";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    if matches!(command, "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    init_logging();
    let config = AppConfig::from_env()?;

    match command {
        "serve" => run_server(config).await,
        "migrate" => {
            let pool = create_conn(&config.database)?;
            tokio::task::spawn_blocking(move || run_migrations(&pool))
                .await?
                .map_err(|e| anyhow::anyhow!(e))?;
            info!("Migrations are up to date");
            Ok(())
        }
        "create-test-users" => {
            let pool = create_conn(&config.database)?;
            let engine = AccountEngine::new(pool);
            for (username, outcome) in engine.create_test_users().await? {
                match outcome {
                    SeedOutcome::Created => {
                        println!("Created {} (password: {})", username, TEST_USER_PASSWORD)
                    }
                    SeedOutcome::AlreadyExists => println!("{} already exists", username),
                }
            }
            Ok(())
        }
        other => {
            error!("Unknown command: {}", other);
            eprintln!("{}", USAGE);
            anyhow::bail!("unknown command '{}'", other)
        }
    }
}
