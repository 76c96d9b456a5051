use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;

use cartoncaps_referrals::{repositories, services, settings};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Overrides `server.listen` from the config file.
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs)?;
    log::info!("Starting Carton Caps referral service.");

    let mut settings = settings::Settings::new(&args.config)?;
    if let Some(listen) = args.listen {
        settings.server.listen = listen;
    }

    let (directory, ledger) = repositories::connect(&settings).await?;
    services::start_services(settings, directory, ledger).await
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
