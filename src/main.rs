use anyhow::Result;
use clap::{Parser, Subcommand};
use folio::{
    client::ServerClient,
    config::{self, AppConfig},
    player, works,
};
use log::{error, info};
use std::path::Path;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Manage the works of a portfolio site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, upload or delete works
    Works {
        #[command(subcommand)]
        action: works::WorksAction,
    },

    /// Show what is playing on Spotify
    NowPlaying {
        /// Server URL (e.g. http://localhost:3000)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Generate configuration file (.folio.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    let app_config = if Path::new(config::CONFIG_FILE).exists() {
        match AppConfig::load_from_file(config::CONFIG_FILE) {
            Ok(cfg) => {
                let abs_path = std::fs::canonicalize(config::CONFIG_FILE)
                    .unwrap_or_else(|_| std::path::PathBuf::from(config::CONFIG_FILE));
                info!("Using configuration file: {}", abs_path.display());
                Some(cfg)
            }
            Err(e) => {
                error!("Failed to load configuration file: {}, using defaults", e);
                None
            }
        }
    } else {
        None
    };
    let client_config = app_config.as_ref().and_then(|c| c.client.as_ref());

    match cli.command {
        Commands::Works { action } => {
            works::run(action, client_config)?;
        }

        Commands::NowPlaying { server } => {
            let config = client_config.cloned().unwrap_or_default().merge_cli(server);
            let client = ServerClient::new(&config)?;
            let now = player::now_playing(&client)?;
            println!("{}", player::describe(&now));
        }

        Commands::Genconfig { force } => {
            if let Err(e) = AppConfig::generate_config_file(config::CONFIG_FILE, force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
