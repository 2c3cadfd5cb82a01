mod check_config_cmd;
mod init_cmd;
mod serve_cmd;
mod terminal_output;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use linkdrop_config::{config_dir, config_file_path, load_config, prepare_with};
use linkdrop_logging::{init_logger, LogOptions};

#[derive(Parser)]
#[command(name = "linkdrop")]
#[command(about = "linkdrop: share files through Telegram deep links")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.linkdrop/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot and its HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the configuration and print it with secrets masked
    CheckConfig,
    /// Write a starter config file
    Init {
        /// Replace an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(|| config_file_path(&config_dir()));
    let env: HashMap<String, String> = std::env::vars().collect();

    match cli.command {
        Commands::Serve { port } => {
            let config = prepare_with(load_config(&path).await?, &env)?;
            init_logger(&LogOptions {
                level: config.log_level().to_string(),
                dir: config.log_dir(),
                json: config.log_json(),
            });
            serve_cmd::run(config, port).await?;
        }
        Commands::CheckConfig => {
            check_config_cmd::run(&load_config(&path).await?, &env, &path)?;
        }
        Commands::Init { force } => init_cmd::run(&path, force).await?,
    }

    Ok(())
}
