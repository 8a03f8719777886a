use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use multihol_cli::auth;
use multihol_cli::config::{ConfigManager, get_config};
use multihol_cli::orchestrators::migrate_orchestrator::{MigrateOptions, migrate_command};
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "multihol")]
#[command(author, version, about = "Move items of a bibliographic record into one holding", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move every matching item of a record into the target holding
    Migrate {
        /// Bib (MMS) id of the record, prompted for when omitted
        bib_id: Option<String>,

        /// Id of the holding the items are moved into, prompted for when omitted
        holding_id: Option<String>,

        /// Fetch, filter and back up the items without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Do not ask for confirmation before moving
        #[arg(short, long)]
        yes: bool,

        /// Exit with status 1 when any item failed to move
        #[arg(long)]
        strict: bool,
    },

    /// Manage the catalog API key
    Auth {
        #[command(subcommand)]
        command: AuthCommand,

        /// Credential account to use instead of the configured one
        #[arg(long, global = true)]
        account: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Store an API key (prompted, or read from stdin)
    SetKey,
    /// Remove the stored API key
    Remove,
    /// Show stored keys and which one is active
    Status,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., moves.max_create_attempts)
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., catalog.base_url)
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("multihol_core", log::LevelFilter::Debug)
            .filter_module("multihol_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Migrate {
            bib_id,
            holding_id,
            dry_run,
            yes,
            strict,
        } => {
            let config = get_config().context("Failed to load configuration")?;
            let options = MigrateOptions {
                bib_id,
                holding_id,
                dry_run,
                assume_yes: yes,
            };

            let status = migrate_command(&config, options).await?;
            if strict && status.has_failures() {
                std::process::exit(1);
            }
        }
        Commands::Auth { command, account } => {
            let account = match account {
                Some(account) => account,
                None => {
                    get_config()
                        .context("Failed to load configuration")?
                        .credentials
                        .account
                }
            };

            match command {
                AuthCommand::SetKey => auth::set_key(&account).await?,
                AuthCommand::Remove => auth::remove(&account).await?,
                AuthCommand::Status => auth::status(&account).await?,
            }
        }
        Commands::Config { command } => {
            config_command(command)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => match manager.get(&key) {
            Ok(value) => {
                println!("{value}");
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Set { key, value } => match manager.set(&key, &value) {
            Ok(()) => {
                eprintln!("{}", format!("Set {key} = {value}").green());
                eprintln!(
                    "Configuration saved to: {}",
                    manager.get_config_path().display()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::List => {
            let items = match manager.list() {
                Ok(items) => items,
                Err(e) => {
                    eprintln!("{}", format!("Error: {e}").red());
                    std::process::exit(1);
                }
            };

            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, rest) = key.split_once('.').unwrap_or(("general", key.as_str()));
                sections
                    .entry(section.to_string())
                    .or_default()
                    .push((rest.to_string(), value));
            }

            for (section, mut items) in sections {
                println!("[{}]", section.yellow());
                items.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}
