//! SocialSim CLI - Social Network Activity Simulator
//!
//! Usage:
//!   socialsim run [OPTIONS]    Sign up users, post and like until exhaustion
//!
//! Examples:
//!   socialsim run --offline --seed 42
//!   socialsim run --config settings.yaml
//!   socialsim run --config settings.yaml --users 20 --max-likes 10 --json

use clap::{Parser, Subcommand};
use socialsim::{Config, ConfigError, Simulation};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "socialsim")]
#[command(author, version, about = "Social Network Activity Simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation against the service (or offline)
    Run {
        /// Configuration file path (YAML)
        #[arg(short, long, env = "SOCIALSIM_CONFIG")]
        config: Option<String>,

        /// Use the in-memory gateway instead of the service
        #[arg(long)]
        offline: bool,

        /// Base URL of the service API
        #[arg(long, env = "SOCIALSIM_BASE_URL")]
        base_url: Option<String>,

        /// Number of users to sign up
        #[arg(long)]
        users: Option<i64>,

        /// Maximum posts per user
        #[arg(long)]
        max_posts: Option<i64>,

        /// Maximum likes per user
        #[arg(long)]
        max_likes: Option<i64>,

        /// Dictionary file (JSON word -> definition)
        #[arg(long)]
        dictionary: Option<PathBuf>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },
}

struct Overrides {
    offline: bool,
    base_url: Option<String>,
    users: Option<i64>,
    max_posts: Option<i64>,
    max_likes: Option<i64>,
    dictionary: Option<PathBuf>,
    seed: Option<u64>,
}

fn build_config(config_file: Option<String>, overrides: Overrides) -> Result<Config, ConfigError> {
    let mut config = if let Some(path) = config_file {
        Config::from_file(&path)?
    } else {
        Config::default()
    };

    // Override with CLI arguments
    if overrides.offline {
        config.settings.offline_mode = true;
    }
    if let Some(base_url) = overrides.base_url {
        config.settings.base_url = base_url;
    }
    if let Some(users) = overrides.users {
        config.limits.number_of_users = users;
    }
    if let Some(max_posts) = overrides.max_posts {
        config.limits.max_posts_per_user = max_posts;
    }
    if let Some(max_likes) = overrides.max_likes {
        config.limits.max_likes_per_user = max_likes;
    }
    if overrides.dictionary.is_some() {
        config.content.dictionary = overrides.dictionary;
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }

    Ok(config)
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let directive = if verbose {
        "socialsim=debug"
    } else {
        "socialsim=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            offline,
            base_url,
            users,
            max_posts,
            max_likes,
            dictionary,
            seed,
            json,
            verbose,
        } => {
            init_tracing(verbose)?;

            let config = build_config(
                config,
                Overrides {
                    offline,
                    base_url,
                    users,
                    max_posts,
                    max_likes,
                    dictionary,
                    seed,
                },
            )?;

            let mut simulation = Simulation::from_config(&config)?;
            let summary = simulation.run().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }

            if !summary.is_completed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
