use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mutuals_matcher::config::Config;
use mutuals_matcher::data::{Artifacts, GRAPH_SNAPSHOT};
use mutuals_matcher::model::NewUser;
use mutuals_matcher::service::MatchService;
use mutuals_matcher::storage::MemoryStore;
use mutuals_matcher::{cluster, report};

/// File holding the record store inside a state directory
const STORE_FILE: &str = "store.json";

#[derive(Parser, Debug)]
#[clap(
    name = "mutuals-matcher",
    about = "Assign new users to interest communities and small subgroups"
)]
struct Cli {
    /// JSON configuration file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the graph, partition and tag artifacts
    #[clap(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cluster a candidate with the given interests would join
    Assign {
        /// Identifier for the candidate; must not name an existing graph node
        #[clap(long, default_value = "candidate")]
        user_id: String,

        /// Comma separated interest names
        #[clap(long, value_delimiter = ',')]
        interests: Vec<String>,
    },

    /// Register a user profile and place them into a group and subgroup
    Register {
        /// JSON profile of the new user
        #[clap(long)]
        profile: PathBuf,

        /// Directory keeping groups, subgroups and users between runs
        #[clap(long, default_value = "state")]
        state: PathBuf,
    },

    /// Show a registered user with their subgroup mates
    Show {
        /// User to look up
        user_id: String,

        /// Directory keeping groups, subgroups and users between runs
        #[clap(long, default_value = "state")]
        state: PathBuf,
    },

    /// Convert the graph artifact into a bincode snapshot
    Snapshot {
        /// Output path, defaults to the snapshot file in the artifact directory
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Write a summary of the artifacts
    Report {
        /// Output directory for the report
        #[clap(long, default_value = "report")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = args.artifacts {
        config.artifact_dir = dir;
    }

    let artifacts = Artifacts::load(&config.artifact_dir)?;

    match args.command {
        Command::Assign { user_id, interests } => {
            let assignment = cluster::assign_cluster(&artifacts, &user_id, &interests, config.top_n)?;
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }

        Command::Register { profile, state } => {
            let file = File::open(&profile)
                .with_context(|| format!("opening profile {}", profile.display()))?;
            let new_user: NewUser = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing profile {}", profile.display()))?;

            let store_path = state.join(STORE_FILE);
            let store = MemoryStore::load_or_default(&store_path)?;
            let service = MatchService::new(&config, artifacts, store);

            let today = chrono::Local::now().date_naive();
            let registration = service.register_user(new_user, today)?;
            service.store().save(&store_path)?;

            println!("{}", serde_json::to_string_pretty(&registration)?);
        }

        Command::Show { user_id, state } => {
            let store = MemoryStore::load(&state.join(STORE_FILE))?;
            let service = MatchService::new(&config, artifacts, store);

            let detail = service.user_detail(&user_id)?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }

        Command::Snapshot { output } => {
            let path = output.unwrap_or_else(|| config.artifact_dir.join(GRAPH_SNAPSHOT));
            artifacts.save_snapshot(&path)?;
            log::info!("Snapshot written to {}", path.display());
        }

        Command::Report { output_dir } => {
            report::write_report(&artifacts, &output_dir)?;
        }
    }

    Ok(())
}
