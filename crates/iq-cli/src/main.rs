//! CLI frontend for Idiom Quest.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "iq",
    about = "Idiom Quest: learn Chinese idioms through AI-driven stories",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file holding the API key and model
    #[arg(long, global = true, env = "IQ_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game
    Play {
        /// Scenario id (see `iq scenarios`), or `random`
        #[arg(short, long)]
        scenario: Option<String>,

        /// Difficulty: easy, medium, hard (or 簡單, 中等, 困難)
        #[arg(short, long)]
        difficulty: Option<String>,

        /// Model to use instead of the stored one
        #[arg(short, long)]
        model: Option<String>,

        /// Gemini API key instead of the stored one
        #[arg(long)]
        api_key: Option<String>,

        /// Idiom dataset CSV, used for explanations and the context cache
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Bind the game to a context cache holding the idiom dataset
        #[arg(long)]
        cache: bool,

        /// Fail instead of playing without the cache when it cannot be created
        #[arg(long, requires = "cache")]
        require_cache: bool,

        /// Reuse the cache descriptor stored in this file across runs
        #[arg(long, requires = "cache")]
        session_file: Option<PathBuf>,

        /// Write the story as markdown when the game ends
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// List the built-in scenarios
    Scenarios {
        /// Only show scenarios of this difficulty
        #[arg(short, long)]
        difficulty: Option<String>,
    },

    /// Look an idiom up in the local dataset
    Lookup {
        /// Idiom, optionally followed by its pinyin in parentheses
        idiom: String,

        /// Idiom dataset CSV
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Show the explanation for this difficulty only
        #[arg(short, long)]
        difficulty: Option<String>,
    },

    /// Manage the remote context cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Maintain idiom datasets
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Provision a cache and store its descriptor
    Init {
        /// File holding the cache descriptor
        #[arg(long)]
        session_file: Option<PathBuf>,

        /// Idiom dataset CSV to upload
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Provision again even if the stored cache is still valid
        #[arg(short, long)]
        force: bool,
    },

    /// Show the stored cache descriptor
    Status {
        /// File holding the cache descriptor
        #[arg(long)]
        session_file: Option<PathBuf>,
    },

    /// Forget the stored cache descriptor
    Clear {
        /// File holding the cache descriptor
        #[arg(long)]
        session_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the Gemini API key
    SetKey {
        key: String,
    },

    /// Store the preferred model
    SetModel {
        model: String,
    },

    /// Show stored settings
    Show,
}

#[derive(Subcommand)]
enum DatasetAction {
    /// Keep only the rows of a dataset whose idiom is on an approved list
    Filter {
        /// Full dataset CSV (idiom in the second column)
        #[arg(long)]
        source: PathBuf,

        /// Approved list CSV with an `idiom` column
        #[arg(long)]
        keep: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let settings = commands::settings_store(cli.settings.as_deref());

    let result = match cli.command {
        Commands::Play {
            scenario,
            difficulty,
            model,
            api_key,
            dataset,
            cache,
            require_cache,
            session_file,
            export,
        } => {
            let opts = commands::play::PlayOptions {
                scenario,
                difficulty,
                model,
                api_key,
                dataset,
                cache,
                require_cache,
                session_file,
                export,
            };
            commands::play::run(&settings, opts).await
        }
        Commands::Scenarios { difficulty } => commands::scenarios::run(difficulty.as_deref()),
        Commands::Lookup {
            idiom,
            dataset,
            difficulty,
        } => commands::lookup::run(&idiom, dataset.as_deref(), difficulty.as_deref()),
        Commands::Cache { action } => match action {
            CacheAction::Init {
                session_file,
                dataset,
                force,
            } => {
                commands::cache::init(&settings, session_file.as_deref(), dataset.as_deref(), force)
                    .await
            }
            CacheAction::Status { session_file } => {
                commands::cache::status(&settings, session_file.as_deref())
            }
            CacheAction::Clear { session_file } => {
                commands::cache::clear(&settings, session_file.as_deref())
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::SetKey { key } => commands::config::set_key(&settings, &key),
            ConfigAction::SetModel { model } => commands::config::set_model(&settings, &model),
            ConfigAction::Show => commands::config::show(&settings),
        },
        Commands::Dataset { action } => match action {
            DatasetAction::Filter {
                source,
                keep,
                output,
            } => commands::dataset::filter(&source, &keep, output.as_deref()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

/// Log to stderr, filtered by `IQ_LOG` (default `warn`).
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("IQ_LOG").unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
