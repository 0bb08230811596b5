use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use log::{error, LevelFilter};

use disklru::{Cache, Result};

const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Operate a durable on-disk LRU cache directory from the command line.
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(propagate_version = true)]
struct CliArgs {
    /// Cache directory
    #[clap(long, value_parser, default_value = "./cache")]
    dir: PathBuf,
    /// Number of independent values stored per key
    #[clap(long, value_parser, default_value_t = 1)]
    values: usize,
    /// Maximum total size in bytes of all clean values before eviction
    #[clap(long, value_parser, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: u64,
    /// Subcommand
    #[clap(subcommand)]
    command: Commands,
}

/// Subcommands of `cache-cli`.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Print value 0 of a key, or report that it is missing
    Get {
        /// Key
        key: String,
    },
    /// Write a single value 0 for a key and commit it
    Put {
        /// Key
        key: String,
        /// Value to store at index 0
        value: String,
    },
    /// Remove a key
    Rm {
        /// Key
        key: String,
    },
    /// Print the number of live entries and their total committed size
    Stat,
    /// Force an immediate journal compaction
    Compact,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    if let Err(e) = run() {
        error!("{e}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();
    let cache = Cache::open(&cli.dir, cli.values, cli.max_size)?;

    match cli.command {
        Commands::Get { key } => match cache.read(&key)? {
            Some(snapshot) => println!("{}", snapshot.get_string(0)?),
            None => println!("key not found"),
        },
        Commands::Put { key, value } => {
            let Some(editor) = cache.edit(&key)? else {
                error!("{key:?} is already being edited");
                exit(1);
            };
            editor.set(0, &value)?;
            editor.commit()?;
        }
        Commands::Rm { key } => {
            if !cache.remove(&key)? {
                println!("key not found");
            }
        }
        Commands::Stat => {
            let (entries, size) = cache.stats();
            println!("{entries} entries, {size} bytes");
        }
        Commands::Compact => cache.rebuild_journal()?,
    }

    Ok(())
}
