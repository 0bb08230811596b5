use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use log::{error, info, LevelFilter};

use disklru::thread_pool::{RayonThreadPool, ThreadPool};
use disklru::{Cache, Result};

/// Drive a `Cache` concurrently from a caller-managed thread pool, to
/// exercise the coarse-lock concurrency model under contention.
///
/// The library itself never spawns a thread; this binary is the caller
/// that owns that decision.
#[derive(Parser)]
#[clap(author, version, about)]
struct StressArgs {
    /// Cache directory
    #[clap(long, value_parser, default_value = "./stress-cache")]
    dir: PathBuf,
    /// Number of values stored per key
    #[clap(long, value_parser, default_value_t = 2)]
    values: usize,
    /// Maximum total size in bytes before eviction kicks in
    #[clap(long, value_parser, default_value_t = 1024 * 1024)]
    max_size: u64,
    /// Number of distinct keys to hammer
    #[clap(long, value_parser, default_value_t = 64)]
    keys: usize,
    /// Number of edit/read rounds per key
    #[clap(long, value_parser, default_value_t = 200)]
    rounds: usize,
    /// Number of worker threads in the pool
    #[clap(long, value_parser, default_value_t = num_cpus::get())]
    threads: usize,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    if let Err(e) = run() {
        error!("{e}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args = StressArgs::parse();
    let cache = Cache::open(&args.dir, args.values, args.max_size)?;
    let pool = RayonThreadPool::new(args.threads)?;

    let committed = Arc::new(AtomicUsize::new(0));
    let contended = Arc::new(AtomicUsize::new(0));

    for round in 0..args.rounds {
        for key_idx in 0..args.keys {
            let cache = cache.clone();
            let committed = Arc::clone(&committed);
            let contended = Arc::clone(&contended);
            let key = format!("key-{key_idx}");
            let values = args.values;

            pool.spawn(move || match cache.edit(&key) {
                Ok(Some(editor)) => {
                    for i in 0..values {
                        if let Err(e) = editor.set(i, &format!("round {round} value {i}")) {
                            error!("write failed for {key:?}: {e}");
                        }
                    }
                    match editor.commit() {
                        Ok(()) => {
                            committed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => error!("commit failed for {key:?}: {e}"),
                    }
                }
                Ok(None) => {
                    contended.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => error!("edit failed for {key:?}: {e}"),
            });
        }
    }

    drop(pool);

    let (entries, size) = cache.stats();
    info!(
        "committed={} contended={} live_entries={entries} total_size={size}",
        committed.load(Ordering::Relaxed),
        contended.load(Ordering::Relaxed),
    );
    cache.close()
}
