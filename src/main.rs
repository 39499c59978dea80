use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use scopeprof::cli::{Cli, Command};
use scopeprof::{profile_scope, Profiler};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Read buffer size for the read-file demo
const READ_CHUNK: usize = 512 * 1024;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn random_sleep(max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(0..max_ms);
    thread::sleep(Duration::from_millis(ms));
}

fn some_processing(max_sleep_ms: u64) {
    profile_scope!("SomeProcessing");
    random_sleep(max_sleep_ms);
}

fn worker(profiler: &'static Profiler, iterations: usize, max_sleep_ms: u64) {
    if let Err(e) = profiler.declare_thread("Worker") {
        tracing::warn!("worker runs unprofiled: {}", e);
    }

    for _ in 0..iterations {
        random_sleep(max_sleep_ms);
        some_processing(max_sleep_ms);
    }
}

/// Fork `workers` threads that alternate sleeping and processing, then join
fn run_threads(
    profiler: &'static Profiler,
    workers: usize,
    iterations: usize,
    max_sleep_ms: u64,
) -> Result<()> {
    profiler.declare_thread("Main")?;

    profile_scope!("Worker fork & join");
    let handles: Vec<_> = (0..workers)
        .map(|_| thread::spawn(move || worker(profiler, iterations, max_sleep_ms)))
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            anyhow::bail!("worker thread panicked");
        }
    }
    Ok(())
}

/// Time opening, reading and closing `path`
fn run_read_file(profiler: &'static Profiler, path: &Path) -> Result<()> {
    profiler.declare_thread("File reader")?;

    let mut file = {
        profile_scope!("Open");
        File::open(path).with_context(|| format!("'{}' cannot be opened", path.display()))?
    };
    eprintln!("file opened");

    let bytes = {
        profile_scope!("Read");
        let mut buffer = vec![0u8; READ_CHUNK];
        let mut total = 0usize;
        loop {
            let n = file
                .read(&mut buffer)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if n == 0 {
                break;
            }
            total += n;
        }
        total
    };
    eprintln!("{} bytes read", bytes);

    {
        profile_scope!("Close");
        drop(file);
    }
    eprintln!("file closed");

    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let profiler = Profiler::global();

    match args.command {
        Command::Threads {
            workers,
            iterations,
            max_sleep_ms,
        } => run_threads(profiler, workers, iterations, max_sleep_ms)?,
        Command::ReadFile { path } => run_read_file(profiler, &path)?,
    }

    profiler
        .dump_to_writer(&mut std::io::stdout().lock(), args.format)
        .context("failed to write profile")?;

    Ok(())
}
