//! Command-line front end for `cachebench`.
//!
//! ```bash
//! # One kernel, one size
//! cachebench run line --size 2048
//!
//! # Blocked kernel over the default large sizes, appended to CSV
//! cachebench --output csv run block --multiple-sizes --block-size 128
//!
//! # Full automated sweep on 8 threads
//! cachebench --threads 8 --output csv sweep
//!
//! # Sequential vs parallel comparison
//! cachebench compare --size 2048
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cachebench::{
    config::DEFAULT_BLOCK_SIZE, open_hardware_counters, parallel_report, ConsoleSink,
    CounterSession, CsvSink, Driver, ExperimentConfig, JsonLinesSink, KernelKind, RecordSink,
    UnavailableCounters,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

/// Matrix multiplication cache and parallelism benchmark
#[derive(Parser, Debug)]
#[command(name = "cachebench")]
#[command(version)]
struct Args {
    /// Where result records go
    #[arg(long, value_enum, default_value_t = OutputMode::Console, global = true)]
    output: OutputMode,

    /// Destination file for csv and jsonl output
    #[arg(long, default_value = "metrics/results.csv", global = true)]
    out: PathBuf,

    /// Skip hardware counters and report zeroed L1/L2 values
    #[arg(long, global = true)]
    no_counters: bool,

    /// Worker threads for the parallel kernels (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one kernel
    Run {
        /// Kernel to run (standard, line, block, line_ext_parallel, line_int_parallel)
        kernel: KernelKind,

        /// Matrix dimension
        #[arg(long, default_value_t = 1024, conflicts_with = "multiple_sizes")]
        size: usize,

        /// Use the default size list of the kernel's sweep tier
        #[arg(long)]
        multiple_sizes: bool,

        /// Block size for the block kernel
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
    },
    /// Run the full automated sweep
    Sweep {
        /// JSON experiment configuration (defaults to the built-in plan)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Small-tier sizes
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Large-tier sizes
        #[arg(long, value_delimiter = ',')]
        large_sizes: Option<Vec<usize>>,

        /// Block sizes for the block kernel
        #[arg(long, value_delimiter = ',')]
        block_sizes: Option<Vec<usize>>,

        /// Kernels to include
        #[arg(long, value_delimiter = ',')]
        kernels: Option<Vec<KernelKind>>,
    },
    /// Compare sequential Line against both parallel variants
    Compare {
        /// Matrix dimension
        #[arg(long, default_value_t = 2048)]
        size: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Console,
    Csv,
    Jsonl,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();

    match args.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build worker pool")?;
            info!(threads, "Using dedicated worker pool");
            pool.install(|| execute(&args))
        }
        None => execute(&args),
    }
}

fn execute(args: &Args) -> Result<()> {
    let config = match &args.command {
        Command::Compare { size } => {
            for report in parallel_report(*size)? {
                println!("{report}");
            }
            return Ok(());
        }
        Command::Run {
            kernel,
            size,
            multiple_sizes,
            block_size,
        } => {
            let sizes = if *multiple_sizes {
                let defaults = ExperimentConfig::default();
                match kernel {
                    KernelKind::Block => defaults.large_sizes,
                    _ => defaults.sizes,
                }
            } else {
                vec![*size]
            };
            ExperimentConfig::single(*kernel, sizes, *block_size)
        }
        Command::Sweep {
            config,
            sizes,
            large_sizes,
            block_sizes,
            kernels,
        } => {
            let mut experiment = match config {
                Some(path) => load_config(path)?,
                None => ExperimentConfig::default(),
            };
            if let Some(sizes) = sizes {
                experiment.sizes = sizes.clone();
            }
            if let Some(large_sizes) = large_sizes {
                experiment.large_sizes = large_sizes.clone();
            }
            if let Some(block_sizes) = block_sizes {
                experiment.block_sizes = block_sizes.clone();
            }
            if let Some(kernels) = kernels {
                experiment.kernels = kernels.clone();
            }
            experiment
        }
    };
    config.validate().context("Invalid experiment configuration")?;

    let counters: Box<dyn CounterSession> = if args.no_counters {
        Box::new(UnavailableCounters::new("disabled with --no-counters"))
    } else {
        open_hardware_counters()
    };

    let sink = open_sink(args.output, &args.out)?;
    let mut driver = Driver::new(counters, sink);
    let summary = driver.run(&config)?;

    if args.output != OutputMode::Console {
        info!(path = %args.out.display(), records = summary.records, "Results written");
    }
    Ok(())
}

fn open_sink(mode: OutputMode, path: &Path) -> Result<Box<dyn RecordSink>> {
    Ok(match mode {
        OutputMode::Console => Box::new(ConsoleSink::stdout()),
        OutputMode::Csv => Box::new(
            CsvSink::append(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        OutputMode::Jsonl => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(JsonLinesSink::new(io::BufWriter::new(file)))
        }
    })
}

fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}
