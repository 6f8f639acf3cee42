//! Exprgen CLI - fuzz corpus generator for an expression language
//!
//! Writes one validated, previously unseen expression per line to stdout.
//! Logs and crash dumps go to stderr.

use std::backtrace::Backtrace;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use exprgen::prelude::*;

/// Exprgen - weighted random expression corpus generator
#[derive(Parser)]
#[command(name = "exprgen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, validate and emit new expressions until stopped
    Run {
        /// Checker program invoked as `PROGRAM [ARGS..] compile|run`
        #[arg(long, required_unless_present = "unchecked")]
        oracle: Option<String>,

        /// Extra argument passed to the checker (repeatable)
        #[arg(long = "oracle-arg", requires = "oracle", allow_hyphen_values = true)]
        oracle_args: Vec<String>,

        /// Skip validation and emit deduplicated generator output
        #[arg(long, conflicts_with = "oracle")]
        unchecked: bool,

        /// Random seed (OS entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON generator configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many new expressions
        #[arg(short, long)]
        limit: Option<usize>,

        /// Per-call checker timeout, overrides the configuration
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Show a spinner on stderr
        #[arg(long)]
        progress: bool,
    },

    /// Print generated expressions without validation
    Sample {
        /// Number of expressions
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Fixed depth budget instead of the weighted depth table
        #[arg(short, long)]
        depth: Option<usize>,

        /// Random seed (OS entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON generator configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show shape statistics over sampled trees
    Stats {
        /// Number of trees to sample
        #[arg(short = 'n', long, default_value = "10000")]
        count: usize,

        /// Random seed (OS entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON generator configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Print the evaluation environment as JSON
    Env,

    /// Print the default generator configuration as JSON
    Config,
}

const DUMP_RULE: &str = "==========================";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    install_panic_hook();

    let result = match cli.command {
        Commands::Run {
            oracle,
            oracle_args,
            unchecked,
            seed,
            config,
            limit,
            timeout_ms,
            progress,
        } => {
            let checker = if unchecked { None } else { oracle };
            run(RunOptions {
                checker,
                checker_args: oracle_args,
                seed,
                config,
                limit,
                timeout_ms,
                progress,
            })
        }
        Commands::Sample {
            count,
            depth,
            seed,
            config,
        } => sample(count, depth, seed, config.as_deref()),
        Commands::Stats {
            count,
            seed,
            config,
            output,
        } => stats(count, seed, config.as_deref(), &output),
        Commands::Env => print_json(&Environment::default().to_json()),
        Commands::Config => GeneratorConfig::default()
            .to_json_pretty()
            .and_then(|json| print_line(&json)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(Error::Fault {
            source_code,
            message,
        }) => {
            crash_dump(&source_code, &message);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "exprgen failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to configure logging: {e}");
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        error!("{info}\n{backtrace}");
    }));
}

fn crash_dump(source_code: &str, message: &str) {
    let backtrace = Backtrace::force_capture();
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{DUMP_RULE}\n{source_code}\n{DUMP_RULE}");
    let _ = writeln!(stderr, "{message}\n\n{backtrace}");
}

struct RunOptions {
    checker: Option<String>,
    checker_args: Vec<String>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    limit: Option<usize>,
    timeout_ms: Option<u64>,
    progress: bool,
}

fn run(options: RunOptions) -> Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(ms) = options.timeout_ms {
        config.timeout_ms = ms;
    }

    let oracle: Box<dyn Oracle> = match options.checker {
        Some(program) => {
            let oracle = ProcessOracle::new(program)
                .with_args(options.checker_args)
                .with_timeout(config.timeout_ms);
            if !oracle.is_available() {
                warn!(oracle = oracle.name(), "checker could not be started");
            }
            Box::new(oracle)
        }
        None => Box::new(AcceptAllOracle),
    };

    let rng = seeded_rng(options.seed);
    let mut pipeline = CorpusPipeline::new(&config, Environment::default(), oracle, rng)?
        .show_progress(options.progress);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let stats = pipeline.run(&mut handle, options.limit)?;

    info!(
        accepted = stats.accepted,
        attempts = stats.attempts,
        throughput = %format!("{:.0}/s", stats.throughput()),
        "done"
    );
    Ok(())
}

fn sample(count: usize, depth: Option<usize>, seed: Option<u64>, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let generator = Generator::new(&config, &Environment::default())?;
    let mut rng = seeded_rng(seed);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for _ in 0..count {
        let expr = match depth {
            Some(depth) => generator.generate_at(depth, &mut rng),
            None => generator.generate(&mut rng),
        };
        writeln!(handle, "{}", expr.code)?;
    }
    Ok(())
}

fn stats(count: usize, seed: Option<u64>, config: Option<&Path>, output: &str) -> Result<()> {
    let config = load_config(config)?;
    let generator = Generator::new(&config, &Environment::default())?;
    let mut rng = seeded_rng(seed);
    let stats = generator.stats(count, &mut rng);

    if output == "json" {
        return print_json(&serde_json::to_value(&stats)?);
    }

    println!("Generation Statistics ({} samples):", stats.samples);
    println!("  Mean depth:       {:.2}", stats.mean_depth());
    println!("  Max depth:        {}", stats.max_depth);
    println!("  Mean node count:  {:.2}", stats.mean_node_count());
    println!("  Mean length:      {:.2}", stats.mean_code_len());
    println!();
    println!("Constructs:");
    for (kind, count) in &stats.kind_counts {
        let roots = stats.root_counts.get(kind).copied().unwrap_or(0);
        println!(
            "  {kind:<12} {count:>10} ({:>5.1}%)  roots: {roots}",
            stats.kind_percentage(*kind)
        );
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let config = match path {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, "seeding generator");
    StdRng::seed_from_u64(seed)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    print_line(&serde_json::to_string_pretty(value)?)
}

fn print_line(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
