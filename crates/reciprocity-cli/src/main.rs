use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reciprocity_core::{Population, SimConfig};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reciprocity")]
#[command(about = "Indirect reciprocity donation game across isolated tribes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation and print the total payout of every generation
    Run(RunArgs),
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Path to a JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tribes
    #[arg(short = 't', long)]
    tribes: Option<usize>,

    /// Number of agents per tribe
    #[arg(short = 'a', long)]
    agents: Option<usize>,

    /// Cost c to donate
    #[arg(short = 'c', long)]
    cost: Option<i64>,

    /// Benefit b received from a donation
    #[arg(short = 'b', long)]
    benefit: Option<i64>,

    /// Number of generations to simulate
    #[arg(short = 'g', long)]
    generations: Option<usize>,

    /// Run seed
    #[arg(long)]
    seed: Option<u64>,

    /// Play tribes one after another instead of on a worker pool
    #[arg(long)]
    sequential: bool,

    /// Size of a dedicated worker pool
    #[arg(long)]
    threads: Option<usize>,
}

impl RunArgs {
    fn into_config(self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open config file {}", path.display()))?;
                let config: SimConfig = serde_json::from_reader(BufReader::new(file))
                    .context("failed to parse config")?;
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            None => SimConfig::default(),
        };

        if let Some(tribes) = self.tribes {
            config.num_tribes = tribes;
        }
        if let Some(agents) = self.agents {
            config.agents_per_tribe = agents;
        }
        if let Some(cost) = self.cost {
            config.cost = cost;
        }
        if let Some(benefit) = self.benefit {
            config.benefit = benefit;
        }
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.sequential {
            config.parallel = false;
        }
        if let Some(threads) = self.threads {
            config.worker_threads = threads;
        }
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_population(config: SimConfig) -> Result<Population> {
    Population::new(config).context("failed to build population")
}

fn run(args: RunArgs) -> Result<()> {
    let mut population = build_population(args.into_config()?)?;
    let summary = population.run().context("simulation failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for total in summary.total_payouts() {
        writeln!(out, "{total}")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run(args) => run(args)?,
    }
    Ok(())
}
