// Entry point: configures a batch sweep from the command line, runs it over
// the rayon worker pool and writes the result table.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use aposema_core::fields::Regime;
use aposema_core::sweep::{run_sweep, SweepConfig};
use aposema_core::table::write_csv;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RegimeArg {
    /// Independent predation terms per species
    NoMimicry,
    /// Shared mimicry ring pooling both species' signals
    Mimicry,
    /// Dimorphic sex-limited mimicry
    Dslm,
}

impl From<RegimeArg> for Regime {
    fn from(arg: RegimeArg) -> Self {
        match arg {
            RegimeArg::NoMimicry => Regime::NoMimicry,
            RegimeArg::Mimicry => Regime::Mimicry,
            RegimeArg::Dslm => Regime::Dslm,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Vector-field variant to integrate
    #[arg(long, value_enum, default_value_t = RegimeArg::Mimicry)]
    regime: RegimeArg,

    /// Run with species 2 held at zero abundance
    #[arg(long, default_value_t = false)]
    single_species: bool,

    /// Number of random condition draws (N)
    #[arg(short = 'n', long, default_value_t = 5)]
    draws: usize,

    /// Interspecific competition coefficient (cb)
    #[arg(long, default_value_t = 0.3)]
    comp: f64,

    /// Output label; the table is written to df_<LABEL>.csv
    #[arg(long, default_value = "")]
    label: String,

    /// Survival-advantage values to enumerate (defaults to 0..=10)
    #[arg(long, value_delimiter = ',')]
    a_values: Option<Vec<f64>>,

    /// Mimicry-cost values to enumerate (defaults to 0.0..=1.0 in steps of 0.1)
    #[arg(long, value_delimiter = ',')]
    b_values: Option<Vec<f64>>,

    /// RNG seed; drawn from entropy when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Directory the result table is written into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Worker threads for the parallel map (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the worker pool")?;
    }

    let defaults = SweepConfig::default();
    let config = SweepConfig {
        regime: args.regime.into(),
        two_species: !args.single_species,
        draws: args.draws,
        comp: args.comp,
        label: args.label,
        a_values: args.a_values.unwrap_or(defaults.a_values),
        b_values: args.b_values.unwrap_or(defaults.b_values),
        solver: defaults.solver,
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, tuples = config.cardinality(), "seeded sweep");
    let mut rng = StdRng::seed_from_u64(seed);

    let report = run_sweep(&config, &mut rng)?;

    let path = args.out_dir.join(config.output_filename());
    write_csv(&path, &report.rows)?;
    tracing::info!(rows = report.rows.len(), path = %path.display(), "result table written");

    if !report.failures.is_empty() {
        for failure in &report.failures {
            tracing::error!(
                draw = failure.id.draw,
                a = failure.params.a,
                b_mim = failure.params.b_mim,
                error = %failure.error,
                "tuple failed"
            );
        }
        bail!(
            "{} of {} tuples failed numerically; their rows were omitted from {}",
            report.failures.len(),
            config.cardinality(),
            path.display()
        );
    }

    Ok(())
}
