use crate::equilibrium::{solve_equilibrium, Outcome, SolverSettings};
use crate::fields::Regime;
use crate::params::ParamSet;
use anyhow::{bail, Result};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed literal constants shared by every tuple of a batch.
const PREDATION_RATE: f64 = 0.6;
const DEFENCE_LEVEL_SP1: f64 = 0.02;
const DEFENCE_LEVEL_SP2: f64 = 0.0;
const INVESTMENT_SKEW_SP2: f64 = 1.0;
const INTRA_COMPETITION: f64 = 1.0;
const CARRYING_CAPACITY: f64 = 1000.0;

/// Configuration for one batch sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Vector-field variant driving every tuple.
    pub regime: Regime,
    /// When false, species 2 is held at zero abundance and interspecific
    /// competition is forced to zero.
    pub two_species: bool,
    /// Number of random nuisance-parameter draws (N).
    pub draws: usize,
    /// Interspecific competition coefficient (cb).
    pub comp: f64,
    /// Label naming the result artifact: `df_<label>.csv`.
    pub label: String,
    /// Enumerated values for the survival advantage `a`.
    pub a_values: Vec<f64>,
    /// Enumerated values for the mimicry cost `B`.
    pub b_values: Vec<f64>,
    pub solver: SolverSettings,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            regime: Regime::Mimicry,
            two_species: true,
            draws: 5,
            comp: 0.3,
            label: String::new(),
            a_values: (0..=10).map(f64::from).collect(),
            b_values: (0..=10).map(|i| f64::from(i) / 10.0).collect(),
            solver: SolverSettings::default(),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.draws == 0 {
            bail!("a sweep needs at least one random draw");
        }
        if !self.comp.is_finite() || self.comp < 0.0 {
            bail!(
                "interspecific competition must be finite and non-negative, got {}",
                self.comp
            );
        }
        if self.a_values.is_empty() || self.b_values.is_empty() {
            bail!("both parameter-of-interest lists must be non-empty");
        }
        for &a in &self.a_values {
            if !a.is_finite() || a < 0.0 {
                bail!("survival advantage values must be finite and non-negative, got {a}");
            }
        }
        for &b in &self.b_values {
            if !(0.0..=1.0).contains(&b) {
                bail!("mimicry cost values must lie in [0, 1], got {b}");
            }
        }
        Ok(())
    }

    /// Name of the CSV artifact this configuration produces.
    pub fn output_filename(&self) -> String {
        format!("df_{}.csv", self.label)
    }

    /// Total number of tuples the sweep will evaluate.
    pub fn cardinality(&self) -> usize {
        self.draws * self.a_values.len() * self.b_values.len()
    }
}

/// One random draw of the nuisance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomDraw {
    pub ab1: f64,
    pub sr1: f64,
    pub ab2: f64,
    pub sr2: f64,
    pub b: f64,
    pub d: f64,
    pub k1: f64,
}

impl RandomDraw {
    /// Samples one draw from the fixed uniform ranges. In single-species
    /// mode the species-2 slots are pinned to zero.
    pub fn sample(rng: &mut impl Rng, two_species: bool) -> Self {
        let (ab2, sr2) = if two_species {
            (rng.gen_range(1.0..1000.0), rng.gen_range(0.2..0.8))
        } else {
            (0.0, 0.0)
        };
        Self {
            ab1: rng.gen_range(1.0..1000.0),
            sr1: rng.gen_range(0.2..0.8),
            ab2,
            sr2,
            b: rng.gen_range(0.7..1.0),
            d: rng.gen_range(0.1..0.3),
            k1: rng.gen_range(0.3..0.7),
        }
    }
}

/// Identifies which tuple produced a row: draw index plus the indices into
/// the two parameter-of-interest lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleId {
    pub draw: usize,
    pub a_idx: usize,
    pub b_idx: usize,
}

/// An explicit (parameters, outcome) pairing; rows cannot misalign no matter
/// how tuple evaluation is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    pub id: TupleId,
    pub params: ParamSet,
    pub outcome: Outcome,
}

/// A tuple whose integration failed. The rest of the batch is unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub id: TupleId,
    pub params: ParamSet,
    pub error: String,
}

/// Everything a finished batch produced. Failed tuples are omitted from the
/// CSV table and reported here instead.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub rows: Vec<SweepRow>,
    pub failures: Vec<SweepFailure>,
}

/// Lazily generates the cross product of the materialized random draws with
/// both parameter-of-interest lists. Tuples are yielded in (draw, a, B)
/// lexicographic order.
pub fn tuples<'a>(
    config: &'a SweepConfig,
    draws: &'a [RandomDraw],
) -> impl Iterator<Item = (TupleId, ParamSet)> + 'a {
    let comp = if config.two_species { config.comp } else { 0.0 };
    draws.iter().enumerate().flat_map(move |(draw, rc)| {
        config
            .a_values
            .iter()
            .enumerate()
            .flat_map(move |(a_idx, &a)| {
                config
                    .b_values
                    .iter()
                    .enumerate()
                    .map(move |(b_idx, &b_mim)| {
                        let id = TupleId { draw, a_idx, b_idx };
                        let params = ParamSet {
                            ab1: rc.ab1,
                            sr1: rc.sr1,
                            ab2: rc.ab2,
                            sr2: rc.sr2,
                            b: rc.b,
                            d: rc.d,
                            p: PREDATION_RATE,
                            l1: DEFENCE_LEVEL_SP1,
                            k1: rc.k1,
                            l2: DEFENCE_LEVEL_SP2,
                            k2: INVESTMENT_SKEW_SP2,
                            cw: INTRA_COMPETITION,
                            cb: comp,
                            k_cap: CARRYING_CAPACITY,
                            a,
                            b_mim,
                        };
                        (id, params)
                    })
            })
    })
}

/// Runs the whole batch: draws the nuisance parameters with the injected
/// RNG, then maps the equilibrium solver over the tuple set in parallel.
/// Tuple evaluations share nothing; each failure is logged and collected
/// without aborting the remainder.
pub fn run_sweep(config: &SweepConfig, rng: &mut impl Rng) -> Result<SweepReport> {
    config.validate()?;

    let draws: Vec<RandomDraw> = (0..config.draws)
        .map(|_| RandomDraw::sample(rng, config.two_species))
        .collect();
    let jobs: Vec<(TupleId, ParamSet)> = tuples(config, &draws).collect();
    tracing::info!(
        tuples = jobs.len(),
        regime = ?config.regime,
        two_species = config.two_species,
        "starting sweep"
    );

    let evaluated: Vec<Result<SweepRow, SweepFailure>> = jobs
        .into_par_iter()
        .map(|(id, params)| {
            match solve_equilibrium(&config.regime, &params, &config.solver) {
                Ok(outcome) => Ok(SweepRow {
                    id,
                    params,
                    outcome,
                }),
                Err(error) => {
                    tracing::warn!(?id, %error, "tuple failed");
                    Err(SweepFailure {
                        id,
                        params,
                        error: format!("{error:#}"),
                    })
                }
            }
        })
        .collect();

    let mut rows = Vec::with_capacity(evaluated.len());
    let mut failures = Vec::new();
    for item in evaluated {
        match item {
            Ok(row) => rows.push(row),
            Err(failure) => failures.push(failure),
        }
    }

    tracing::info!(
        rows = rows.len(),
        failures = failures.len(),
        "sweep finished"
    );
    Ok(SweepReport { rows, failures })
}
