use crate::params::ParamSet;
use crate::solvers::{StepControl, Tsit5};
use crate::traits::{State, VectorField};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Length of one integration window.
    pub horizon: f64,
    /// Number of evenly spaced grid points per window (initial point included).
    pub samples: usize,
    /// Additional windows allowed beyond the first. The total number of
    /// integrations is therefore `max_rounds + 1`.
    pub max_rounds: usize,
    /// Per-component tolerance on the difference between the endpoints of
    /// consecutive windows.
    pub tolerance: f64,
    /// A species persists when its final total count exceeds this.
    pub persistence_threshold: f64,
    pub step_control: StepControl,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            horizon: 50.0,
            samples: 500,
            max_rounds: 100,
            tolerance: 1e-4,
            persistence_threshold: 1e-3,
            step_control: StepControl::default(),
        }
    }
}

/// How the convergence loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Consecutive window endpoints agreed to within tolerance.
    Converged,
    /// The round budget ran out before the endpoints settled. Still a
    /// defined outcome: classification proceeds on the state reached.
    CapReached,
}

/// Long-run result of one parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub eq_sp1: bool,
    pub eq_sp2: bool,
    pub coexistence: bool,
    /// Final state `[F1, M1, F2, M2]`.
    pub state: State,
    /// Number of integration windows actually run.
    pub rounds: usize,
    pub termination: Termination,
}

/// Drives repeated fixed-horizon integration of `field` from the initial
/// conditions in `params` until the window endpoints stop moving, then
/// classifies persistence of each species.
pub fn solve_equilibrium(
    field: &impl VectorField,
    params: &ParamSet,
    settings: &SolverSettings,
) -> Result<Outcome> {
    if settings.horizon <= 0.0 || !settings.horizon.is_finite() {
        bail!("horizon must be positive and finite, got {}", settings.horizon);
    }
    if settings.samples < 2 {
        bail!("samples must be at least 2, got {}", settings.samples);
    }
    if settings.tolerance <= 0.0 {
        bail!("tolerance must be positive, got {}", settings.tolerance);
    }
    if settings.persistence_threshold <= 0.0 {
        bail!(
            "persistence threshold must be positive, got {}",
            settings.persistence_threshold
        );
    }
    params.validated()?;

    let mut stepper = Tsit5::new(settings.step_control);
    let mut current = params.initial_state();
    let mut rounds = 0;

    let termination = loop {
        let window = stepper.solve_grid(
            field,
            params,
            current,
            settings.horizon,
            settings.samples,
        )?;
        let next = window[settings.samples - 1];
        rounds += 1;

        let settled = current
            .iter()
            .zip(next.iter())
            .all(|(a, b)| (b - a).abs() <= settings.tolerance);
        current = next;

        if settled {
            break Termination::Converged;
        }
        if rounds > settings.max_rounds {
            break Termination::CapReached;
        }
    };

    let eq_sp1 = current[0] + current[1] > settings.persistence_threshold;
    let eq_sp2 = current[2] + current[3] > settings.persistence_threshold;

    Ok(Outcome {
        eq_sp1,
        eq_sp2,
        coexistence: eq_sp1 && eq_sp2,
        state: current,
        rounds,
        termination,
    })
}
