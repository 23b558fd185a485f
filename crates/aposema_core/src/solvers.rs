use crate::params::ParamSet;
use crate::traits::{State, VectorField};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integration failure for one parameter set. Fatal for the affected tuple;
/// the sweep generator catches it and carries on with the rest of the batch.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("non-finite state component at t = {t}")]
    NonFinite { t: f64 },
    #[error("step size underflow at t = {t} (dt = {dt:e})")]
    StepSizeUnderflow { t: f64, dt: f64 },
    #[error("integration grid needs a positive horizon and at least two samples (t_end = {t_end}, samples = {samples})")]
    InvalidGrid { t_end: f64, samples: usize },
}

/// Adaptive step-size controller settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepControl {
    pub rtol: f64,
    pub atol: f64,
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-8,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
        }
    }
}

/// Tsitouras 5(4) solver with embedded error estimation.
///
/// The propagated solution is 5th order; the 7th stage supplies the 4th-order
/// companion used purely for step-size control.
pub struct Tsit5 {
    control: StepControl,
    k1: State,
    k2: State,
    k3: State,
    k4: State,
    k5: State,
    k6: State,
    k7: State,
    tmp: State,
}

impl Tsit5 {
    pub fn new(control: StepControl) -> Self {
        let z = [0.0; 4];
        Self {
            control,
            k1: z,
            k2: z,
            k3: z,
            k4: z,
            k5: z,
            k6: z,
            k7: z,
            tmp: z,
        }
    }

    /// One trial step of size `dt` from `(t, state)`. Returns the 5th-order
    /// proposal and the scaled RMS error norm (acceptable when <= 1).
    fn try_step(
        &mut self,
        system: &impl VectorField,
        params: &ParamSet,
        t: f64,
        state: &State,
        dt: f64,
    ) -> (State, f64) {
        // Tsit5 coefficients.
        let c2 = 0.161;
        let c3 = 0.327;
        let c4 = 0.9;
        let c5 = 0.9800255409045097;
        let c6 = 1.0;

        let a21 = 0.161;

        let a31 = -0.008480655492356989;
        let a32 = 0.335480655492357;

        let a41 = 2.898;
        let a42 = -6.359447987781783;
        let a43 = 4.361447987781783;

        let a51 = 5.325864858437957;
        let a52 = -11.748883564062828;
        let a53 = 7.495539342889693;
        let a54 = -0.09249506636030195;

        let a61 = 5.86145544294642;
        let a62 = -12.92096931784711;
        let a63 = 8.159367898576159;
        let a64 = -0.071584973281401;
        let a65 = -0.02826857949054663;

        // b coefficients (5th order); also the a7j row, so k7 = f(t+dt, y5).
        let b1 = 0.09646076681806523;
        let b2 = 0.01;
        let b3 = 0.4798896504144996;
        let b4 = 1.379008574103742;
        let b5 = -3.290069515436099;
        let b6 = 2.324710524099774;

        // b - bhat: difference against the embedded 4th-order solution.
        let e1 = -0.001780011052225771;
        let e2 = -0.0008164344596567469;
        let e3 = 0.007880878010261995;
        let e4 = -0.1447110071732629;
        let e5 = 0.5823571654525552;
        let e6 = -0.45808210592918697;
        let e7 = 0.015151515151515152;

        system.apply(t, state, params, &mut self.k1);

        for i in 0..4 {
            self.tmp[i] = state[i] + dt * (a21 * self.k1[i]);
        }
        system.apply(t + c2 * dt, &self.tmp, params, &mut self.k2);

        for i in 0..4 {
            self.tmp[i] = state[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        system.apply(t + c3 * dt, &self.tmp, params, &mut self.k3);

        for i in 0..4 {
            self.tmp[i] =
                state[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        system.apply(t + c4 * dt, &self.tmp, params, &mut self.k4);

        for i in 0..4 {
            self.tmp[i] = state[i]
                + dt * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        system.apply(t + c5 * dt, &self.tmp, params, &mut self.k5);

        for i in 0..4 {
            self.tmp[i] = state[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        system.apply(t + c6 * dt, &self.tmp, params, &mut self.k6);

        let mut proposal = [0.0; 4];
        for i in 0..4 {
            proposal[i] = state[i]
                + dt * (b1 * self.k1[i]
                    + b2 * self.k2[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }
        system.apply(t + dt, &proposal, params, &mut self.k7);

        let mut err_sq = 0.0;
        for i in 0..4 {
            let err = dt
                * (e1 * self.k1[i]
                    + e2 * self.k2[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]
                    + e7 * self.k7[i]);
            let scale =
                self.control.atol + self.control.rtol * state[i].abs().max(proposal[i].abs());
            err_sq += (err / scale) * (err / scale);
        }
        let err_norm = (err_sq / 4.0).sqrt();

        (proposal, err_norm)
    }

    /// Integrates from t = 0 to `t_end`, returning the state at `samples`
    /// evenly spaced grid points (the initial state included). Steps are
    /// clamped so the solver lands exactly on each grid point; between grid
    /// points the step size is free-running under error control.
    pub fn solve_grid(
        &mut self,
        system: &impl VectorField,
        params: &ParamSet,
        initial: State,
        t_end: f64,
        samples: usize,
    ) -> Result<Vec<State>, IntegrationError> {
        if samples < 2 || !t_end.is_finite() || t_end <= 0.0 {
            return Err(IntegrationError::InvalidGrid { t_end, samples });
        }

        let mut grid = Vec::with_capacity(samples);
        let mut state = initial;
        let mut t = 0.0;
        grid.push(state);

        let grid_dt = t_end / (samples - 1) as f64;
        let min_step = 1e-12 * t_end.max(1.0);
        let mut dt = grid_dt;

        for sample in 1..samples {
            let target = grid_dt * sample as f64;
            while target - t > min_step {
                if !state.iter().all(|v| v.is_finite()) {
                    return Err(IntegrationError::NonFinite { t });
                }
                let h = dt.min(target - t);
                let (proposal, err_norm) = self.try_step(system, params, t, &state, h);

                let finite =
                    err_norm.is_finite() && proposal.iter().all(|v| v.is_finite());
                let accepted = finite && err_norm <= 1.0;
                if accepted {
                    t += h;
                    state = proposal;
                }

                // Proportional controller; a non-finite trial counts as a
                // maximally failed step.
                let factor = if !finite {
                    self.control.min_factor
                } else if err_norm <= f64::EPSILON {
                    self.control.max_factor
                } else {
                    (self.control.safety * err_norm.powf(-0.2))
                        .clamp(self.control.min_factor, self.control.max_factor)
                };
                dt = h * factor;
                if accepted {
                    // h may have been clamped to a sliver of the segment;
                    // never let that poison the next step size.
                    dt = dt.max(min_step);
                } else if dt < min_step {
                    return Err(IntegrationError::StepSizeUnderflow { t, dt });
                }
            }
            t = target;
            grid.push(state);
        }

        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::{IntegrationError, StepControl, Tsit5};
    use crate::params::{baseline, ParamSet};
    use crate::traits::{State, VectorField};

    /// dy/dt = -y on every component; exact solution y0 * e^(-t).
    struct Decay;

    impl VectorField for Decay {
        fn apply(&self, _t: f64, n: &State, _p: &ParamSet, out: &mut State) {
            for i in 0..4 {
                out[i] = -n[i];
            }
        }
    }

    /// dy/dt = y^2; blows up at t = 1/y0.
    struct Quadratic;

    impl VectorField for Quadratic {
        fn apply(&self, _t: f64, n: &State, _p: &ParamSet, out: &mut State) {
            for i in 0..4 {
                out[i] = n[i] * n[i];
            }
        }
    }

    #[test]
    fn decay_matches_the_analytic_solution_on_the_grid() {
        let p = baseline();
        let mut solver = Tsit5::new(StepControl::default());
        let grid = solver
            .solve_grid(&Decay, &p, [1.0, 2.0, 3.0, 4.0], 5.0, 51)
            .expect("integration should succeed");
        assert_eq!(grid.len(), 51);
        for (sample, state) in grid.iter().enumerate() {
            let t = 5.0 * sample as f64 / 50.0;
            for (i, y0) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
                let exact = y0 * (-t).exp();
                // Per-step errors sit near rtol = 1e-8 and accumulate over
                // ~100 steps; the global error lands a little above 1e-6.
                assert!(
                    (state[i] - exact).abs() < 1e-5,
                    "t = {t}, component {i}: {} vs {exact}",
                    state[i]
                );
            }
        }
    }

    #[test]
    fn first_grid_entry_is_the_initial_state() {
        let p = baseline();
        let mut solver = Tsit5::new(StepControl::default());
        let grid = solver
            .solve_grid(&Decay, &p, [1.0, 0.0, 0.0, 0.0], 1.0, 10)
            .expect("integration should succeed");
        assert_eq!(grid[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn finite_time_blow_up_is_reported_as_an_error() {
        let p = baseline();
        let mut solver = Tsit5::new(StepControl::default());
        let result = solver.solve_grid(&Quadratic, &p, [2.0, 0.0, 0.0, 0.0], 1.0, 11);
        match result {
            Err(IntegrationError::StepSizeUnderflow { t, .. })
            | Err(IntegrationError::NonFinite { t }) => {
                // Singularity sits at t = 0.5.
                assert!(t <= 0.6, "failure reported too late, t = {t}");
            }
            Err(other) => panic!("unexpected error kind: {other}"),
            Ok(_) => panic!("expected integration failure"),
        }
    }

    #[test]
    fn tighter_tolerances_do_not_hurt_accuracy() {
        let p = baseline();
        let loose = StepControl {
            rtol: 1e-4,
            atol: 1e-4,
            ..StepControl::default()
        };
        let mut coarse = Tsit5::new(loose);
        let mut fine = Tsit5::new(StepControl::default());
        let y0 = [10.0, 1.0, 0.1, 0.0];
        let end_coarse = coarse.solve_grid(&Decay, &p, y0, 3.0, 31).unwrap()[30];
        let end_fine = fine.solve_grid(&Decay, &p, y0, 3.0, 31).unwrap()[30];
        let exact = 10.0 * (-3.0f64).exp();
        assert!((end_fine[0] - exact).abs() <= (end_coarse[0] - exact).abs() + 1e-12);
    }
}
