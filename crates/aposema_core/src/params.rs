use crate::traits::State;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Full parameter record for one equilibrium computation.
///
/// Constructed once per sweep tuple and never mutated afterwards. The CSV
/// column names (`AB, SR, ab, sr, ..., K, a, B`) map onto these fields in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    /// Initial total abundance of species 1 (F1 + M1).
    pub ab1: f64,
    /// Initial male proportion for species 1.
    pub sr1: f64,
    /// Initial total abundance of species 2 (F2 + M2).
    pub ab2: f64,
    /// Initial male proportion for species 2.
    pub sr2: f64,
    /// Birth rate.
    pub b: f64,
    /// Natural death rate (excluding predation).
    pub d: f64,
    /// Predation death rate.
    pub p: f64,
    /// Defence level of species-1 females.
    pub l1: f64,
    /// Relative investment of species 1 in producing sons.
    pub k1: f64,
    /// Defence level of species-2 females.
    pub l2: f64,
    /// Relative investment of species 2 in producing sons.
    pub k2: f64,
    /// Intraspecific competition coefficient.
    pub cw: f64,
    /// Interspecific competition coefficient.
    pub cb: f64,
    /// Carrying capacity.
    pub k_cap: f64,
    /// Survival advantage females draw from their defence (sting).
    pub a: f64,
    /// Cost of males on the protection brought by mimicry.
    pub b_mim: f64,
}

impl ParamSet {
    /// Checks every field against its admissible range. Rejects rather than
    /// clamps: a parameter set that fails here never reaches the solver.
    pub fn validated(self) -> Result<Self> {
        fn finite(name: &str, value: f64) -> Result<()> {
            if !value.is_finite() {
                bail!("parameter {} must be finite, got {}", name, value);
            }
            Ok(())
        }

        for (name, value) in [
            ("AB", self.ab1),
            ("SR", self.sr1),
            ("ab", self.ab2),
            ("sr", self.sr2),
            ("b", self.b),
            ("d", self.d),
            ("p", self.p),
            ("l1", self.l1),
            ("k1", self.k1),
            ("l2", self.l2),
            ("k2", self.k2),
            ("cw", self.cw),
            ("cb", self.cb),
            ("K", self.k_cap),
            ("a", self.a),
            ("B", self.b_mim),
        ] {
            finite(name, value)?;
        }

        if self.ab1 < 0.0 || self.ab2 < 0.0 {
            bail!(
                "initial abundances must be non-negative (AB = {}, ab = {})",
                self.ab1,
                self.ab2
            );
        }
        if !(0.0..=1.0).contains(&self.sr1) || !(0.0..=1.0).contains(&self.sr2) {
            bail!(
                "initial male proportions must lie in [0, 1] (SR = {}, sr = {})",
                self.sr1,
                self.sr2
            );
        }
        for (name, value) in [
            ("b", self.b),
            ("d", self.d),
            ("p", self.p),
            ("l1", self.l1),
            ("k1", self.k1),
            ("l2", self.l2),
            ("k2", self.k2),
            ("cw", self.cw),
            ("cb", self.cb),
            ("a", self.a),
        ] {
            if value < 0.0 {
                bail!("parameter {} must be non-negative, got {}", name, value);
            }
        }
        if self.k_cap <= 0.0 {
            bail!("carrying capacity K must be positive, got {}", self.k_cap);
        }
        if !(0.0..=1.0).contains(&self.b_mim) {
            bail!("mimicry cost B must lie in [0, 1], got {}", self.b_mim);
        }

        Ok(self)
    }

    /// Splits the initial abundances into sexed counts:
    /// `[AB(1-SR), AB*SR, ab(1-sr), ab*sr]`.
    pub fn initial_state(&self) -> State {
        [
            self.ab1 * (1.0 - self.sr1),
            self.ab1 * self.sr1,
            self.ab2 * (1.0 - self.sr2),
            self.ab2 * self.sr2,
        ]
    }
}

/// Reference parameter set shared by the unit tests (the single-species
/// boundary scenario).
#[cfg(test)]
pub(crate) fn baseline() -> ParamSet {
    ParamSet {
        ab1: 1000.0,
        sr1: 0.5,
        ab2: 0.0,
        sr2: 0.5,
        b: 1.0,
        d: 0.2,
        p: 0.3,
        l1: 0.05,
        k1: 3.0,
        l2: 0.0,
        k2: 3.0,
        cw: 1.0,
        cb: 0.3,
        k_cap: 1000.0,
        a: 5.0,
        b_mim: 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::{baseline, ParamSet};

    #[test]
    fn baseline_set_passes_validation() {
        assert!(baseline().validated().is_ok());
    }

    #[test]
    fn negative_abundance_is_rejected() {
        let set = ParamSet {
            ab1: -1.0,
            ..baseline()
        };
        let err = set.validated().expect_err("expected rejection");
        assert!(format!("{err}").contains("non-negative"));
    }

    #[test]
    fn out_of_range_sex_ratio_is_rejected() {
        let set = ParamSet {
            sr1: 1.2,
            ..baseline()
        };
        assert!(set.validated().is_err());
    }

    #[test]
    fn non_finite_parameter_is_rejected() {
        let set = ParamSet {
            b: f64::NAN,
            ..baseline()
        };
        let err = set.validated().expect_err("expected rejection");
        assert!(format!("{err}").contains("finite"));
    }

    #[test]
    fn initial_state_splits_abundance_by_sex_ratio() {
        let set = ParamSet {
            ab2: 100.0,
            sr2: 0.25,
            ..baseline()
        };
        let n0 = set.initial_state();
        assert_eq!(n0, [500.0, 500.0, 75.0, 25.0]);
    }
}
