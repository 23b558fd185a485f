use crate::params::ParamSet;
use crate::traits::{State, VectorField};
use serde::{Deserialize, Serialize};

/// Proportion of female progeny as a function of the investment skew `k`
/// and the current male proportion `rho`:
///
/// `g(k, rho) = (1 - e^(-k rho)) / (1 + e^(-k rho))`
///
/// Maps into [0, 1) for k, rho >= 0, with `g(k, 0) = 0`.
pub fn g(k: f64, rho: f64) -> f64 {
    let e = (-k * rho).exp();
    (1.0 - e) / (1.0 + e)
}

/// Male proportion `m / (f + m)`, defined as exactly 0 when the population
/// is empty so the field functions never divide by zero.
pub fn male_proportion(f: f64, m: f64) -> f64 {
    let total = f + m;
    if total > 0.0 {
        m / total
    } else {
        0.0
    }
}

/// Each species' predation term depends only on its own defended females.
///
/// Covers one species alone (`ab = 0`, `cb = 0`), two allopatric species
/// (`cb = 0`) and two sympatric species without a shared mimicry ring.
pub struct NoMimicry;

/// Both species pool their warning signal: predation for either species is
/// relaxed by the community-wide defended density `l1 F1 + l2 F2`, discounted
/// by the community-wide male proportion.
pub struct Mimicry;

/// Dimorphic sex-limited mimicry. Species 1 is monomorphic; species 2 is
/// dimorphic, with only its males joining species 1's mimicry ring.
pub struct Dslm;

impl VectorField for NoMimicry {
    fn apply(&self, _t: f64, n: &State, p: &ParamSet, out: &mut State) {
        let [f1, m1, f2, m2] = *n;
        let rho1 = male_proportion(f1, m1);
        let rho2 = male_proportion(f2, m2);

        let den1 = 1.0 + p.l1 * f1 * (1.0 - p.b_mim * rho1);
        let den2 = 1.0 + p.l2 * f2 * (1.0 - p.b_mim * rho2);

        out[0] = f1 * p.b * g(p.k1, rho1)
            - p.d * f1
            - f1 * p.p * (1.0 - p.a * p.l1) / den1
            - (p.cw * f1 + p.cb * f2) * f1 / p.k_cap;
        out[1] = f1 * p.b * (1.0 - g(p.k1, rho1)) - p.d * m1 - m1 * p.p / den1;
        out[2] = f2 * p.b * g(p.k2, rho2)
            - p.d * f2
            - f2 * p.p * (1.0 - p.a * p.l2) / den2
            - (p.cw * f2 + p.cb * f1) * f2 / p.k_cap;
        out[3] = f2 * p.b * (1.0 - g(p.k2, rho2)) - p.d * m2 - m2 * p.p / den2;
    }
}

impl VectorField for Mimicry {
    fn apply(&self, _t: f64, n: &State, p: &ParamSet, out: &mut State) {
        let [f1, m1, f2, m2] = *n;
        let rho1 = male_proportion(f1, m1);
        let rho2 = male_proportion(f2, m2);
        // Male proportion across the whole mimetic community.
        let rho3 = male_proportion(f1 + f2, m1 + m2);

        let den = 1.0 + (p.l1 * f1 + p.l2 * f2) * (1.0 - p.b_mim * rho3);

        out[0] = f1 * p.b * g(p.k1, rho1)
            - p.d * f1
            - f1 * p.p * (1.0 - p.a * p.l1) / den
            - (p.cw * f1 + p.cb * f2) * f1 / p.k_cap;
        out[1] = f1 * p.b * (1.0 - g(p.k1, rho1)) - p.d * m1 - m1 * p.p / den;
        out[2] = f2 * p.b * g(p.k2, rho2)
            - p.d * f2
            - f2 * p.p * (1.0 - p.a * p.l2) / den
            - (p.cw * f2 + p.cb * f1) * f2 / p.k_cap;
        out[3] = f2 * p.b * (1.0 - g(p.k2, rho2)) - p.d * m2 - m2 * p.p / den;
    }
}

impl VectorField for Dslm {
    fn apply(&self, _t: f64, n: &State, p: &ParamSet, out: &mut State) {
        let [f1, m1, f2, m2] = *n;
        let rho1 = male_proportion(f1, m1);
        let rho2 = male_proportion(f2, m2);
        // Male proportion of the mimetic community: species 1 plus the
        // mimetic males of species 2. F2 carries a different signal and is
        // not part of the ring.
        let rho3 = male_proportion(f1, m1 + m2);

        // Species 1 and the species-2 mimetic males share this denominator.
        let den1 = 1.0 + p.l1 * f1 * (1.0 - p.b_mim * rho3);
        // Species-2 females rely on their own signal; no learning cost.
        let den2 = 1.0 + p.l2 * f2;

        out[0] = f1 * p.b * g(p.k1, rho1)
            - p.d * f1
            - f1 * p.p * (1.0 - p.a * p.l1) / den1
            - (p.cw * f1 + p.cb * f2) * f1 / p.k_cap;
        out[1] = f1 * p.b * (1.0 - g(p.k1, rho1)) - p.d * m1 - m1 * p.p / den1;
        out[2] = f2 * p.b * g(p.k2, rho2)
            - p.d * f2
            - f2 * p.p * (1.0 - p.a * p.l2) / den2
            - (p.cw * f2 + p.cb * f1) * f2 / p.k_cap;
        out[3] = f2 * p.b * (1.0 - g(p.k2, rho2)) - p.d * m2 - m2 * p.p / den1;
    }
}

/// Regime selector used by configuration and the sweep generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    NoMimicry,
    Mimicry,
    Dslm,
}

impl VectorField for Regime {
    fn apply(&self, t: f64, n: &State, p: &ParamSet, out: &mut State) {
        match self {
            Regime::NoMimicry => NoMimicry.apply(t, n, p, out),
            Regime::Mimicry => Mimicry.apply(t, n, p, out),
            Regime::Dslm => Dslm.apply(t, n, p, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{g, male_proportion, Mimicry, NoMimicry, Regime};
    use crate::params::{baseline, ParamSet};
    use crate::traits::VectorField;

    #[test]
    fn g_is_zero_at_zero_male_proportion() {
        assert_eq!(g(3.0, 0.0), 0.0);
        assert_eq!(g(0.0, 0.0), 0.0);
    }

    #[test]
    fn g_stays_in_unit_interval_and_is_monotone() {
        for k in [0.3, 1.0, 3.0, 10.0] {
            let mut previous = -1.0;
            for i in 0..=100 {
                let rho = i as f64 / 100.0;
                let value = g(k, rho);
                assert!((0.0..1.0).contains(&value), "g({k}, {rho}) = {value}");
                assert!(value >= previous, "g not monotone at rho = {rho}");
                previous = value;
            }
        }
    }

    #[test]
    fn male_proportion_of_empty_population_is_zero() {
        let rho = male_proportion(0.0, 0.0);
        assert_eq!(rho, 0.0);
        assert!(!rho.is_nan());
    }

    #[test]
    fn male_proportion_of_all_male_population_is_one() {
        assert_eq!(male_proportion(0.0, 10.0), 1.0);
    }

    #[test]
    fn absent_species_has_zero_derivatives() {
        let p = baseline();
        let n = [500.0, 500.0, 0.0, 0.0];
        let mut out = [f64::NAN; 4];
        NoMimicry.apply(0.0, &n, &p, &mut out);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
        assert!(out[0].is_finite() && out[1].is_finite());
    }

    #[test]
    fn symmetric_species_get_symmetric_mimicry_derivatives() {
        let p = ParamSet {
            ab2: 1000.0,
            l2: 0.05,
            ..baseline()
        };
        let n = [400.0, 300.0, 400.0, 300.0];
        let mut out = [0.0; 4];
        Mimicry.apply(0.0, &n, &p, &mut out);
        assert!((out[0] - out[2]).abs() < 1e-12);
        assert!((out[1] - out[3]).abs() < 1e-12);
    }

    #[test]
    fn mimicry_relaxes_predation_on_the_undefended_partner() {
        // Species 2 is undefended (l2 = 0); pooling with species 1's signal
        // must not hurt it compared to standing alone.
        let p = ParamSet {
            ab2: 1000.0,
            b_mim: 0.0,
            ..baseline()
        };
        let n = [400.0, 300.0, 400.0, 300.0];
        let mut alone = [0.0; 4];
        let mut pooled = [0.0; 4];
        NoMimicry.apply(0.0, &n, &p, &mut alone);
        Mimicry.apply(0.0, &n, &p, &mut pooled);
        assert!(pooled[2] > alone[2]);
        assert!(pooled[3] > alone[3]);
    }

    #[test]
    fn regime_selector_matches_the_underlying_field() {
        let p = baseline();
        let n = [500.0, 400.0, 50.0, 40.0];
        let mut direct = [0.0; 4];
        let mut via_regime = [0.0; 4];
        NoMimicry.apply(0.0, &n, &p, &mut direct);
        Regime::NoMimicry.apply(0.0, &n, &p, &mut via_regime);
        assert_eq!(direct, via_regime);
    }
}
