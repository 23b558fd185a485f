//! The `aposema_core` crate numerically studies sex-ratio evolution in a
//! two-species, two-sex population model under predation, Müllerian mimicry
//! and dimorphic sex-limited mimicry.
//!
//! Key components:
//! - **Traits**: `VectorField` (derivative of the four-component state).
//! - **Fields**: the three regime vector fields and the `g` progeny transform.
//! - **Solvers**: adaptive Tsitouras 5(4) integrator with fixed-grid sampling.
//! - **Equilibrium**: the repeated-window convergence loop and persistence
//!   classification.
//! - **Sweep**: seedable random-draw × parameter-of-interest batch generator,
//!   parallelized over tuples.
//! - **Table**: the stable 23-column CSV result table.

pub mod equilibrium;
pub mod fields;
pub mod params;
pub mod solvers;
pub mod sweep;
pub mod table;
pub mod traits;
