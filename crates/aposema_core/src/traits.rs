use crate::params::ParamSet;

/// Population state: `[F1, M1, F2, M2]` (female and male counts per species).
pub type State = [f64; 4];

/// A vector field over the four-component population state.
///
/// Implementors compute the instantaneous derivative of each state component.
/// The systems studied here are autonomous; `t` is carried for integrator
/// compatibility only.
pub trait VectorField: Sync {
    /// Evaluates the vector field.
    /// n: current state
    /// t: current time
    /// out: buffer to write dn/dt into
    fn apply(&self, t: f64, n: &State, p: &ParamSet, out: &mut State);
}
