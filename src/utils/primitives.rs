//! Default implementations of the toolkit's vector capabilities.
//!
//! These operate on one contact's reaction (length `DIM`) and are what
//! [`LocalSolverToolkit::with_default_primitives`](crate::toolkit::LocalSolverToolkit::with_default_primitives)
//! binds.

/// dst ← src.
pub fn copy_local_reaction(src: &[f64], dst: &mut [f64]) {
    dst.copy_from_slice(src);
}

/// reaction ← ω · reaction + (1 − ω) · previous.
///
/// `reaction` holds the freshly solved estimate on entry. ω = 1 keeps it
/// unchanged and ω = 0 restores `previous`, both exactly.
pub fn perform_relaxation(reaction: &mut [f64], previous: &[f64], omega: f64) {
    assert_eq!(reaction.len(), previous.len(), "Vectors must have the same length");
    if omega == 1.0 {
        return;
    }
    if omega == 0.0 {
        reaction.copy_from_slice(previous);
        return;
    }
    for (r, p) in reaction.iter_mut().zip(previous) {
        *r = omega * *r + (1.0 - omega) * p;
    }
}

/// ‖candidate − reference‖².
pub fn light_error_squared(candidate: &[f64], reference: &[f64]) -> f64 {
    assert_eq!(candidate.len(), reference.len(), "Vectors must have the same length");
    candidate
        .iter()
        .zip(reference)
        .map(|(c, r)| (c - r) * (c - r))
        .sum()
}

/// ‖v‖².
pub fn squared_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}
