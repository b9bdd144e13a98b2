//! Infection matrix normalisation and shielding
//!
//! The next-generation matrix is `diag(p) * M` for population structure `p`
//! and contact matrix `M`. Its dominant eigenvalue scales the transmissibility
//! range so that a draw's basic reproduction number equals its R0 sample.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::contact::ContactMatrix;
use crate::error::{InputValidationError, Result};

/// Number of points in the normalised transmissibility vector
pub const BETA_POINTS: usize = 20;

/// Relative size of imaginary part tolerated on the dominant eigenvalue
pub const IMAGINARY_TOLERANCE: f64 = 1e-8;

/// The contact structure as the integrator sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionMatrices {
    /// Unshielded matrix
    pub base: ContactMatrix,
    /// Shielded variant, present only when shielding is used
    pub shielded: Option<ContactMatrix>,
    /// Transmissibility range divided by the dominant eigenvalue
    pub beta_list: Vec<f64>,
    pub largest_eigenvalue: f64,
}

impl InfectionMatrices {
    /// Matrix to use at a time when shielding is (or is not) active
    #[inline]
    pub fn active(&self, shielding_active: bool) -> &ContactMatrix {
        match (&self.shielded, shielding_active) {
            (Some(shielded), true) => shielded,
            _ => &self.base,
        }
    }
}

pub fn next_generation_matrix(contact: &ContactMatrix, structure: &[f64]) -> Result<DMatrix<f64>> {
    let n = contact.size();
    if structure.len() != n {
        return Err(InputValidationError::ShapeMismatch {
            what: "population structure",
            expected: n,
            found: structure.len(),
        });
    }
    Ok(DMatrix::from_fn(n, n, |i, j| structure[i] * contact.get(i, j)))
}

/// Dominant (largest real part) eigenvalue, rejected if it is not real.
pub fn dominant_eigenvalue(matrix: &DMatrix<f64>) -> Result<f64> {
    let eigenvalues = matrix.clone().complex_eigenvalues();
    let dominant = eigenvalues
        .iter()
        .copied()
        .max_by(|a, b| a.re.total_cmp(&b.re))
        .ok_or(InputValidationError::ShapeMismatch {
            what: "next-generation matrix",
            expected: 1,
            found: 0,
        })?;

    if dominant.im.abs() > IMAGINARY_TOLERANCE * dominant.re.abs().max(1.0) {
        return Err(InputValidationError::ComplexDominantEigenvalue {
            re: dominant.re,
            im: dominant.im,
        });
    }
    if !(dominant.re > 0.0) {
        return Err(InputValidationError::DegenerateContactMatrix {
            eigenvalue: dominant.re,
        });
    }
    Ok(dominant.re)
}

/// `n` evenly spaced points over `[lo, hi]`
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|k| lo + step * k as f64).collect()
        }
    }
}

/// Scale within-group blocks by `increase` and between-group blocks by
/// `decrease`. The last band is the shielded group.
pub fn shield(matrix: &ContactMatrix, increase: f64, decrease: f64) -> ContactMatrix {
    let mut shielded = matrix.clone();
    let k = matrix.size().saturating_sub(1);
    for (i, row) in shielded.rows_mut().iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            let same_group = (i < k) == (j < k);
            *value *= if same_group { increase } else { decrease };
        }
    }
    shielded
}

/// Build the infection matrices for a contact matrix.
///
/// `beta_range` holds the unnormalised transmissibility for the lowest and
/// highest R0 sample.
pub fn normalise(
    contact: ContactMatrix,
    structure: &[f64],
    beta_range: (f64, f64),
    shielding: Option<(f64, f64)>,
) -> Result<InfectionMatrices> {
    let ngm = next_generation_matrix(&contact, structure)?;
    let largest_eigenvalue = dominant_eigenvalue(&ngm)?;

    let beta_list = linspace(beta_range.0, beta_range.1, BETA_POINTS)
        .into_iter()
        .map(|b| b / largest_eigenvalue)
        .collect();

    let shielded = shielding.map(|(increase, decrease)| shield(&contact, increase, decrease));

    Ok(InfectionMatrices {
        base: contact,
        shielded,
        beta_list,
        largest_eigenvalue,
    })
}
