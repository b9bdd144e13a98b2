//! Contact matrices and their aggregation into model age bands
//!
//! Survey contact matrices come in fine, fixed-width age bands (5 years).
//! The model runs on coarser bands given by a list of age limits; each
//! coarse entry is the population-weighted average over the fine entries it
//! covers:
//!
//! ```text
//! agg[i][j] = sum_{i' in band(i), j' in band(j)} fine[i'][j'] * pop[i'] / sum_{i' in band(i)} pop[i']
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{InputValidationError, Result};

/// Width in years of the bands of survey contact matrices
pub const FINE_BAND_WIDTH: u32 = 5;

/// Square matrix indexed by age band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMatrix {
    rows: Vec<Vec<f64>>,
}

impl ContactMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(InputValidationError::ShapeMismatch {
                what: "contact matrix rows",
                expected: 1,
                found: 0,
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(InputValidationError::ShapeMismatch {
                what: "contact matrix columns",
                expected: n,
                found: bad.len(),
            });
        }
        if let Some(v) = rows.iter().flatten().find(|v| !(**v >= 0.0) || !v.is_finite()) {
            return Err(InputValidationError::InvalidValue {
                field: "contact matrix".to_string(),
                value: *v,
                reason: "entries must be finite and non-negative",
            });
        }
        Ok(Self { rows })
    }

    pub fn identity(n: usize) -> Self {
        let rows = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self { rows }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.rows
    }

    /// Entry-wise closeness check
    pub fn approx_eq(&self, other: &ContactMatrix, tol: f64) -> bool {
        self.size() == other.size()
            && self
                .rows
                .iter()
                .flatten()
                .zip(other.rows.iter().flatten())
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// Fine-band index ranges covered by each coarse band
fn band_ranges(
    age_limits: &[u32],
    band_width: u32,
    fine_len: usize,
) -> Result<Vec<(usize, usize)>> {
    let invalid = |reason| InputValidationError::InvalidAgeLimits {
        limits: age_limits.to_vec(),
        reason,
    };
    if age_limits.len() < 2 {
        return Err(invalid("need at least two limits"));
    }
    if age_limits.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid("limits must be strictly increasing"));
    }
    if age_limits.iter().any(|l| l % band_width != 0) {
        return Err(invalid("limits must be multiples of the fine band width"));
    }
    let idx: Vec<usize> = age_limits.iter().map(|l| (l / band_width) as usize).collect();
    if idx[idx.len() - 1] > fine_len {
        return Err(invalid("limits extend past the fine contact matrix"));
    }
    Ok(idx.windows(2).map(|w| (w[0], w[1])).collect())
}

/// Spread coarse population fractions uniformly over the fine bands they cover
pub fn split_population(
    age_limits: &[u32],
    structure: &[f64],
    band_width: u32,
    fine_len: usize,
) -> Result<Vec<f64>> {
    let ranges = band_ranges(age_limits, band_width, fine_len)?;
    if structure.len() != ranges.len() {
        return Err(InputValidationError::ShapeMismatch {
            what: "population structure",
            expected: ranges.len(),
            found: structure.len(),
        });
    }
    let mut fine = vec![0.0; fine_len];
    for (&(lo, hi), &share) in ranges.iter().zip(structure) {
        let width = (hi - lo) as f64;
        for p in &mut fine[lo..hi] {
            *p = share / width;
        }
    }
    Ok(fine)
}

/// Aggregate a fine contact matrix into the bands given by `age_limits`.
///
/// The result has `age_limits.len() - 1` rows and columns.
pub fn aggregate(
    fine: &ContactMatrix,
    band_width: u32,
    age_limits: &[u32],
    fine_population: &[f64],
) -> Result<ContactMatrix> {
    if fine_population.len() != fine.size() {
        return Err(InputValidationError::ShapeMismatch {
            what: "fine population",
            expected: fine.size(),
            found: fine_population.len(),
        });
    }
    let ranges = band_ranges(age_limits, band_width, fine.size())?;

    let mut rows = vec![vec![0.0; ranges.len()]; ranges.len()];
    for (i, &(ilo, ihi)) in ranges.iter().enumerate() {
        let weight: f64 = fine_population[ilo..ihi].iter().sum();
        for (j, &(jlo, jhi)) in ranges.iter().enumerate() {
            let mut total = 0.0;
            for fi in ilo..ihi {
                for fj in jlo..jhi {
                    total += fine.get(fi, fj) * fine_population[fi];
                }
            }
            rows[i][j] = if weight > 0.0 { total / weight } else { 0.0 };
        }
    }
    ContactMatrix::new(rows)
}

/// Where the contact structure of a run comes from
#[derive(Debug, Clone, Default)]
pub struct ContactLibrary {
    /// Fine (5-year band) matrices keyed by country
    pub fine_matrices: FxHashMap<String, ContactMatrix>,
    /// Already coarse-grained matrix for locations outside the library
    pub fallback: Option<ContactMatrix>,
}

impl ContactLibrary {
    pub fn with_country(mut self, country: &str, matrix: ContactMatrix) -> Self {
        self.fine_matrices.insert(country.to_string(), matrix);
        self
    }

    pub fn with_fallback(mut self, matrix: ContactMatrix) -> Self {
        self.fallback = Some(matrix);
        self
    }

    pub fn is_supported(&self, country: &str) -> bool {
        self.fine_matrices.contains_key(country)
    }

    /// Contact matrix in model bands for `country`.
    ///
    /// Supported countries are aggregated from their fine matrix; any other
    /// location uses the fallback verbatim.
    pub fn build(
        &self,
        country: &str,
        age_limits: &[u32],
        structure: &[f64],
    ) -> Result<ContactMatrix> {
        let bands = age_limits.len().saturating_sub(1);
        let matrix = match self.fine_matrices.get(country) {
            Some(fine) => {
                let fine_population =
                    split_population(age_limits, structure, FINE_BAND_WIDTH, fine.size())?;
                aggregate(fine, FINE_BAND_WIDTH, age_limits, &fine_population)?
            }
            None => {
                tracing::debug!(country, "location not in contact library, using fallback matrix");
                self.fallback
                    .clone()
                    .ok_or_else(|| InputValidationError::MissingContactMatrix {
                        location: country.to_string(),
                    })?
            }
        };
        if matrix.size() != bands {
            return Err(InputValidationError::ShapeMismatch {
                what: "contact matrix",
                expected: bands,
                found: matrix.size(),
            });
        }
        Ok(matrix)
    }
}
