//! Smoothing-kernel lengths from density estimates, and their inverse.
//!
//! Fresh mode turns densities into lengths: `h = k_factor / cbrt(4π/3 · ρ)`.
//! Reconstruction mode recovers densities and the normalization from a
//! stored kernel archive, under either of the two historical conventions.

use crate::column::{Column, ColumnData};
use crate::constants::{DEFAULT_K_FACTOR, DEFAULT_KNORM, DENSITY_KEY, FOUR_THIRDS_PI, KERNELS_KEY};
use crate::error::{InputError, Result};

/// A factor that is either shared by every particle or given per particle.
#[derive(Clone, Debug, PartialEq)]
pub enum Scale {
    Uniform(f64),
    PerParticle(Vec<f64>),
}

impl Scale {
    pub fn at(&self, i: usize) -> f64 {
        match self {
            Scale::Uniform(v) => *v,
            Scale::PerParticle(values) => values[i],
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Scale::Uniform(_))
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Scale {
        match self {
            Scale::Uniform(v) => Scale::Uniform(f(*v)),
            Scale::PerParticle(values) => Scale::PerParticle(values.iter().map(|v| f(*v)).collect()),
        }
    }

    fn check(&self, what: &str, n: usize) -> Result<()> {
        let bad = |v: f64| !(v.is_finite() && v > 0.0);
        match self {
            Scale::Uniform(v) if bad(*v) => Err(InputError::Configuration(format!(
                "{what} must be positive and finite, got {v}"
            ))),
            Scale::PerParticle(values) if values.len() != n => {
                Err(InputError::Configuration(format!(
                    "{what} has {} entries for {n} particles",
                    values.len()
                )))
            }
            Scale::PerParticle(values) => match values.iter().position(|v| bad(*v)) {
                Some(i) => Err(InputError::Configuration(format!(
                    "{what} must be positive and finite, got {} at index {i}",
                    values[i]
                ))),
                None => Ok(()),
            },
            Scale::Uniform(_) => Ok(()),
        }
    }
}

/// How kernel lengths are scaled relative to `cbrt(4π/3 · ρ)`.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelNormalization {
    /// Scale lengths by `k_factor` directly.
    Factor(Scale),
    /// Former engine convention: `k_factor = sqrt(ngb) · knorm · cbrt(4π/3)`.
    Former(Scale),
}

impl Default for KernelNormalization {
    fn default() -> Self {
        KernelNormalization::Factor(Scale::Uniform(DEFAULT_K_FACTOR))
    }
}

impl KernelNormalization {
    /// Former convention with the engine's historical `knorm`.
    pub fn former() -> Self {
        KernelNormalization::Former(Scale::Uniform(DEFAULT_KNORM))
    }

    pub fn k_factor(&self, ngb: u32) -> Scale {
        match self {
            KernelNormalization::Factor(k) => k.clone(),
            KernelNormalization::Former(knorm) => {
                let scale = (ngb as f64).sqrt() * FOUR_THIRDS_PI.cbrt();
                knorm.map(|v| v * scale)
            }
        }
    }
}

/// Which historical scheme produced a stored kernel archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KernelConvention {
    #[default]
    Current,
    Former,
}

/// Position-space density and optional velocity-space density per particle.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityEstimate {
    rho_pos: Vec<f64>,
    rho_vel: Option<Vec<f64>>,
}

impl DensityEstimate {
    pub fn new(rho_pos: Vec<f64>, rho_vel: Option<Vec<f64>>) -> Result<Self> {
        if let Some(vel) = &rho_vel
            && vel.len() != rho_pos.len()
        {
            return Err(InputError::LengthMismatch {
                reference: "rho_pos".to_string(),
                expected: rho_pos.len(),
                mismatched: vec![("rho_vel".to_string(), vel.len())],
            });
        }
        check_positive("rho_pos", &rho_pos)?;
        if let Some(vel) = &rho_vel {
            check_positive("rho_vel", vel)?;
        }
        Ok(Self { rho_pos, rho_vel })
    }

    pub fn len(&self) -> usize {
        self.rho_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rho_pos.is_empty()
    }

    pub fn rho_pos(&self) -> &[f64] {
        &self.rho_pos
    }

    pub fn rho_vel(&self) -> Option<&[f64]> {
        self.rho_vel.as_deref()
    }

    /// Phase-space dimension: 6 with velocity densities, 3 without.
    pub fn hdim(&self) -> u32 {
        if self.rho_vel.is_some() { 6 } else { 3 }
    }
}

fn check_positive(key: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
        Some(index) => Err(InputError::InvalidValue {
            key: key.to_string(),
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// `k / cbrt(4π/3 · ρ)`
pub fn kernel_length(k_factor: f64, rho: f64) -> f64 {
    k_factor / (FOUR_THIRDS_PI * rho).cbrt()
}

/// Smoothing lengths, one row per particle, one column per dimension group.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelSet {
    groups: usize,
    lengths: Vec<f64>,
}

impl KernelSet {
    pub fn derive(density: &DensityEstimate, k_factor: &Scale) -> Result<Self> {
        let n = density.len();
        k_factor.check("k_factor", n)?;

        let groups = if density.rho_vel.is_some() { 2 } else { 1 };
        let mut lengths = Vec::with_capacity(n * groups);
        for i in 0..n {
            let k = k_factor.at(i);
            lengths.push(kernel_length(k, density.rho_pos[i]));
            if let Some(vel) = &density.rho_vel {
                lengths.push(kernel_length(k, vel[i]));
            }
        }
        Ok(Self { groups, lengths })
    }

    pub fn len(&self) -> usize {
        self.lengths.len() / self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn position(&self) -> Vec<f64> {
        self.lengths.iter().step_by(self.groups).copied().collect()
    }

    pub fn velocity(&self) -> Option<Vec<f64>> {
        (self.groups == 2).then(|| self.lengths.iter().skip(1).step_by(2).copied().collect())
    }

    /// The `h_cubic` archive column (N×2, or N×1 in position-only mode).
    pub fn to_column(&self) -> Column {
        Column::from_flat(ColumnData::F64(self.lengths.clone()), self.groups)
            .unwrap_or_else(|| Column::f64(Vec::new()))
    }
}

/// Densities and normalization recovered from a stored kernel archive.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconstruction {
    pub density: DensityEstimate,
    pub normalization: KernelNormalization,
}

/// Recover densities and normalization from stored `density` and `h_cubic`.
pub fn reconstruct(
    rho_pos: &[f64],
    h_cubic: &Column,
    ngb: u32,
    convention: KernelConvention,
) -> Result<Reconstruction> {
    if h_cubic.rows() != rho_pos.len() {
        return Err(InputError::LengthMismatch {
            reference: DENSITY_KEY.to_string(),
            expected: rho_pos.len(),
            mismatched: vec![(KERNELS_KEY.to_string(), h_cubic.rows())],
        });
    }
    if !(1..=2).contains(&h_cubic.width()) {
        return Err(InputError::Shape {
            key: KERNELS_KEY.to_string(),
            expected: 2,
            found: h_cubic.width(),
        });
    }
    if ngb == 0 {
        return Err(InputError::Configuration("ngb must be positive".to_string()));
    }
    check_positive(DENSITY_KEY, rho_pos)?;
    let h_pos = h_cubic.component(0).unwrap_or_default();
    check_positive(KERNELS_KEY, &h_pos)?;
    let h_vel = h_cubic.component(1);
    if let Some(h_vel) = &h_vel {
        check_positive(KERNELS_KEY, h_vel)?;
    }

    let k_factor: Vec<f64> = h_pos
        .iter()
        .zip(rho_pos)
        .map(|(h, rho)| h * (FOUR_THIRDS_PI * rho).cbrt())
        .collect();

    let (rho_vel, normalization) = match convention {
        KernelConvention::Current => {
            let rho_vel = h_vel.map(|h_vel| {
                k_factor
                    .iter()
                    .zip(&h_vel)
                    .map(|(k, h)| (k / h).powi(3) / FOUR_THIRDS_PI)
                    .collect()
            });
            (rho_vel, KernelNormalization::Factor(Scale::PerParticle(k_factor)))
        }
        KernelConvention::Former => {
            let sqrt_ngb = (ngb as f64).sqrt();
            let divisor = sqrt_ngb * FOUR_THIRDS_PI.cbrt();
            let knorm = collapse_if_uniform(k_factor.iter().map(|k| k / divisor).collect());
            let rho_vel = h_vel.map(|h_vel| {
                h_vel
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (sqrt_ngb * knorm.at(i) / h).powi(3))
                    .collect()
            });
            (rho_vel, KernelNormalization::Former(knorm))
        }
    };

    Ok(Reconstruction {
        density: DensityEstimate::new(rho_pos.to_vec(), rho_vel)?,
        normalization,
    })
}

/// Collapse to the median when every value rounds to the same multiple of 2ε.
pub fn collapse_if_uniform(values: Vec<f64>) -> Scale {
    let step = 2.0 * f64::EPSILON;
    let mut bins = values.iter().map(|v| (v / step).round() as i64);
    let uniform = match bins.next() {
        Some(first) => bins.all(|b| b == first),
        None => false,
    };
    if uniform {
        Scale::Uniform(median(&values))
    } else {
        Scale::PerParticle(values)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
