//! Randomly generated example inputs, shaped like a real simulation snapshot.

use rand::Rng;

use crate::column::Column;
use crate::particles::ParticleSet;
use crate::property::{
    AGE, ALPHA, ELEMENTS, FORMATION_DISTANCE, MASS, METALLICITY, PARENT_ID, POPULATION_ID,
    POSITION, VELOCITY,
};

/// Standard normal deviate (Box-Muller).
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn normal(rng: &mut impl Rng, n: usize, mean: f64, sigma: f64) -> Vec<f64> {
    (0..n).map(|_| mean + sigma * standard_normal(rng)).collect()
}

fn normal3(rng: &mut impl Rng, n: usize, sigma: f64) -> Vec<[f64; 3]> {
    (0..n)
        .map(|_| {
            [
                sigma * standard_normal(rng),
                sigma * standard_normal(rng),
                sigma * standard_normal(rng),
            ]
        })
        .collect()
}

/// Every property filled: positions, velocities, masses, ages, metallicities,
/// element abundances, alpha = [Mg/H] - [Fe/H], and index columns.
pub fn dummy_particles(n: usize, rng: &mut impl Rng) -> ParticleSet {
    let mut p = ParticleSet::new();
    p.insert(POSITION.to_string(), Column::from_rows(normal3(rng, n, 30.0)));
    p.insert(VELOCITY.to_string(), Column::from_rows(normal3(rng, n, 50.0)));
    p.insert(MASS.to_string(), Column::f64(normal(rng, n, 5500.0, 700.0)));
    p.insert(AGE.to_string(), Column::f64(normal(rng, n, 9.7, 0.4)));

    let feh = normal(rng, n, -0.7, 0.4);
    let mut magnesium = Vec::new();
    for el in ELEMENTS {
        let values = normal(rng, n, -0.6, 0.4);
        if el == "magnesium" {
            magnesium = values.clone();
        }
        p.insert(el.to_string(), Column::f64(values));
    }
    let alpha = magnesium.iter().zip(&feh).map(|(mg, fe)| mg - fe).collect();
    p.insert(ALPHA.to_string(), Column::f64(alpha));
    p.insert(METALLICITY.to_string(), Column::f64(feh));

    p.insert(PARENT_ID.to_string(), Column::arange(n));
    p.insert(FORMATION_DISTANCE.to_string(), Column::f32(vec![0.0; n]));
    p.insert(POPULATION_ID.to_string(), Column::i64(vec![0; n]));
    p
}

/// Log-normal position and velocity densities.
pub fn dummy_densities(n: usize, rng: &mut impl Rng) -> (Vec<f64>, Vec<f64>) {
    let rho_pos = normal(rng, n, -2.9, 1.1).into_iter().map(f64::exp).collect();
    let rho_vel = normal(rng, n, -4.4, 1.1).into_iter().map(f64::exp).collect();
    (rho_pos, rho_vel)
}
