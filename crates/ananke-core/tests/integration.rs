//! Integration tests across the pure pipeline:
//! particles → schema → kernels → reconstruction → parameter text.

use ananke_core::parameters::{default_parameters, mandatory_parameters, resolve_parameters};
use ananke_core::{
    DensityEstimate, InputError, KernelConvention, KernelFileName, KernelNormalization, KernelSet,
    MagColorSelection, Parameters, ParticleStore, Template, all_possible_keys, dummy_densities,
    dummy_particles, reconstruct,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

/// Test 1: derived kernels survive a reconstruction through their archive form.
#[test]
fn derive_then_reconstruct() {
    let mut rng = rng();
    let store = ParticleStore::new(dummy_particles(1_000, &mut rng)).unwrap();
    let (pos, vel) = dummy_densities(store.len(), &mut rng);
    let density = DensityEstimate::new(pos, Some(vel)).unwrap();
    let kernels = KernelSet::derive(&density, &KernelNormalization::default().k_factor(64)).unwrap();

    let name = KernelFileName::new("sim", density.hdim(), 64, "arr");
    let parsed = KernelFileName::parse(&name.to_string()).unwrap();
    let rec = reconstruct(density.rho_pos(), &kernels.to_column(), parsed.ngb, KernelConvention::Current)
        .unwrap();

    assert_eq!(rec.density.hdim(), parsed.hdim);
    for (a, b) in rec.density.rho_vel().unwrap().iter().zip(density.rho_vel().unwrap()) {
        assert!((a - b).abs() <= 1e-9 * b);
    }
}

/// Test 2: an unknown key and a missing key are both reported at once.
#[test]
fn schema_reports_missing_and_extra() {
    let mut particles = dummy_particles(10, &mut rng());
    particles.remove("age");
    let mass = particles["mass"].clone();
    particles.insert("velocity".to_string(), mass);

    match ParticleStore::new(particles).unwrap_err() {
        InputError::Schema { missing, extra } => {
            assert_eq!(missing, vec!["age".to_string()]);
            assert_eq!(extra, vec!["velocity".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(all_possible_keys().len(), 18);
}

/// Test 3: the full parameter file renders for a run.
#[test]
fn parameter_text_for_run() {
    let selection: MagColorSelection = "V,B-V".parse().unwrap();
    let mandatory = mandatory_parameters("padova", "UBV", &selection, 32);
    let mut overrides = Parameters::new();
    overrides.insert("seed".to_string(), 99i64.into());

    let resolved = resolve_parameters(&default_parameters(), &overrides, &mandatory).unwrap();
    let text = Template::parfile().substitute(&resolved).unwrap();
    assert_eq!(text.lines().count(), 31);
    assert!(text.contains("seed\t\t99\n"));
    assert!(text.contains("nres\t\t32\n"));
}
