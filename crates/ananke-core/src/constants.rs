/// Volume factor of the unit sphere: 4π / 3
pub const FOUR_THIRDS_PI: f64 = 4.0 * std::f64::consts::PI / 3.0;

/// Neighbor count used upstream for density estimates when none is given.
pub const DEFAULT_NGB: u32 = 64;

/// Default k_factor: no uniform rescaling of kernel lengths.
pub const DEFAULT_K_FACTOR: f64 = 1.0;

/// Kernel normalization of the former engine convention.
pub const DEFAULT_KNORM: f64 = 0.596831;

/// Run name used when the caller does not pick one.
pub const DEFAULT_SIMNAME: &str = "sim";

/// Parameter file name, resolved against the input directory.
pub const DEFAULT_PARFILE: &str = "survey_params";

/// Extension of the binary array archives (particles and kernels).
pub const DEFAULT_EXTENSION: &str = "arr";

/// Array names inside the kernel archive.
pub const DENSITY_KEY: &str = "density";
pub const KERNELS_KEY: &str = "h_cubic";
pub const MASS_KEY: &str = "mass";

/// Isochrone descriptor file name inside a photometric system directory.
pub const ISO_FILE_DESCRIPTOR: &str = "IsoFileDescriptor.txt";

/// Decimal places used for the metallicity in isochrone track file names.
pub const ISO_METALLICITY_PRECISION: usize = 6;
