//! File naming for particle and kernel archives.
//!
//! Kernel archives encode the run metadata in their name:
//! `<name>_d<hdim>n<ngb>_den.<ext>`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{InputError, Result};

static KERNEL_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+)_d(?P<hdim>\d+)n(?P<ngb>\d+)_den\.(?P<ext>[^./]+)$").unwrap()
});
static PARTICLE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>[^/]+)\.(?P<ext>[^./]+)$").unwrap());

/// Run metadata carried by a kernel archive file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelFileName {
    pub name: String,
    pub hdim: u32,
    pub ngb: u32,
    pub extension: String,
}

impl KernelFileName {
    pub fn new(name: &str, hdim: u32, ngb: u32, extension: &str) -> Self {
        Self {
            name: name.to_string(),
            hdim,
            ngb,
            extension: extension.to_string(),
        }
    }

    pub fn parse(file_name: &str) -> Result<Self> {
        let caps = KERNEL_FILE
            .captures(file_name)
            .ok_or_else(|| format_error(file_name, "expected <name>_d<hdim>n<ngb>_den.<ext>"))?;

        let hdim: u32 = caps["hdim"]
            .parse()
            .map_err(|e| format_error(file_name, &format!("hdim: {e}")))?;
        if hdim != 3 && hdim != 6 {
            return Err(format_error(file_name, &format!("hdim must be 3 or 6, got {hdim}")));
        }
        let ngb: u32 = caps["ngb"]
            .parse()
            .map_err(|e| format_error(file_name, &format!("ngb: {e}")))?;

        Ok(Self {
            name: caps["name"].to_string(),
            hdim,
            ngb,
            extension: caps["ext"].to_string(),
        })
    }

    /// Parse and require the run name to match the particle archive's.
    pub fn parse_for(file_name: &str, name: &str) -> Result<Self> {
        let parsed = Self::parse(file_name)?;
        if parsed.name != name {
            return Err(format_error(
                file_name,
                &format!("run name '{}' does not match particle file name '{name}'", parsed.name),
            ));
        }
        Ok(parsed)
    }
}

impl fmt::Display for KernelFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_d{}n{}_den.{}",
            self.name, self.hdim, self.ngb, self.extension
        )
    }
}

/// `<name>.<ext>`
pub fn particle_file_name(name: &str, extension: &str) -> String {
    format!("{name}.{extension}")
}

/// Split a particle archive file name into run name and extension.
pub fn parse_particle_file_name(file_name: &str) -> Result<(String, String)> {
    let caps = PARTICLE_FILE
        .captures(file_name)
        .ok_or_else(|| format_error(file_name, "expected <name>.<ext>"))?;
    Ok((caps["name"].to_string(), caps["ext"].to_string()))
}

fn format_error(input: &str, detail: &str) -> InputError {
    InputError::Format {
        input: input.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel_file_name() {
        let parsed = KernelFileName::parse_for("sim_d6n64_den.ebf", "sim").unwrap();
        assert_eq!(parsed.hdim, 6);
        assert_eq!(parsed.ngb, 64);
        assert_eq!(parsed.extension, "ebf");
    }

    #[test]
    fn test_name_with_underscores() {
        let parsed = KernelFileName::parse("m12i_res7100_d3n32_den.arr").unwrap();
        assert_eq!(parsed.name, "m12i_res7100");
        assert_eq!(parsed.hdim, 3);
        assert_eq!(parsed.ngb, 32);
    }

    #[test]
    fn test_display_roundtrip() {
        let name = KernelFileName::new("sim", 6, 64, "arr");
        assert_eq!(name.to_string(), "sim_d6n64_den.arr");
        assert_eq!(KernelFileName::parse(&name.to_string()).unwrap(), name);
    }

    #[test]
    fn test_pattern_violations_are_format_errors() {
        for bad in ["sim_den.ebf", "sim_d6n_den.ebf", "sim_d6n64.ebf", "sim_d6n64_den", "sim_d5n64_den.ebf"] {
            assert!(
                matches!(KernelFileName::parse(bad), Err(InputError::Format { .. })),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_name_mismatch_is_format_error() {
        assert!(matches!(
            KernelFileName::parse_for("other_d6n64_den.ebf", "sim"),
            Err(InputError::Format { .. })
        ));
    }

    #[test]
    fn test_particle_file_name() {
        assert_eq!(particle_file_name("sim", "arr"), "sim.arr");
        assert_eq!(
            parse_particle_file_name("sim.arr").unwrap(),
            ("sim".to_string(), "arr".to_string())
        );
        assert!(parse_particle_file_name("sim").is_err());
    }
}
