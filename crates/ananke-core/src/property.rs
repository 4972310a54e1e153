//! Static table of the particle properties the synthesis engine understands.
//!
//! Every key, its description, whether it is required, and the trailing
//! dimension of its column live in [`PROPERTIES`]. Derived key sets are pure
//! functions over that table.

use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// One particle property: archive key, human description, requirement and width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Property {
    pub key: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
    pub width: usize,
}

impl Property {
    const fn required(key: &'static str, description: &'static str, width: usize) -> Self {
        Self {
            key,
            description,
            requirement: Requirement::Required,
            width,
        }
    }

    const fn optional(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            requirement: Requirement::Optional,
            width: 1,
        }
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }
}

pub const POSITION: &str = "pos3";
pub const VELOCITY: &str = "vel3";
pub const MASS: &str = "mass";
pub const AGE: &str = "age";
pub const METALLICITY: &str = "feh";
pub const PARENT_ID: &str = "parentid";
pub const POPULATION_ID: &str = "id";
pub const FORMATION_DISTANCE: &str = "dform";
pub const ALPHA: &str = "alpha";

/// Chemical element abundance keys, lightest first.
pub const ELEMENTS: [&str; 9] = [
    "helium",
    "carbon",
    "nitrogen",
    "oxygen",
    "neon",
    "magnesium",
    "silicon",
    "sulphur",
    "calcium",
];

/// Archive order: required properties first, then optional ones.
pub static PROPERTIES: [Property; 18] = [
    Property::required(POSITION, "Position coordinates in kpc (Nx3)", 3),
    Property::required(VELOCITY, "Velocity coordinates in km/s (Nx3)", 3),
    Property::required(MASS, "Stellar masses in solar masses", 1),
    Property::required(AGE, "Stellar ages in years and decimal logarithmic scale", 1),
    Property::required(METALLICITY, "Stellar metallicity [Fe/H] in dex relative to solar", 1),
    Property::optional(PARENT_ID, "Index of parent particle"),
    Property::optional(POPULATION_ID, "Index of parent particle population"),
    Property::optional(FORMATION_DISTANCE, "Formation distance of parent particle in kpc"),
    Property::optional("helium", "Helium abundance [He/H] in dex"),
    Property::optional("carbon", "Carbon abundance [C/H] in dex"),
    Property::optional("nitrogen", "Nitrogen abundance [N/H] in dex"),
    Property::optional("oxygen", "Oxygen abundance [O/H] in dex"),
    Property::optional("neon", "Neon abundance [Ne/H] in dex"),
    Property::optional("magnesium", "Magnesium abundance [Mg/H] in dex"),
    Property::optional("silicon", "Silicon abundance [Si/H] in dex"),
    Property::optional("sulphur", "Sulphur abundance [S/H] in dex"),
    Property::optional("calcium", "Calcium abundance [Ca/H] in dex"),
    Property::optional(ALPHA, "Alpha abundance [Mg/Fe] in dex"),
];

pub fn lookup(key: &str) -> Option<&'static Property> {
    PROPERTIES.iter().find(|p| p.key == key)
}

pub fn required_properties() -> impl Iterator<Item = &'static Property> {
    PROPERTIES.iter().filter(|p| p.is_required())
}

pub fn optional_properties() -> impl Iterator<Item = &'static Property> {
    PROPERTIES.iter().filter(|p| !p.is_required())
}

pub fn required_keys() -> BTreeSet<&'static str> {
    required_properties().map(|p| p.key).collect()
}

pub fn optional_keys() -> BTreeSet<&'static str> {
    optional_properties().map(|p| p.key).collect()
}

pub fn all_possible_keys() -> BTreeSet<&'static str> {
    PROPERTIES.iter().map(|p| p.key).collect()
}
