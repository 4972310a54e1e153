//! Run parameters and the engine's parameter file template.
//!
//! Resolution order is defaults, then caller overrides, then the four
//! mandatory fields (photometric category, photometric system, magnitude
//! and color names, neighbor count). Later layers win.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};

pub const PHOTO_CATEG: &str = "photo_categ";
pub const PHOTO_SYS: &str = "photo_sys";
pub const MAG_COLOR_NAMES: &str = "mag_color_names";
pub const NRES: &str = "nres";

/// Override key naming the parameter file path; never rendered into the file.
pub const PARFILE: &str = "parfile";

/// Fields every run sets itself; callers cannot change them through overrides.
pub const MANDATORY_FIELDS: [&str; 4] = [PHOTO_CATEG, PHOTO_SYS, MAG_COLOR_NAMES, NRES];

/// Parameter file layout understood by the synthesis engine.
pub const PARFILE_TEMPLATE: &str = "\
outputFile\t\t$output_file
outputDir\t\t$output_dir
photoCateg\t\t$photo_categ
photoSys\t\t$photo_sys
magcolorNames\t\t$mag_color_names
appMagLimits[0]\t\t$app_mag_lim_lo
appMagLimits[1]\t\t$app_mag_lim_hi
absMagLimits[0]\t\t$abs_mag_lim_lo
absMagLimits[1]\t\t$abs_mag_lim_hi
colorLimits[0]\t\t$color_lim_lo
colorLimits[1]\t\t$color_lim_hi
geometryOption\t\t$geometry_option
longitude\t\t$longitude
latitude\t\t$latitude
surveyArea\t\t$survey_area
fSample\t\t$f_sample
popID\t\t$pop_id
warpFlareOn\t\t$warp_flare_on
seed\t\t$seed
r_max\t\t$r_max
starType\t\t$star_type
photoError\t\t$photo_error
rSun[0]\t\t$r_sun0
rSun[1]\t\t$r_sun1
rSun[2]\t\t$r_sun2
vSun[0]\t\t$v_sun0
vSun[1]\t\t$v_sun1
vSun[2]\t\t$v_sun2
nres\t\t$nres
nstart\t\t$nstart
rand_seed\t\t$rand_seed
";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
    )
    .unwrap()
});

/// A single parameter value as written into the parameter file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "{s}"),
            ParamValue::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl ParamValue {
    /// Equality where `Int(64)` and `Float(64.0)` count as the same value.
    pub fn same_value(&self, other: &ParamValue) -> bool {
        match (self, other) {
            (ParamValue::Int(a), ParamValue::Float(b)) | (ParamValue::Float(b), ParamValue::Int(a)) => {
                *a as f64 == *b
            }
            _ => self == other,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::List(v)
    }
}

pub type Parameters = BTreeMap<String, ParamValue>;

/// Built-in engine defaults for every non-mandatory template field.
pub fn default_parameters() -> Parameters {
    let defaults: [(&str, ParamValue); 27] = [
        ("output_file", "galaxy1".into()),
        ("output_dir", "./".into()),
        ("app_mag_lim_lo", (-1000.0).into()),
        ("app_mag_lim_hi", 1000.0.into()),
        ("abs_mag_lim_lo", (-1000.0).into()),
        ("abs_mag_lim_hi", 1000.0.into()),
        ("color_lim_lo", (-1000.0).into()),
        ("color_lim_hi", 1000.0.into()),
        ("geometry_option", 0i64.into()),
        ("longitude", 76.2.into()),
        ("latitude", 13.5.into()),
        ("survey_area", 207.455.into()),
        ("f_sample", 1.0.into()),
        ("pop_id", (-1i64).into()),
        ("warp_flare_on", 1i64.into()),
        ("seed", 17i64.into()),
        ("r_max", 1000.0.into()),
        ("star_type", 0i64.into()),
        ("photo_error", 0i64.into()),
        ("r_sun0", (-8.0).into()),
        ("r_sun1", 0.0.into()),
        ("r_sun2", 0.015.into()),
        ("v_sun0", 11.1.into()),
        ("v_sun1", 239.08.into()),
        ("v_sun2", 7.25.into()),
        ("nstart", 0i64.into()),
        ("rand_seed", 1i64.into()),
    ];
    defaults
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Magnitude plus a blue-red color pair, rendered as `mag,blue-red`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagColorSelection {
    pub magnitude: String,
    pub blue: String,
    pub red: String,
}

impl MagColorSelection {
    pub fn new(magnitude: &str, blue: &str, red: &str) -> Self {
        Self {
            magnitude: magnitude.to_string(),
            blue: blue.to_string(),
            red: red.to_string(),
        }
    }

    pub fn names(&self) -> [&str; 3] {
        [self.magnitude.as_str(), self.blue.as_str(), self.red.as_str()]
    }

    /// Every selected name must be offered by the photometric system.
    pub fn check(&self, available: &[String]) -> Result<()> {
        for name in self.names() {
            if !available.iter().any(|a| a == name) {
                return Err(InputError::UnknownMagnitude {
                    name: name.to_string(),
                    available: available.to_vec(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for MagColorSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}-{}", self.magnitude, self.blue, self.red)
    }
}

impl FromStr for MagColorSelection {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = s.split_once(',').and_then(|(mag, color)| {
            let (blue, red) = color.split_once('-')?;
            [mag, blue, red]
                .iter()
                .all(|n| !n.trim().is_empty())
                .then(|| MagColorSelection::new(mag.trim(), blue.trim(), red.trim()))
        });
        parsed.ok_or_else(|| InputError::Format {
            input: s.to_string(),
            detail: "expected <mag>,<blue>-<red>".to_string(),
        })
    }
}

/// Merge defaults, caller overrides and mandatory fields into one parameter set.
///
/// An override naming a mandatory field is only accepted when it agrees with
/// the mandatory value.
pub fn resolve_parameters(
    defaults: &Parameters,
    overrides: &Parameters,
    mandatory: &Parameters,
) -> Result<Parameters> {
    for (key, value) in overrides {
        if let Some(required) = mandatory.get(key)
            && !required.same_value(value)
        {
            return Err(InputError::Configuration(format!(
                "override '{key}' = '{value}' conflicts with run value '{required}'"
            )));
        }
    }

    let mut resolved = defaults.clone();
    resolved.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    resolved.extend(mandatory.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(resolved)
}

/// The mandatory layer for one run.
pub fn mandatory_parameters(
    category: &str,
    system: &str,
    selection: &MagColorSelection,
    ngb: u32,
) -> Parameters {
    let mut params = Parameters::new();
    params.insert(PHOTO_CATEG.to_string(), category.into());
    params.insert(PHOTO_SYS.to_string(), system.into());
    params.insert(MAG_COLOR_NAMES.to_string(), selection.to_string().into());
    params.insert(NRES.to_string(), ngb.into());
    params
}

/// `$name` / `${name}` substitution with `$$` as a literal dollar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn parfile() -> Self {
        Self::new(PARFILE_TEMPLATE)
    }

    /// Placeholder names referenced by the template.
    pub fn placeholders(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for caps in PLACEHOLDER.captures_iter(&self.source) {
            if let Some(m) = caps.name("named").or_else(|| caps.name("braced")) {
                names.insert(m.as_str().to_string());
            } else if let Some(m) = caps.name("invalid") {
                return Err(self.invalid_at(m.start()));
            }
        }
        Ok(names)
    }

    pub fn substitute(&self, values: &Parameters) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.source) {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((last, last));
            out.push_str(&self.source[last..whole.0]);
            last = whole.1;

            if caps.name("escaped").is_some() {
                out.push('$');
            } else if let Some(m) = caps.name("named").or_else(|| caps.name("braced")) {
                let value = values.get(m.as_str()).ok_or_else(|| InputError::Template {
                    placeholder: m.as_str().to_string(),
                    detail: "no value given".to_string(),
                })?;
                out.push_str(&value.to_string());
            } else {
                return Err(self.invalid_at(whole.0));
            }
        }
        out.push_str(&self.source[last..]);
        Ok(out)
    }

    fn invalid_at(&self, offset: usize) -> InputError {
        let before = &self.source[..offset];
        let line = before.matches('\n').count() + 1;
        let col = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
        InputError::Template {
            placeholder: self.source[offset..].chars().take(8).collect(),
            detail: format!("invalid placeholder at line {line}, col {col}"),
        }
    }
}

/// Keys in `params` that the template never references.
pub fn unused_keys(template: &Template, params: &Parameters) -> Result<Vec<String>> {
    let used = template.placeholders()?;
    Ok(params
        .keys()
        .filter(|k| !used.contains(*k))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> MagColorSelection {
        MagColorSelection::new("V", "B", "V")
    }

    fn mandatory() -> Parameters {
        mandatory_parameters("padova", "GAIA__0", &selection(), 64)
    }

    #[test]
    fn test_parfile_template_fully_covered() {
        let resolved = resolve_parameters(&default_parameters(), &Parameters::new(), &mandatory())
            .unwrap();
        let text = Template::parfile().substitute(&resolved).unwrap();
        assert!(text.contains("photoCateg\t\tpadova\n"));
        assert!(text.contains("photoSys\t\tGAIA__0\n"));
        assert!(text.contains("magcolorNames\t\tV,B-V\n"));
        assert!(text.contains("nres\t\t64\n"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn test_every_placeholder_has_a_value() {
        let resolved = resolve_parameters(&default_parameters(), &Parameters::new(), &mandatory())
            .unwrap();
        let used = Template::parfile().placeholders().unwrap();
        for name in &used {
            assert!(resolved.contains_key(name), "no value for {name}");
        }
        assert!(unused_keys(&Template::parfile(), &resolved).unwrap().is_empty());
    }

    #[test]
    fn test_overrides_beat_defaults() {
        let mut overrides = Parameters::new();
        overrides.insert("seed".to_string(), 3i64.into());
        let resolved = resolve_parameters(&default_parameters(), &overrides, &mandatory()).unwrap();
        assert_eq!(resolved["seed"], ParamValue::Int(3));
    }

    #[test]
    fn test_conflicting_mandatory_override_rejected() {
        let mut overrides = Parameters::new();
        overrides.insert(NRES.to_string(), 32u32.into());
        let err = resolve_parameters(&default_parameters(), &overrides, &mandatory()).unwrap_err();
        assert!(matches!(err, InputError::Configuration(_)));
    }

    #[test]
    fn test_agreeing_mandatory_override_accepted() {
        let mut overrides = Parameters::new();
        overrides.insert(NRES.to_string(), 64u32.into());
        assert!(resolve_parameters(&default_parameters(), &overrides, &mandatory()).is_ok());
    }

    #[test]
    fn test_numerically_equal_mandatory_override_accepted() {
        let mut overrides = Parameters::new();
        overrides.insert(NRES.to_string(), 64.0f64.into());
        let resolved = resolve_parameters(&default_parameters(), &overrides, &mandatory()).unwrap();
        assert_eq!(resolved[NRES], ParamValue::Int(64));

        overrides.insert(NRES.to_string(), 64.5f64.into());
        assert!(matches!(
            resolve_parameters(&default_parameters(), &overrides, &mandatory()),
            Err(InputError::Configuration(_))
        ));
    }

    #[test]
    fn test_same_value_across_numeric_variants() {
        assert!(ParamValue::Int(3).same_value(&ParamValue::Float(3.0)));
        assert!(ParamValue::Float(3.0).same_value(&ParamValue::Int(3)));
        assert!(!ParamValue::Int(3).same_value(&ParamValue::Text("3".to_string())));
        assert!(!ParamValue::Float(f64::NAN).same_value(&ParamValue::Float(f64::NAN)));
    }

    #[test]
    fn test_missing_placeholder_is_template_error() {
        let err = Template::new("a $b c").substitute(&Parameters::new()).unwrap_err();
        assert_eq!(
            err,
            InputError::Template {
                placeholder: "b".to_string(),
                detail: "no value given".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_placeholder_is_template_error() {
        let mut params = Parameters::new();
        params.insert("x".to_string(), 1i64.into());
        let err = Template::new("ok $x\nbad $1").substitute(&params).unwrap_err();
        match err {
            InputError::Template { detail, .. } => assert!(detail.contains("line 2, col 5"), "{detail}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_braced_and_escaped() {
        let mut params = Parameters::new();
        params.insert("x".to_string(), "v".into());
        let text = Template::new("${x}y $$x").substitute(&params).unwrap();
        assert_eq!(text, "vy $x");
    }

    #[test]
    fn test_selection_parse_and_check() {
        let sel: MagColorSelection = "G,Gbp-Grp".parse().unwrap();
        assert_eq!(sel, MagColorSelection::new("G", "Gbp", "Grp"));
        let available = vec!["G".to_string(), "Gbp".to_string(), "Grp".to_string()];
        assert!(sel.check(&available).is_ok());
        assert!(matches!(
            MagColorSelection::new("V", "B", "V").check(&available),
            Err(InputError::UnknownMagnitude { .. })
        ));
        assert!("G".parse::<MagColorSelection>().is_err());
    }

    #[test]
    fn test_param_value_serde_untagged() {
        let params: Parameters = serde_json::from_str(r#"{"seed": 5, "longitude": 10.5, "output_file": "g"}"#).unwrap();
        assert_eq!(params["seed"], ParamValue::Int(5));
        assert_eq!(params["longitude"], ParamValue::Float(10.5));
        assert_eq!(params["output_file"], ParamValue::Text("g".to_string()));
    }
}
