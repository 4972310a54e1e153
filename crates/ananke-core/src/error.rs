use std::fmt;

/// Validation and derivation failures raised before anything touches disk.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// Required keys are absent or unrecognized keys were given.
    Schema {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    /// A column has the wrong trailing dimension for its property.
    Shape {
        key: String,
        expected: usize,
        found: usize,
    },
    /// Columns whose leading dimension differs from the reference column.
    LengthMismatch {
        reference: String,
        expected: usize,
        mismatched: Vec<(String, usize)>,
    },
    /// A filename or descriptor line does not follow its pattern.
    Format { input: String, detail: String },
    /// Parameter template substitution failed.
    Template { placeholder: String, detail: String },
    /// Contradictory or out-of-range construction arguments.
    Configuration(String),
    /// A selected magnitude is not offered by the photometric system.
    UnknownMagnitude { name: String, available: Vec<String> },
    /// A density or kernel value that cannot be used (non-positive, NaN).
    InvalidValue { key: String, index: usize, value: f64 },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Schema { missing, extra } => {
                write!(f, "particle data covers wrong set of keys:")?;
                if !missing.is_empty() {
                    write!(f, " misses {}", missing.join(", "))?;
                }
                if !missing.is_empty() && !extra.is_empty() {
                    write!(f, " &")?;
                }
                if !extra.is_empty() {
                    write!(f, " misincludes {}", extra.join(", "))?;
                }
                Ok(())
            }
            InputError::Shape {
                key,
                expected,
                found,
            } => write!(f, "column '{key}' has width {found}, expected {expected}"),
            InputError::LengthMismatch {
                reference,
                expected,
                mismatched,
            } => {
                let listed: Vec<String> = mismatched
                    .iter()
                    .map(|(key, len)| format!("{key} ({len})"))
                    .collect();
                write!(
                    f,
                    "columns differ in length from '{reference}' ({expected}): {}",
                    listed.join(", ")
                )
            }
            InputError::Format { input, detail } => write!(f, "bad format in '{input}': {detail}"),
            InputError::Template {
                placeholder,
                detail,
            } => write!(f, "template error at '{placeholder}': {detail}"),
            InputError::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            InputError::UnknownMagnitude { name, available } => write!(
                f,
                "magnitude '{name}' not available (choose from {})",
                available.join(", ")
            ),
            InputError::InvalidValue { key, index, value } => {
                write!(f, "invalid value {value} in '{key}' at index {index}")
            }
        }
    }
}

impl std::error::Error for InputError {}

pub type Result<T> = std::result::Result<T, InputError>;
