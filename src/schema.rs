//! Field schemas: the closed set of field kinds an entry form can hold
//!
//! Three kinds only. Every consumer (default derivation, seeding coercion,
//! input acceptance, the meaningful-data predicate in `save`) matches
//! exhaustively on `FieldKind`; there is no string-keyed dispatch.

use crate::store::docs::Scalar;

/// One selectable option of a choice field
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub label: String,
    pub value: Scalar,
}

/// Kind-specific schema data for a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Closed list of options with a declared default
    Choice {
        options: Vec<ChoiceOption>,
        default: Scalar,
    },
    /// Digit-only numeric input, edited as a display string
    Numeric {
        unit: Option<&'static str>,
        placeholder: Option<&'static str>,
    },
    /// Two-state toggle
    Boolean {
        true_label: &'static str,
        false_label: &'static str,
    },
}

/// A field of an entry form: stable key, display label, kind data
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldKind {
    /// Schema default: declared default for choices, false for toggles,
    /// empty display string for numerics.
    pub fn default_value(&self) -> Scalar {
        match self {
            Self::Choice { default, .. } => default.clone(),
            Self::Numeric { .. } => Scalar::Text(String::new()),
            Self::Boolean { .. } => Scalar::Bool(false),
        }
    }

    /// Coerce a stored value into its editable form: stored numbers become
    /// display strings, toggle values are cast to bool, choice values pass
    /// through unchanged.
    pub fn coerce_stored(&self, stored: &Scalar) -> Scalar {
        match self {
            Self::Numeric { .. } => match stored {
                Scalar::Number(n) => Scalar::Text(number_to_display(*n)),
                Scalar::Text(t) => Scalar::Text(t.clone()),
                Scalar::Bool(b) => Scalar::Text(b.to_string()),
            },
            Self::Boolean { .. } => Scalar::Bool(stored.coerce_bool()),
            Self::Choice { .. } => stored.clone(),
        }
    }

    /// Whether a candidate edit is accepted for this kind.
    ///
    /// Numeric fields take digit-only text (the input boundary rejects any
    /// other keystroke, so unparseable numeric strings can never enter form
    /// state), toggles take booleans, choices take one of their declared
    /// option values.
    pub fn accepts(&self, candidate: &Scalar) -> bool {
        match self {
            Self::Numeric { .. } => match candidate {
                Scalar::Text(t) => t.chars().all(|c| c.is_ascii_digit()),
                _ => false,
            },
            Self::Boolean { .. } => matches!(candidate, Scalar::Bool(_)),
            Self::Choice { options, .. } => options.iter().any(|o| o.value == *candidate),
        }
    }
}

/// Render a stored number the way a user typed it: integral values without
/// a trailing `.0`.
pub(crate) fn number_to_display(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
