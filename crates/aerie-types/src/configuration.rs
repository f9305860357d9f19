//! # Configuration - Named, Typed Parameters
//!
//! Every service declares its parameters in `default_configuration()`; the
//! runtime then overrides some of them and hands the frozen result to
//! `initialize()`.
//!
//! ## Parameter Types
//!
//! | Rust type | Kind | Text form |
//! |-----------|------|-----------|
//! | `i32` | `int` | `42` |
//! | `f64` | `double` | `2.5` |
//! | `bool` | `bool` | `true` / `false` |
//! | `String` | `string` | surrounding whitespace trimmed |
//! | `(i32, i32)` | `pair<int, int>` | `[1, 2]` |
//! | `(f64, f64)` | `pair<double, double>` | `[0.5, 1.5]` |
//! | `Vec<i32>` / `Vec<f64>` / `Vec<String>` | `vector<..>` | `[a, b, c]` |
//!
//! ## Conversions
//!
//! Only identity, `&str` to `string` and `int` to `double` are accepted, both
//! when setting and when reading a parameter. Everything else is a
//! [`ConfigurationError::TypeMismatch`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i32),
    Double(f64),
    Bool(bool),
    Str(String),
    RangeI((i32, i32)),
    RangeD((f64, f64)),
    VecI(Vec<i32>),
    VecD(Vec<f64>),
    VecS(Vec<String>),
}

/// Type tag of a [`ParamValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    Int,
    Double,
    Bool,
    Str,
    RangeI,
    RangeD,
    VecI,
    VecD,
    VecS,
}

impl ParamKind {
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Double => "double",
            ParamKind::Bool => "bool",
            ParamKind::Str => "string",
            ParamKind::RangeI => "pair<int, int>",
            ParamKind::RangeD => "pair<double, double>",
            ParamKind::VecI => "vector<int>",
            ParamKind::VecD => "vector<double>",
            ParamKind::VecS => "vector<string>",
        }
    }

    /// Parse `text` into a value of this kind.
    pub fn decode(self, text: &str) -> Option<ParamValue> {
        let value = match self {
            ParamKind::Int => ParamValue::Int(text.trim().parse().ok()?),
            ParamKind::Double => ParamValue::Double(text.trim().parse().ok()?),
            ParamKind::Bool => match text.trim() {
                "true" => ParamValue::Bool(true),
                "false" => ParamValue::Bool(false),
                _ => return None,
            },
            ParamKind::Str => ParamValue::Str(text.trim().to_string()),
            ParamKind::RangeI => match decode_list::<i32>(text)?.as_slice() {
                [first, second] => ParamValue::RangeI((*first, *second)),
                _ => return None,
            },
            ParamKind::RangeD => match decode_list::<f64>(text)?.as_slice() {
                [first, second] => ParamValue::RangeD((*first, *second)),
                _ => return None,
            },
            ParamKind::VecI => ParamValue::VecI(decode_list(text)?),
            ParamKind::VecD => ParamValue::VecD(decode_list(text)?),
            ParamKind::VecS => ParamValue::VecS(decode_list(text)?),
        };
        Some(value)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split `[a, b, c]` into trimmed, non-empty tokens and parse each.
fn decode_list<T: std::str::FromStr>(text: &str) -> Option<Vec<T>> {
    let inner = text
        .trim()
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                None
            } else {
                token.parse().ok()
            }
        })
        .collect()
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Double(_) => ParamKind::Double,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::RangeI(_) => ParamKind::RangeI,
            ParamValue::RangeD(_) => ParamKind::RangeD,
            ParamValue::VecI(_) => ParamKind::VecI,
            ParamValue::VecD(_) => ParamKind::VecD,
            ParamValue::VecS(_) => ParamKind::VecS,
        }
    }

    /// Convert to `kind` if the conversion whitelist allows it.
    pub fn coerce(self, kind: ParamKind) -> Option<ParamValue> {
        match (self, kind) {
            (ParamValue::Int(i), ParamKind::Double) => Some(ParamValue::Double(f64::from(i))),
            (value, kind) if value.kind() == kind => Some(value),
            _ => None,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Double(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Str(v) => f.write_str(v),
            ParamValue::RangeI((a, b)) => write!(f, "[{a}, {b}]"),
            ParamValue::RangeD((a, b)) => write!(f, "[{a}, {b}]"),
            ParamValue::VecI(v) => write_list(f, v),
            ParamValue::VecD(v) => write_list(f, v),
            ParamValue::VecS(v) => write_list(f, v),
        }
    }
}

macro_rules! impl_into_param {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::$variant(value)
                }
            }
        )*
    };
}

impl_into_param! {
    i32 => Int,
    f64 => Double,
    bool => Bool,
    String => Str,
    (i32, i32) => RangeI,
    (f64, f64) => RangeD,
    Vec<i32> => VecI,
    Vec<f64> => VecD,
    Vec<String> => VecS,
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

/// Rust types that can be read back out of a [`Configuration`].
pub trait ParamType: Sized {
    const KIND: ParamKind;

    /// Extract from `value`, honouring the conversion whitelist.
    fn from_value(value: &ParamValue) -> Option<Self>;
}

macro_rules! impl_param_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ParamType for $ty {
                const KIND: ParamKind = ParamKind::$variant;

                fn from_value(value: &ParamValue) -> Option<Self> {
                    match value {
                        ParamValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_param_type! {
    i32 => Int,
    bool => Bool,
    String => Str,
    (i32, i32) => RangeI,
    (f64, f64) => RangeD,
    Vec<i32> => VecI,
    Vec<f64> => VecD,
    Vec<String> => VecS,
}

impl ParamType for f64 {
    const KIND: ParamKind = ParamKind::Double;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Double(v) => Some(*v),
            ParamValue::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Parameter {
    kind: ParamKind,
    value: Option<ParamValue>,
}

/// Named parameter set for one service, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    parameters: BTreeMap<String, Parameter>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter of type `T` with no value; it must be set before use.
    pub fn parameter<T: ParamType>(&mut self, name: &str) -> Result<&mut Self, ConfigurationError> {
        self.declare(name, T::KIND, None)
    }

    /// Declare a parameter whose type and default come from `value`.
    pub fn parameter_default(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<&mut Self, ConfigurationError> {
        let value = value.into();
        self.declare(name, value.kind(), Some(value))
    }

    fn declare(
        &mut self,
        name: &str,
        kind: ParamKind,
        value: Option<ParamValue>,
    ) -> Result<&mut Self, ConfigurationError> {
        if self.parameters.contains_key(name) {
            return Err(ConfigurationError::DuplicateParameter {
                name: name.to_string(),
                kind: kind.name().to_string(),
            });
        }
        self.parameters
            .insert(name.to_string(), Parameter { kind, value });
        Ok(self)
    }

    /// Current value of `name` as `T`.
    pub fn get_parameter<T: ParamType>(&self, name: &str) -> Result<T, ConfigurationError> {
        let param = self.lookup(name, T::KIND)?;
        let value = param
            .value
            .as_ref()
            .ok_or_else(|| ConfigurationError::ParameterNotSet {
                name: name.to_string(),
                requested: T::KIND.name().to_string(),
            })?;
        T::from_value(value).ok_or_else(|| ConfigurationError::TypeMismatch {
            name: name.to_string(),
            declared: param.kind.name().to_string(),
            requested: T::KIND.name().to_string(),
        })
    }

    /// The raw value of `name`, `None` if declared but never set.
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name).and_then(|p| p.value.as_ref())
    }

    /// Declared kind of `name`.
    pub fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.parameters.get(name).map(|p| p.kind)
    }

    /// Override a declared parameter.
    pub fn set_parameter(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<&mut Self, ConfigurationError> {
        let value = value.into();
        let requested = value.kind();
        let param = self.lookup_mut(name, requested)?;
        let declared = param.kind;
        param.value = Some(value.coerce(declared).ok_or_else(|| {
            ConfigurationError::TypeMismatch {
                name: name.to_string(),
                declared: declared.name().to_string(),
                requested: requested.name().to_string(),
            }
        })?);
        Ok(self)
    }

    /// Override a declared parameter from its text form.
    pub fn set_parameter_decode(
        &mut self,
        name: &str,
        text: &str,
    ) -> Result<&mut Self, ConfigurationError> {
        let param = self.lookup_mut(name, ParamKind::Str)?;
        let decoded = param
            .kind
            .decode(text)
            .ok_or_else(|| ConfigurationError::Decode {
                name: name.to_string(),
                kind: param.kind.name().to_string(),
                text: text.to_string(),
            })?;
        param.value = Some(decoded);
        Ok(self)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// True if `name` is declared and holds a value (default or override).
    pub fn is_parameter_set(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Human-readable listing: `  - name -> value (type)`.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for (name, param) in &self.parameters {
            write!(out, "  - {name} -> ")?;
            match &param.value {
                Some(value) => write!(out, "{value}")?,
                None => write!(out, "NO DEFAULT")?,
            }
            writeln!(out, " ({})", param.kind)?;
        }
        Ok(())
    }

    /// INI-style listing: `name = value`.
    pub fn dump_ini<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for (name, param) in &self.parameters {
            match &param.value {
                Some(value) => writeln!(out, "{name} = {value}")?,
                None => writeln!(out, "{name} = ---NOT SET---")?,
            }
        }
        Ok(())
    }

    /// `{ name: { "type": kind, "value": value-or-null } }`.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .parameters
            .iter()
            .map(|(name, param)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": param.kind.name(),
                        "value": param.value,
                    }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }

    fn lookup(&self, name: &str, requested: ParamKind) -> Result<&Parameter, ConfigurationError> {
        self.parameters
            .get(name)
            .ok_or_else(|| ConfigurationError::UndeclaredParameter {
                name: name.to_string(),
                requested: requested.name().to_string(),
            })
    }

    fn lookup_mut(
        &mut self,
        name: &str,
        requested: ParamKind,
    ) -> Result<&mut Parameter, ConfigurationError> {
        self.parameters
            .get_mut(name)
            .ok_or_else(|| ConfigurationError::UndeclaredParameter {
                name: name.to_string(),
                requested: requested.name().to_string(),
            })
    }
}

/// Union of two configurations. For names present in both, `rhs` wins; a
/// parameter left without a value on one side keeps the other side's value.
pub fn compose(lhs: &Configuration, rhs: &Configuration) -> Configuration {
    let mut parameters = lhs.parameters.clone();
    for (name, param) in &rhs.parameters {
        let merged = match (parameters.get(name), &param.value) {
            (Some(existing), None) if existing.kind == param.kind => existing.clone(),
            _ => param.clone(),
        };
        parameters.insert(name.clone(), merged);
    }
    Configuration { parameters }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}
