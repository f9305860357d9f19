//! # Nest Files
//!
//! TOML description of the services to assemble. Each top-level table is
//! one service, added in file order; `service_type` names the catalog type
//! and every other key sets a parameter:
//!
//! ```toml
//! [source]
//! service_type = "CountingSource"
//! count = 1000
//!
//! [main]
//! service_type = "SequentialMainLoop"
//! source = "source"
//! modulechain = ["prescale", "dump"]
//! ```
//!
//! Values are converted to the declared parameter type. A quoted scalar
//! written for a non-string parameter is decoded as text, so
//! `count = "1000"` and `count = 1000` are equivalent.

use std::fs;
use std::path::Path;

use aerie_types::{ConfigurationError, ParamKind, ParamValue};
use toml::{Table, Value};
use tracing::info;

use crate::error::RuntimeError;
use crate::nest::Nest;

/// Key naming the component type of a service table.
pub const SERVICE_TYPE_KEY: &str = "service_type";

/// Add every service described in `text` to `nest`. Returns the number of services added.
pub fn load_nest_str(nest: &mut Nest, text: &str) -> Result<usize, RuntimeError> {
    let table: Table = toml::from_str(text).map_err(|e| RuntimeError::NestFile(e.to_string()))?;

    for (name, service) in &table {
        let Value::Table(service) = service else {
            return Err(RuntimeError::NestFile(format!("'{name}' is not a service table")));
        };
        let type_name = service
            .get(SERVICE_TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| RuntimeError::NestFile(format!("service '{name}' has no {SERVICE_TYPE_KEY}")))?;

        nest.add_service(type_name, name)?;
        for (parameter, value) in service.iter().filter(|(key, _)| *key != SERVICE_TYPE_KEY) {
            set_from_toml(nest, name, parameter, value)?;
        }
    }

    info!("[Nest] Loaded {} services from nest file", table.len());
    Ok(table.len())
}

/// Read and load a nest file from disk.
pub fn load_nest_file(nest: &mut Nest, path: impl AsRef<Path>) -> Result<usize, RuntimeError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| RuntimeError::NestFile(format!("{}: {}", path.display(), e)))?;
    load_nest_str(nest, &text)
}

/// Render the assembled services as a nest file. Parameters without a value are omitted.
pub fn to_nest_string(nest: &Nest) -> Result<String, RuntimeError> {
    let mut root = Table::new();
    for (name, type_name, config) in nest.entries() {
        let mut service = Table::new();
        service.insert(SERVICE_TYPE_KEY.to_string(), Value::String(type_name.to_string()));
        for parameter in config.names() {
            if let Some(value) = config.value(parameter) {
                let value = Value::try_from(value).map_err(|e| RuntimeError::NestFile(e.to_string()))?;
                service.insert(parameter.to_string(), value);
            }
        }
        root.insert(name.to_string(), Value::Table(service));
    }
    toml::to_string(&root).map_err(|e| RuntimeError::NestFile(e.to_string()))
}

fn set_from_toml(nest: &mut Nest, service: &str, parameter: &str, value: &Value) -> Result<(), RuntimeError> {
    let kind = nest
        .configuration(service)
        .and_then(|config| config.kind_of(parameter))
        .ok_or_else(|| ConfigurationError::UndeclaredParameter {
            name: parameter.to_string(),
            requested: value.type_str().to_string(),
        })?;

    match value {
        Value::String(text) if kind != ParamKind::Str => {
            return nest.set_parameter_decode(service, parameter, text);
        }
        _ => {}
    }

    let converted = param_value(kind, value).ok_or_else(|| {
        RuntimeError::NestFile(format!(
            "'{service}.{parameter}' expects {kind}, found {}",
            value.type_str()
        ))
    })?;
    nest.set_parameter(service, parameter, converted)
}

/// Convert a TOML value to `kind` without a text round trip.
fn param_value(kind: ParamKind, value: &Value) -> Option<ParamValue> {
    let converted = match (kind, value) {
        (ParamKind::Int, Value::Integer(i)) => ParamValue::Int(int(*i)?),
        (ParamKind::Double, value) => ParamValue::Double(double(value)?),
        (ParamKind::Bool, Value::Boolean(b)) => ParamValue::Bool(*b),
        (ParamKind::Str, Value::String(s)) => ParamValue::Str(s.clone()),
        (ParamKind::RangeI, Value::Array(items)) => match items.as_slice() {
            [Value::Integer(a), Value::Integer(b)] => ParamValue::RangeI((int(*a)?, int(*b)?)),
            _ => return None,
        },
        (ParamKind::RangeD, Value::Array(items)) => match items.as_slice() {
            [a, b] => ParamValue::RangeD((double(a)?, double(b)?)),
            _ => return None,
        },
        (ParamKind::VecI, Value::Array(items)) => ParamValue::VecI(
            items
                .iter()
                .map(|item| item.as_integer().and_then(int))
                .collect::<Option<_>>()?,
        ),
        (ParamKind::VecD, Value::Array(items)) => {
            ParamValue::VecD(items.iter().map(double).collect::<Option<_>>()?)
        }
        (ParamKind::VecS, Value::Array(items)) => ParamValue::VecS(
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<_>>()?,
        ),
        _ => return None,
    };
    Some(converted)
}

fn int(value: i64) -> Option<i32> {
    i32::try_from(value).ok()
}

fn double(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => int(*i).map(f64::from),
        _ => None,
    }
}
