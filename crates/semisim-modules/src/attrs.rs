//! Typed reads of entity attributes and global parameters.
//!
//! Absent or null values read as `None`. A present value of the wrong shape
//! is an error: modules never silently treat `"12"` or `[1, 2]` as a number.

use std::collections::BTreeMap;

use semisim_core::{Entity, ModuleError};
use semisim_types::{GlobalParameters, Value};

fn malformed(entity: &Entity, attribute: &str, reason: String) -> ModuleError {
    ModuleError::MalformedAttribute {
        entity: entity.id().to_string(),
        attribute: attribute.to_owned(),
        reason,
    }
}

/// Read a numeric attribute.
pub fn number(entity: &Entity, name: &str) -> Result<Option<f64>, ModuleError> {
    match entity.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            malformed(
                entity,
                name,
                format!("expected number, found {}", value.type_name()),
            )
        }),
    }
}

/// Read a mapping of numbers, such as capacity per node.
pub fn number_map(
    entity: &Entity,
    name: &str,
) -> Result<Option<BTreeMap<String, f64>>, ModuleError> {
    let map = match entity.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Map(map)) => map,
        Some(other) => {
            return Err(malformed(
                entity,
                name,
                format!("expected mapping, found {}", other.type_name()),
            ));
        }
    };
    map.iter()
        .map(|(key, value)| {
            value.as_f64().map(|n| (key.clone(), n)).ok_or_else(|| {
                malformed(
                    entity,
                    name,
                    format!("entry `{key}` is a {}, not a number", value.type_name()),
                )
            })
        })
        .collect::<Result<_, _>>()
        .map(Some)
}

/// Read a list of strings, such as target region ids. Absent reads as empty.
pub fn string_list(entity: &Entity, name: &str) -> Result<Vec<String>, ModuleError> {
    let Some(value) = entity.get(name).filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let items = value.as_list().ok_or_else(|| {
        malformed(
            entity,
            name,
            format!("expected sequence, found {}", value.type_name()),
        )
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                malformed(
                    entity,
                    name,
                    format!("expected string entries, found {}", item.type_name()),
                )
            })
        })
        .collect()
}

/// Read a numeric global parameter.
pub fn param(params: &GlobalParameters, name: &str) -> Result<Option<f64>, ModuleError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ModuleError::InvalidParameter {
                name: name.to_owned(),
                reason: format!("expected number, found {}", value.type_name()),
            }),
    }
}

/// Read a numeric global parameter with a fallback.
pub fn param_or(params: &GlobalParameters, name: &str, default: f64) -> Result<f64, ModuleError> {
    Ok(param(params, name)?.unwrap_or(default))
}

/// Sum of the values of a number map.
pub fn total(map: &BTreeMap<String, f64>) -> f64 {
    map.values().sum()
}
