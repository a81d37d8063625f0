//! Merging YAML documents
use serde_yml::{Mapping, Value};
use thiserror::Error;

/// An error merging YAML values.
#[derive(Debug, Error)]
pub enum Error {
    /// The types of the values do not match.
    #[error("Types do not match {0} != {1}")]
    InvalidTypes(String, String),
}

/// Merge `b` over `a`.
///
/// Mappings are merged key by key and sequences element by element, so a
/// secrets file can add a password to the second vehicle with
/// `vehicles: [~, {password: x}]`. A null in `b` removes the key.
///
/// # Errors
///
/// Will return an error if the types of the values do not match.
pub fn merge_yaml(a: Value, b: Value) -> Result<Value, Error> {
    #[allow(clippy::match_same_arms)]
    match (a, b) {
        (Value::Mapping(mut a), Value::Mapping(b)) => {
            let mut r = Mapping::new();
            for (k, vb) in b {
                let va = a.remove(k.clone()).unwrap_or(Value::Null);
                if !vb.is_null() {
                    r.insert(k, merge_yaml(va, vb)?);
                }
            }
            for (k, va) in a {
                if !va.is_null() {
                    r.insert(k, va);
                }
            }
            Ok(Value::Mapping(r))
        }
        (Value::Sequence(a), Value::Sequence(b)) => {
            let mut a = a.into_iter();
            let mut r = Vec::new();
            for vb in b {
                let va = a.next().unwrap_or(Value::Null);
                r.push(if vb.is_null() { va } else { merge_yaml(va, vb)? });
            }
            r.extend(a);
            Ok(Value::Sequence(r))
        }
        (Value::Number(_), b @ Value::Number(_)) => Ok(b),
        (Value::String(_), b @ Value::String(_)) => Ok(b),
        (Value::Bool(_), b @ Value::Bool(_)) => Ok(b),
        (Value::Null, b) => Ok(b),
        (_, b @ Value::Null) => Ok(b),
        (a, b) => Err(Error::InvalidTypes(
            serde_yml::to_string(&a).unwrap_or_default(),
            serde_yml::to_string(&b).unwrap_or_default(),
        )),
    }
}
