use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::nav::NavError;

/// Navigation parameters handed to a screen for one request.
///
/// Values are stored as JSON so that any serializable type can travel
/// through navigation and be read back with [`Params::param`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a value that fails to serialize is stored as null
    pub fn with<V: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &V) -> Self {
        let key = key.into();
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            log::warn!("Parameter '{}' could not be serialized, storing null: {}", key, e);
            Value::Null
        });
        self.values.insert(key, value);
        self
    }

    /// Insert a value, replacing any previous value under the same key
    pub fn insert<V: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &V) -> Result<(), NavError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| NavError::ParamEncoding {
            key: key.clone(),
            source,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Insert an already-encoded value
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Read a parameter as `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and a type-conversion error
    /// when the stored value cannot be viewed as `T`.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, NavError> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };

        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| NavError::TypeConversion {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                source,
            })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Compare two optional maps, treating an empty map as equal to an absent one
    pub fn equivalent(left: Option<&Params>, right: Option<&Params>) -> bool {
        let empty = Params::default();
        left.unwrap_or(&empty) == right.unwrap_or(&empty)
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Conversion into a navigation parameter map.
///
/// Implemented for `Params`, `()`, `Option<Params>`, JSON objects, and any
/// struct using `#[derive(NavParams)]`.
pub trait IntoParams {
    fn into_params(self) -> Result<Params, NavError>;
}

impl IntoParams for Params {
    fn into_params(self) -> Result<Params, NavError> {
        Ok(self)
    }
}

impl IntoParams for () {
    fn into_params(self) -> Result<Params, NavError> {
        Ok(Params::new())
    }
}

impl IntoParams for Option<Params> {
    fn into_params(self) -> Result<Params, NavError> {
        Ok(self.unwrap_or_default())
    }
}

impl IntoParams for serde_json::Map<String, Value> {
    fn into_params(self) -> Result<Params, NavError> {
        Ok(self.into_iter().collect())
    }
}

/// How a revisited screen's parameters compare with the ones it was last shown with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisitMode {
    SameParams,
    NewParams,
}

impl RevisitMode {
    pub fn between(previous: &Params, next: &Params) -> Self {
        if Params::equivalent(Some(previous), Some(next)) {
            RevisitMode::SameParams
        } else {
            RevisitMode::NewParams
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_reads_compatible_value() {
        let params = Params::new().with("id", &42).with("name", "Ada");
        assert_eq!(params.param::<i64>("id").unwrap(), Some(42));
        assert_eq!(params.param::<String>("name").unwrap(), Some("Ada".to_string()));
        assert_eq!(params.param::<i64>("missing").unwrap(), None);
    }

    #[test]
    fn test_param_string_as_number_is_type_conversion() {
        let params = Params::new().with("x", "not a number");
        let err = params.param::<i64>("x").unwrap_err();
        assert!(matches!(err, NavError::TypeConversion { ref key, .. } if key == "x"));
    }

    #[test]
    fn test_empty_equals_absent() {
        assert!(Params::equivalent(None, Some(&Params::new())));
        assert!(Params::equivalent(Some(&Params::new()), None));
        assert!(!Params::equivalent(None, Some(&Params::new().with("a", &1))));
    }

    #[test]
    fn test_revisit_mode() {
        let a1 = Params::new().with("a", &1);
        let a1_again = Params::new().with("a", &1);
        let a2 = Params::new().with("a", &2);
        assert_eq!(RevisitMode::between(&a1, &a1_again), RevisitMode::SameParams);
        assert_eq!(RevisitMode::between(&a1, &a2), RevisitMode::NewParams);
    }

    #[test]
    fn test_json_object_into_params() {
        let Value::Object(map) = json!({"a": 1, "b": [1, 2]}) else {
            unreachable!()
        };
        let params = map.into_params().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.param::<Vec<u8>>("b").unwrap(), Some(vec![1, 2]));
    }
}
