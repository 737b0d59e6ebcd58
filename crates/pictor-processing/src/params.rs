//! Typed access to a step's parameter map.

use serde_json::{Map, Value};

use crate::error::TransformError;

/// Borrowed view over the `params` object of one transformation step.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    inner: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(inner: &'a Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.inner.get(name).filter(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Parameters sorted by name.
    pub fn sorted_entries(&self) -> Vec<(&'a str, &'a Value)> {
        let mut entries: Vec<_> = self.inner.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Non-negative integer parameter. Floats with no fractional part are accepted.
    pub fn require_u32(&self, name: &str) -> Result<u32, TransformError> {
        let value = self
            .get(name)
            .ok_or_else(|| TransformError::invalid_param(format!("missing parameter '{}'", name)))?;
        as_u32(name, value)
    }

    pub fn require_f64(&self, name: &str) -> Result<f64, TransformError> {
        let value = self
            .get(name)
            .ok_or_else(|| TransformError::invalid_param(format!("missing parameter '{}'", name)))?;
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TransformError::invalid_param(format!("'{}' must be a number", name)))
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<&'a str>, TransformError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(TransformError::invalid_param(format!(
                "'{}' must be a string",
                name
            ))),
        }
    }

    /// First string parameter found under any of `names`.
    pub fn first_str(&self, names: &[&str]) -> Result<Option<&'a str>, TransformError> {
        for name in names {
            if let Some(s) = self.optional_str(name)? {
                return Ok(Some(s));
            }
        }
        Ok(None)
    }
}

fn as_u32(name: &str, value: &Value) -> Result<u32, TransformError> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n)
            .map_err(|_| TransformError::invalid_param(format!("'{}' is too large", name)));
    }
    if let Some(n) = value.as_i64() {
        if n < 0 {
            return Err(TransformError::invalid_param(format!(
                "'{}' must not be negative",
                name
            )));
        }
    }
    match value.as_f64() {
        Some(f) if f < 0.0 => Err(TransformError::invalid_param(format!(
            "'{}' must not be negative",
            name
        ))),
        Some(f) if f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(TransformError::invalid_param(format!(
            "'{}' must be a non-negative integer",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_require_u32() {
        let m = map(json!({"a": 10, "b": -1, "c": 2.0, "d": 2.5, "e": "10", "f": null}));
        let p = Params::new(&m);
        assert_eq!(p.require_u32("a").unwrap(), 10);
        assert_eq!(p.require_u32("c").unwrap(), 2);
        assert!(matches!(
            p.require_u32("b"),
            Err(TransformError::InvalidParameter(msg)) if msg.contains("negative")
        ));
        assert!(p.require_u32("d").is_err());
        assert!(p.require_u32("e").is_err());
        assert!(p.require_u32("f").is_err());
        assert!(p.require_u32("missing").is_err());
    }

    #[test]
    fn test_first_str_aliases() {
        let m = map(json!({"watermark_text": "hello"}));
        let p = Params::new(&m);
        assert_eq!(p.first_str(&["text", "watermark_text"]).unwrap(), Some("hello"));

        let m = map(json!({"text": 5}));
        assert!(Params::new(&m).first_str(&["text"]).is_err());
    }
}
