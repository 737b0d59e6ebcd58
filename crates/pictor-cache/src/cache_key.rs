//! Deterministic fingerprints for transformation requests

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult, Write};
use uuid::Uuid;

const KEY_PREFIX: &str = "pictor:transform";
const KEY_VERSION: &str = "v1";
/// Stands in for "keep the source format"
const NO_FORMAT: &str = "__source__";
/// Largest magnitude below which every integral f64 is exact
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Fingerprint of (source image, ordered chain, target format)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key_hash: String,
    canonical: String,
}

impl CacheKey {
    /// Store key, `pictor:transform:<sha256 hex>`
    pub fn as_str(&self) -> &str {
        &self.key_hash
    }

    /// The pre-hash canonical form, useful when debugging misses
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.key_hash)
    }
}

/// Builds [`CacheKey`]s from raw task data.
///
/// Parameter maps are written with keys in sorted order at every depth, so
/// `{"x":1,"y":2}` and `{"y":2,"x":1}` fingerprint identically, while the
/// order of the steps themselves is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the chain cannot be put in canonical form; callers then
    /// skip the cache for this request.
    pub fn generate(
        &self,
        source_image_id: Uuid,
        transformations: &[Value],
        format: Option<&str>,
    ) -> Option<CacheKey> {
        let mut canonical = String::with_capacity(128);
        let format = format
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| NO_FORMAT.to_string());

        write!(
            canonical,
            "{}|source={}|format={}|steps=[",
            KEY_VERSION, source_image_id, format
        )
        .ok()?;

        for (index, descriptor) in transformations.iter().enumerate() {
            if index > 0 {
                canonical.push(',');
            }
            write_step(&mut canonical, descriptor)?;
        }
        canonical.push(']');

        let digest = Sha256::digest(canonical.as_bytes());
        Some(CacheKey {
            key_hash: format!("{}:{}", KEY_PREFIX, hex::encode(digest)),
            canonical,
        })
    }
}

/// One `{operation, params}` descriptor. Anything else has no canonical form.
fn write_step(out: &mut String, descriptor: &Value) -> Option<()> {
    let object = descriptor.as_object()?;
    let operation = object.get("operation")?.as_str()?;

    out.push_str("{\"operation\":");
    write_canonical(out, &Value::String(operation.trim().to_lowercase()))?;
    out.push_str(",\"params\":");
    match object.get("params") {
        None | Some(Value::Null) => out.push_str("{}"),
        Some(params @ Value::Object(_)) => write_canonical(out, params)?,
        Some(_) => return None,
    }
    out.push('}');
    Some(())
}

/// JSON with object keys sorted, independent of the map's own ordering.
fn write_canonical(out: &mut String, value: &Value) -> Option<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).ok()?);
                out.push(':');
                write_canonical(out, map.get(key)?)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(out, item)?;
            }
            out.push(']');
        }
        Value::Number(number) => write_number(out, number)?,
        scalar => out.push_str(&serde_json::to_string(scalar).ok()?),
    }
    Some(())
}

/// `50`, `50.0` and `5e1` all mean the same parameter value.
fn write_number(out: &mut String, number: &serde_json::Number) -> Option<()> {
    if number.is_f64() {
        let value = number.as_f64()?;
        if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
            write!(out, "{}", value as i64).ok()?;
            return Some(());
        }
    }
    out.push_str(&number.to_string());
    Some(())
}
