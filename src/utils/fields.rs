//! Ordered candidate-field lookup for heterogeneous upstream payloads.
//!
//! Upstream model families report the same logical value under different keys
//! (`reasoning` vs `reasoning_content`, `prompt_tokens` vs `input_tokens`, ...).
//! Every logical value is resolved from an explicit, ordered candidate list:
//! the first candidate that is present (and not `null`) wins.
//!
//! Paths use dot notation (`prompt_tokens_details.cached_tokens`); numeric
//! segments index into arrays (`choices.0.delta`).

use serde_json::Value;

/// Path lookup over `serde_json::Value` with `null` treated as absent.
pub struct FieldLookup;

impl FieldLookup {
    /// Resolve a dot-notation path. Returns `None` for missing keys and `null` leaves.
    pub fn get_path<'a>(obj: &'a Value, path: &str) -> Option<&'a Value> {
        if path.is_empty() {
            return None;
        }

        let mut current = obj;
        for part in path.split('.') {
            if part.is_empty() {
                return None;
            }
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// First present value among `candidates`, in order.
    pub fn first_present<'a>(obj: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
        candidates.iter().find_map(|path| Self::get_path(obj, path))
    }

    /// First candidate holding a string.
    pub fn first_str<'a>(obj: &'a Value, candidates: &[&str]) -> Option<&'a str> {
        candidates
            .iter()
            .find_map(|path| Self::get_path(obj, path).and_then(Value::as_str))
    }

    /// First candidate holding a non-negative integral count.
    ///
    /// Floats with no fractional part (`10.0`) are accepted; anything else is skipped
    /// so the next candidate gets a chance.
    pub fn first_count(obj: &Value, candidates: &[&str]) -> Option<u64> {
        candidates
            .iter()
            .find_map(|path| Self::get_path(obj, path).and_then(as_count))
    }

    /// First candidate holding a finite number.
    pub fn first_number(obj: &Value, candidates: &[&str]) -> Option<f64> {
        candidates.iter().find_map(|path| {
            Self::get_path(obj, path)
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite())
        })
    }
}

fn as_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}
