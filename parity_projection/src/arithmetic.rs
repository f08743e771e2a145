//! Arithmetic primitives and payload reading.
//!
//! All numeric values: i64. No float reaches the state.

use serde_json::Value;

use crate::error::PayloadDefect;
use crate::events::EventEnvelope;

/// Checked integer addition. `None` on i64 overflow.
pub fn checked_add(a: i64, b: i64) -> Option<i64> {
    a.checked_add(b)
}

/// Read `event.data.age` as an i64.
///
/// Integral floats (`4.0`) are accepted, fractional ones are not.
pub fn read_age(event: &EventEnvelope) -> Result<i64, PayloadDefect> {
    let data = event.data.as_ref().ok_or(PayloadDefect::MissingData)?;
    let fields = data.as_object().ok_or(PayloadDefect::DataNotObject)?;
    let age = fields.get("age").ok_or(PayloadDefect::MissingAge)?;
    numeric_age(age)
}

fn numeric_age(age: &Value) -> Result<i64, PayloadDefect> {
    let n = match age {
        Value::Number(n) => n,
        other => return Err(PayloadDefect::NonNumericAge(other.to_string())),
    };
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if n.is_u64() {
        return Err(PayloadDefect::AgeOutOfRange(n.to_string()));
    }
    match n.as_f64() {
        Some(f) if f.fract() != 0.0 => Err(PayloadDefect::FractionalAge(n.to_string())),
        // i64::MIN is exactly representable; i64::MAX rounds up to 2^63.
        Some(f) if f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 => {
            Ok(f as i64)
        }
        _ => Err(PayloadDefect::AgeOutOfRange(n.to_string())),
    }
}
