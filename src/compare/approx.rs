use serde_json::Value;

/// Absolute floor of the comparison tolerance.
pub const TOLERANCE_FLOOR: f64 = 1e-6;

/// Tolerance relative to the magnitude of the expected value.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// `max(1e-6, |expected| * 1e-6)`.
pub fn tolerance(expected: f64) -> f64 {
    TOLERANCE_FLOOR.max(expected.abs() * RELATIVE_TOLERANCE)
}

pub fn approx_eq(expected: f64, actual: f64) -> bool {
    if expected == actual {
        return true;
    }
    (expected - actual).abs() <= tolerance(expected)
}

/// Structural match of two JSON values. Integers, strings, booleans and
/// nulls compare exactly; other numbers within [`tolerance`]. Object key
/// order is irrelevant, array order is not.
pub fn json_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => {
            if e.is_f64() || a.is_f64() {
                match (e.as_f64(), a.as_f64()) {
                    (Some(e), Some(a)) => approx_eq(e, a),
                    _ => false,
                }
            } else {
                e == a
            }
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| json_match(e, a))
        }
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter().all(|(key, e)| a.get(key).is_some_and(|a| json_match(e, a)))
        }
        _ => expected == actual,
    }
}
