//! Assertions used by scenarios. Every failure is an
//! [`Err::EquivalenceMismatch`] carrying both sides as pretty-printed JSON.

use serde::Serialize;
use serde_json::Value;

use crate::compare::approx::{approx_eq, json_match};
use crate::compare::Err;
use crate::core::document::Document;

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Builds the mismatch error for `what`.
pub fn mismatch<E: Serialize + ?Sized, A: Serialize + ?Sized>(what: &str, expected: &E, actual: &A) -> Err {
    Err::EquivalenceMismatch {
        what: what.to_string(),
        expected: pretty(&to_json(expected)),
        actual: pretty(&to_json(actual)),
    }
}

/// Exact equality, for discrete values such as names, indices and modes.
pub fn expect_eq<T: PartialEq + Serialize + ?Sized>(what: &str, expected: &T, actual: &T) -> Result<(), Err> {
    if expected == actual {
        Ok(())
    } else {
        Err(mismatch(what, expected, actual))
    }
}

pub fn expect_approx(what: &str, expected: f64, actual: f64) -> Result<(), Err> {
    if approx_eq(expected, actual) {
        Ok(())
    } else {
        Err(mismatch(what, &expected, &actual))
    }
}

/// Component-wise [`expect_approx`]; the lengths must agree.
pub fn expect_approx_slice<T>(what: &str, expected: &[T], actual: &[T]) -> Result<(), Err>
where
    T: Copy + Into<f64> + Serialize,
{
    let matches = expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(&e, &a)| approx_eq(e.into(), a.into()));
    if matches {
        Ok(())
    } else {
        Err(mismatch(what, expected, actual))
    }
}

pub fn expect_count(what: &str, expected: usize, actual: usize) -> Result<(), Err> {
    expect_eq(what, &expected, &actual)
}

/// Checks that `extension` is (or is not) listed in `extensionsUsed`.
pub fn expect_extension(document: &Document, extension: &str, present: bool) -> Result<(), Err> {
    if document.uses_extension(extension) == present {
        return Ok(());
    }
    let what = if present {
        format!("extension {} to be used", extension)
    } else {
        format!("extension {} to be absent", extension)
    };
    Err(mismatch(&what, &present, &document.extensions_used))
}

/// Structural match with float tolerance, see [`json_match`].
pub fn expect_match<T: Serialize + ?Sized>(what: &str, expected: &T, actual: &T) -> Result<(), Err> {
    let (expected, actual) = (to_json(expected), to_json(actual));
    if json_match(&expected, &actual) {
        Ok(())
    } else {
        Err(Err::EquivalenceMismatch {
            what: what.to_string(),
            expected: pretty(&expected),
            actual: pretty(&actual),
        })
    }
}
