//! Lenient conversions for inbound JSON values.
//!
//! Firmware sends numbers as JSON numbers, numeric strings or booleans
//! depending on model and version. None of these helpers fail: anything that
//! cannot be read as a number yields the caller's default.

use serde_json::Value;

/// Float first, then integer, then `default`
pub fn num(v: &Value, default: f64) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(default),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(f) = s.parse::<f64>() {
                f
            } else if let Ok(i) = s.parse::<i64>() {
                i as f64
            } else {
                default
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => default,
    }
}

/// Truncating integer conversion, `default` on failure or non-finite input
pub fn int(v: &Value, default: i64) -> i64 {
    opt_int(v).unwrap_or(default)
}

/// `null` and unreadable values map to `None`
pub fn opt_int(v: &Value) -> Option<i64> {
    match v {
        Value::Null => None,
        _ => v.as_i64().or_else(|| {
            let f = num(v, f64::NAN);
            f.is_finite().then(|| f as i64)
        }),
    }
}

pub fn string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn opt_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        other => Some(string(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn num_accepts_numeric_like_input() {
        assert_eq!(num(&json!(21.5), 0.0), 21.5);
        assert_eq!(num(&json!(7), 0.0), 7.0);
        assert_eq!(num(&json!(" 210.25 "), 0.0), 210.25);
        assert_eq!(num(&json!("42"), 0.0), 42.0);
        assert_eq!(num(&json!(true), 0.0), 1.0);
    }

    #[test]
    fn num_falls_back_to_default() {
        assert_eq!(num(&json!("hot"), 350.0), 350.0);
        assert_eq!(num(&json!(null), 120.0), 120.0);
        assert_eq!(num(&json!([1, 2]), 3.0), 3.0);
        assert_eq!(num(&json!({"v": 1}), 3.0), 3.0);
    }

    #[test]
    fn int_truncates_floats_and_strings() {
        assert_eq!(int(&json!(12.9), 0), 12);
        assert_eq!(int(&json!("3600"), 0), 3600);
        assert_eq!(int(&json!("3600.7"), 0), 3600);
        assert_eq!(int(&json!("n/a"), -1), -1);
    }

    #[test]
    fn opt_int_keeps_null() {
        assert_eq!(opt_int(&json!(null)), None);
        assert_eq!(opt_int(&json!("x")), None);
        assert_eq!(opt_int(&json!(5)), Some(5));
        assert_eq!(opt_int(&json!("5")), Some(5));
    }

    #[test]
    fn strings() {
        assert_eq!(string(&json!("PLA")), "PLA");
        assert_eq!(string(&json!(12)), "12");
        assert_eq!(opt_string(&json!(null)), None);
    }
}
