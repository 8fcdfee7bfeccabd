//! Loose coercions for values arriving from untyped rule configs.

use serde_json::Value;

/// Interpret a config value as an integer. Accepts JSON integers, integral
/// and fractional floats (truncated), and numeric strings.
pub(crate) fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>().ok().or_else(|| t.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Interpret a config value as a float. Accepts JSON numbers and numeric
/// strings.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Collect the integer entries of `config[key]`, dropping everything that
/// does not coerce. A missing or non-array value yields the empty list.
pub(crate) fn int_entries(config: &serde_json::Map<String, Value>, key: &str) -> Vec<i64> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(as_int).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(as_int(&json!(3)), Some(3));
        assert_eq!(as_int(&json!(3.9)), Some(3));
        assert_eq!(as_int(&json!("5")), Some(5));
        assert_eq!(as_int(&json!(" 5 ")), Some(5));
        assert_eq!(as_int(&json!("5.2")), Some(5));
        assert_eq!(as_int(&json!("five")), None);
        assert_eq!(as_int(&json!(true)), None);
        assert_eq!(as_int(&json!(null)), None);
    }

    #[test]
    fn float_coercion() {
        assert_eq!(as_f64(&json!(2.5)), Some(2.5));
        assert_eq!(as_f64(&json!("2.5")), Some(2.5));
        assert_eq!(as_f64(&json!([])), None);
    }

    #[test]
    fn entries_drop_junk() {
        let config = serde_json::from_value(json!({"days": [1, "2", null, "x", 3.0]})).unwrap();
        assert_eq!(int_entries(&config, "days"), vec![1, 2, 3]);
        assert!(int_entries(&config, "missing").is_empty());
    }
}
