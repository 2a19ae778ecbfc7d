use serde_json::{Number, Value};

/// Structural equality of two JSON values
///
/// Arrays are order sensitive, objects compare by key set regardless of key
/// order, and numbers compare by value so `2` equals `2.0`. Floats use exact
/// equality.
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (as_integer(a), as_integer(b)) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arrays_are_order_sensitive() {
        assert!(values_equal(&json!([0, 1]), &json!([0, 1])));
        assert!(!values_equal(&json!([1, 0]), &json!([0, 1])));
        assert!(!values_equal(&json!([0, 1, 2]), &json!([0, 1])));
    }

    #[test]
    fn test_objects_ignore_key_order() {
        let actual: Value = serde_json::from_str(r#"{"b": 2, "a": [1, {"y": null, "x": 1}]}"#).unwrap();
        let expected: Value = serde_json::from_str(r#"{"a": [1, {"x": 1, "y": null}], "b": 2}"#).unwrap();
        assert!(values_equal(&actual, &expected));
    }

    #[test]
    fn test_null_differs_from_missing_key() {
        assert!(!values_equal(&json!({"a": 1, "b": null}), &json!({"a": 1})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": null})));
        assert!(!values_equal(&json!({"a": null}), &json!({"b": null})));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert!(values_equal(&json!(-7), &json!(-7)));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_equal(&json!(0.1 + 0.2), &json!(0.3)));
        assert!(!values_equal(&json!(1), &json!(true)));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_scalars() {
        assert!(values_equal(&Value::Null, &Value::Null));
        assert!(values_equal(&json!(true), &json!(true)));
        assert!(!values_equal(&json!(true), &json!(false)));
        assert!(!values_equal(&Value::Null, &json!(false)));
        assert!(values_equal(&json!("abc"), &json!("abc")));
    }
}
