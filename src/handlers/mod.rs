pub mod assignments;
pub mod auth;
pub mod discussion;
pub mod resources;
pub mod students;
pub mod weeks;

use serde_json::Value;

/// Parse a numeric database id that callers may send as a JSON number or a
/// digit string.
pub(crate) fn numeric_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Same, for an id arriving as a raw query-string value.
pub(crate) fn numeric_id_str(value: Option<&str>) -> Option<i64> {
    let s = value?.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_accepts_numbers_and_digit_strings() {
        assert_eq!(numeric_id(Some(&json!(7))), Some(7));
        assert_eq!(numeric_id(Some(&json!("42"))), Some(42));
        assert_eq!(numeric_id(Some(&json!("7a"))), None);
        assert_eq!(numeric_id(Some(&json!(-3))), None);
        assert_eq!(numeric_id(Some(&json!(null))), None);
        assert_eq!(numeric_id(None), None);
    }

    #[test]
    fn numeric_id_str_rejects_non_digits() {
        assert_eq!(numeric_id_str(Some("19")), Some(19));
        assert_eq!(numeric_id_str(Some(" 19 ")), Some(19));
        assert_eq!(numeric_id_str(Some("19; DROP TABLE")), None);
        assert_eq!(numeric_id_str(Some("")), None);
        assert_eq!(numeric_id_str(None), None);
    }
}
