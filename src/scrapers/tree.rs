use serde_json::Value;

/// Follow a chain of list indices.
pub fn at<'a>(node: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter()
        .try_fold(node, |current, &idx| current.as_array()?.get(idx))
}

/// Non-empty string at `path`.
pub fn str_at(node: &Value, path: &[usize]) -> Option<String> {
    at(node, path)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// List at `path`, or an empty slice.
pub fn list_at<'a>(node: &'a Value, path: &[usize]) -> &'a [Value] {
    at(node, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Read a payload rating. Only a JSON number counts; strings and lists at the
/// rating position are treated as absent.
///
/// The value is rounded to the nearest integer. Values that cannot be held in
/// a `u8` (negative, huge, NaN) are treated as absent; anything else is kept
/// even when it is outside 1-5.
pub fn parse_stars(node: &Value) -> Option<u8> {
    round_rating(node.as_f64()?)
}

/// Parse the leading numeric token of a label such as `"4,0 bintang"`.
pub fn leading_number(label: &str) -> Option<f64> {
    let token = label.split_whitespace().next()?;
    let numeric: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    numeric.parse().ok()
}

pub(crate) fn round_rating(value: f64) -> Option<u8> {
    let rounded = value.round();
    if rounded.is_finite() && (0.0..=f64::from(u8::MAX)).contains(&rounded) {
        Some(rounded as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn at_walks_nested_lists() {
        let tree = json!([0, [1, [2, "deep"]]]);
        assert_eq!(at(&tree, &[1, 1, 1]), Some(&json!("deep")));
        assert_eq!(at(&tree, &[]), Some(&tree));
    }

    #[test]
    fn at_survives_wrong_shapes() {
        let tree = json!([null, "text", {"k": 1}]);
        assert_eq!(at(&tree, &[0, 0]), None);
        assert_eq!(at(&tree, &[1, 0]), None);
        assert_eq!(at(&tree, &[2, 0]), None);
        assert_eq!(at(&tree, &[9]), None);
    }

    #[test]
    fn str_at_ignores_blank_and_non_strings() {
        let tree = json!(["  ", 5, " Ana "]);
        assert_eq!(str_at(&tree, &[0]), None);
        assert_eq!(str_at(&tree, &[1]), None);
        assert_eq!(str_at(&tree, &[2]).as_deref(), Some("Ana"));
    }

    #[test]
    fn list_at_defaults_to_empty() {
        let tree = json!([[1, 2], "x"]);
        assert_eq!(list_at(&tree, &[0]).len(), 2);
        assert!(list_at(&tree, &[1]).is_empty());
        assert!(list_at(&tree, &[4, 4]).is_empty());
    }

    #[test]
    fn stars_from_numbers() {
        assert_eq!(parse_stars(&json!(4)), Some(4));
        assert_eq!(parse_stars(&json!(4.6)), Some(5));
        assert_eq!(parse_stars(&json!(7)), Some(7));
        assert_eq!(parse_stars(&json!(-1)), None);
    }

    #[test]
    fn stars_ignore_strings_and_lists() {
        assert_eq!(parse_stars(&json!("3 weeks ago edited")), None);
        assert_eq!(parse_stars(&json!("4")), None);
        assert_eq!(parse_stars(&json!([null, [2]])), None);
        assert_eq!(parse_stars(&json!(null)), None);
    }

    #[test]
    fn leading_number_reads_labels() {
        assert_eq!(leading_number("4 stars"), Some(4.0));
        assert_eq!(leading_number("4,0 bintang"), Some(4.0));
        assert_eq!(leading_number("3.5"), Some(3.5));
        assert_eq!(leading_number("five stars"), None);
        assert_eq!(leading_number(""), None);
    }
}
