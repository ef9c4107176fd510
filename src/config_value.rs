use serde_json::Value;

/// Typed accessors over the dynamic `config` / `submission_data` JSON maps.
///
/// Quest configs are open key/value payloads (stored as JSONB), so every read
/// goes through one of these helpers and reports a missing or mistyped field
/// as a plain message instead of panicking.

pub fn str_field<'a>(data: &'a Value, key: &str) -> Result<&'a str, String> {
    match data.get(key) {
        None | Some(Value::Null) => Err(format!("field `{}` is required", key)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(format!("field `{}` must be a string", key)),
    }
}

pub fn non_empty_str_field<'a>(data: &'a Value, key: &str) -> Result<&'a str, String> {
    let s = str_field(data, key)?;
    if s.trim().is_empty() {
        return Err(format!("field `{}` must not be empty", key));
    }
    Ok(s)
}

pub fn array_field<'a>(data: &'a Value, key: &str) -> Result<&'a Vec<Value>, String> {
    match data.get(key) {
        None | Some(Value::Null) => Err(format!("field `{}` is required", key)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(format!("field `{}` must be an array", key)),
    }
}

pub fn u64_field(data: &Value, key: &str) -> Result<u64, String> {
    match data.get(key) {
        None | Some(Value::Null) => Err(format!("field `{}` is required", key)),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| format!("field `{}` must be a non-negative number", key)),
    }
}

/// Like `u64_field` but an absent field is fine; only a mistyped one errors.
pub fn opt_u64_field(data: &Value, key: &str) -> Result<Option<u64>, String> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("field `{}` must be a non-negative number", key)),
    }
}

pub fn string_list_field(data: &Value, key: &str) -> Result<Vec<String>, String> {
    let items = array_field(data, key)?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| format!("field `{}` must be an array of strings", key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_missing_and_mistyped_fields() {
        let data = json!({ "username": "vybe", "count": 3, "flag": true });

        assert_eq!(str_field(&data, "username"), Ok("vybe"));
        assert_eq!(
            str_field(&data, "handle"),
            Err("field `handle` is required".to_string())
        );
        assert_eq!(
            str_field(&data, "count"),
            Err("field `count` must be a string".to_string())
        );
        assert_eq!(u64_field(&data, "count"), Ok(3));
        assert!(u64_field(&data, "flag").is_err());
    }

    #[test]
    fn optional_field_ignores_absence_but_not_type() {
        let data = json!({ "min_watch_time": "ten" });
        assert_eq!(opt_u64_field(&data, "missing"), Ok(None));
        assert!(opt_u64_field(&data, "min_watch_time").is_err());
    }

    #[test]
    fn non_object_payload_reads_as_all_missing() {
        let data = json!("not an object");
        assert!(str_field(&data, "anything").is_err());
    }

    #[test]
    fn string_list_rejects_mixed_arrays() {
        let data = json!({ "tags": ["#vybe", 7] });
        assert!(string_list_field(&data, "tags").is_err());
        let ok = json!({ "tags": ["#vybe"] });
        assert_eq!(string_list_field(&ok, "tags"), Ok(vec!["#vybe".to_string()]));
    }
}
