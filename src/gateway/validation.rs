//! Checks the shape of request payloads.
//!
//! Checks run one at a time, and the first failure is reported.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::schedule::{ScheduleDraft, ScheduleId};

fn invalid(message: &str) -> GatewayError {
    GatewayError::Validation(message.to_string())
}

/// Parse a request body that must be a JSON object
pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(invalid("Request body is empty."));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid("Request body must be a JSON object.")),
        Err(_) => Err(invalid("Invalid JSON in request body.")),
    }
}

fn non_empty_string(fields: &Map<String, Value>, key: &str) -> Result<String, GatewayError> {
    match fields.get(key).and_then(Value::as_str).map(str::trim) {
        Some(text) if text.is_empty() == false => Ok(text.to_string()),
        _ => Err(invalid(&format!("Missing or invalid '{}'.", key))),
    }
}

/// Whether a text is exactly `YYYY-MM-DD`, and an actual calendar date
fn iso_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if well_formed == false {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Validate the fields of a schedule (the body of a create request, or the `data` of an update request)
pub fn schedule_fields(fields: &Map<String, Value>) -> Result<ScheduleDraft, GatewayError> {
    let institution = non_empty_string(fields, "institusi")?;
    let subject = non_empty_string(fields, "mata_pelajaran")?;

    let date = fields.get("tanggal")
        .and_then(Value::as_str)
        .and_then(|text| iso_date(text.trim()))
        .ok_or_else(|| invalid("Missing or invalid 'tanggal' (must be YYYY-MM-DD string)."))?;

    let participants = match fields.get("peserta") {
        Some(Value::Array(items)) => items.iter()
            .map(|item| item.as_str().map(str::trim))
            .collect::<Option<Vec<&str>>>()
            .ok_or_else(|| invalid("Missing or invalid 'peserta' (must be an array of strings)."))?
            .into_iter()
            .filter(|name| name.is_empty() == false)
            .map(String::from)
            .collect(),
        _ => return Err(invalid("Missing or invalid 'peserta' (must be an array of strings).")),
    };

    Ok(ScheduleDraft { institution, subject, date, participants })
}

/// Validate the body of an update request: `{id, data: {...}}`
pub fn update_body(body: &Map<String, Value>) -> Result<(ScheduleId, ScheduleDraft), GatewayError> {
    let id = body.get("id")
        .and_then(ScheduleId::from_json)
        .ok_or_else(|| invalid("Missing or invalid 'id'."))?;
    let data = body.get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Missing or invalid 'data' object."))?;
    Ok((id, schedule_fields(data)?))
}

/// Read the target of a delete request, from its `?id=` query parameter
pub fn delete_target(query: &HashMap<String, String>) -> Result<ScheduleId, GatewayError> {
    query.get("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| invalid("Missing 'id' query parameter."))
}


#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn message(err: GatewayError) -> String {
        err.to_string()
    }

    #[test]
    fn bodies() {
        assert_eq!(message(parse_body(b"").unwrap_err()), "Bad Request: Request body is empty.");
        assert_eq!(message(parse_body(b"  \n").unwrap_err()), "Bad Request: Request body is empty.");
        assert_eq!(message(parse_body(b"{oops").unwrap_err()), "Bad Request: Invalid JSON in request body.");
        assert_eq!(message(parse_body(b"[1, 2]").unwrap_err()), "Bad Request: Request body must be a JSON object.");
        assert!(parse_body(br#"{"a": 1}"#).is_ok());
    }

    #[test]
    fn valid_schedule() {
        let draft = schedule_fields(&fields(json!({
            "institusi": " SMA 1 ",
            "mata_pelajaran": "Matematika",
            "tanggal": "2099-01-01",
            "peserta": [" Ani", "", "Budi "],
        }))).unwrap();
        assert_eq!(draft.institution, "SMA 1");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());
        assert_eq!(draft.participants, vec!["Ani", "Budi"]);
    }

    #[test]
    fn first_failure_wins() {
        let err = schedule_fields(&fields(json!({ "institusi": "  ", "tanggal": "nope" }))).unwrap_err();
        assert_eq!(message(err), "Bad Request: Missing or invalid 'institusi'.");

        let err = schedule_fields(&fields(json!({ "institusi": "SMA 1", "mata_pelajaran": 3 }))).unwrap_err();
        assert_eq!(message(err), "Bad Request: Missing or invalid 'mata_pelajaran'.");

        for date in ["01/01/2099", "2099-1-1", "2099-02-30", "2099-01-01T00:00:00Z"] {
            let err = schedule_fields(&fields(json!({
                "institusi": "SMA 1", "mata_pelajaran": "Fisika", "tanggal": date, "peserta": [],
            }))).unwrap_err();
            assert_eq!(message(err), "Bad Request: Missing or invalid 'tanggal' (must be YYYY-MM-DD string).", "{}", date);
        }

        for participants in [json!("Ani, Budi"), json!(["Ani", 4]), json!(null)] {
            let err = schedule_fields(&fields(json!({
                "institusi": "SMA 1", "mata_pelajaran": "Fisika", "tanggal": "2099-01-01", "peserta": participants,
            }))).unwrap_err();
            assert_eq!(message(err), "Bad Request: Missing or invalid 'peserta' (must be an array of strings).");
        }
    }

    #[test]
    fn update_and_delete_targets() {
        let data = json!({ "institusi": "SMA 1", "mata_pelajaran": "Fisika", "tanggal": "2099-01-01", "peserta": [] });

        let (id, _) = update_body(&fields(json!({ "id": "12", "data": data }))).unwrap();
        assert_eq!(id, ScheduleId::Int(12));
        assert_eq!(message(update_body(&fields(json!({ "data": data }))).unwrap_err()), "Bad Request: Missing or invalid 'id'.");
        assert_eq!(message(update_body(&fields(json!({ "id": 1, "data": [] }))).unwrap_err()), "Bad Request: Missing or invalid 'data' object.");

        let mut query = HashMap::new();
        assert!(delete_target(&query).is_err());
        query.insert("id".to_string(), " ".to_string());
        assert!(delete_target(&query).is_err());
        query.insert("id".to_string(), "abc-1".to_string());
        assert_eq!(delete_target(&query).unwrap(), ScheduleId::Text("abc-1".to_string()));
    }
}
