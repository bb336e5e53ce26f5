//! Conversion from raw backend rows into [`ScheduleRecord`]s
//!
//! Rows come either from a Supabase table (lowercase, snake_case keys) or from a spreadsheet (capitalized keys).
//! A [`KeyMapping`] tells the [`Normalizer`] which spelling to look for.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::schedule::{ScheduleId, ScheduleRecord};

/// Stands for a participant entry that was not a string
pub const INVALID_PARTICIPANT: &str = "<invalid participant>";

/// Where to find each field in a raw row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    /// `None` for sources that have no notion of id (e.g. spreadsheets)
    pub id: Option<String>,
    pub institution: String,
    pub subject: String,
    pub date: String,
    pub participants: String,
}

impl KeyMapping {
    /// Rows of the Supabase `schedules` table
    pub fn supabase() -> Self {
        Self {
            id: Some("id".to_string()),
            institution: "institusi".to_string(),
            subject: "mata_pelajaran".to_string(),
            date: "tanggal".to_string(),
            participants: "peserta".to_string(),
        }
    }

    /// Spreadsheet rows, as produced by [`crate::store::sheet`]
    pub fn sheet() -> Self {
        Self {
            id: None,
            institution: "Institusi".to_string(),
            subject: "Mata_Pelajaran".to_string(),
            date: "Tanggal".to_string(),
            participants: "Peserta".to_string(),
        }
    }
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self::supabase()
    }
}


/// Why a raw row did not make it into the canonical set
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
    NotAnObject,
    MissingInstitution,
    MissingSubject,
    MissingDate,
    InvalidDate(String),
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NotAnObject => write!(f, "not a JSON object"),
            RejectReason::MissingInstitution => write!(f, "missing institution"),
            RejectReason::MissingSubject => write!(f, "missing subject"),
            RejectReason::MissingDate => write!(f, "missing date"),
            RejectReason::InvalidDate(d) => write!(f, "invalid date {:?}", d),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Position of the row in the input
    pub index: usize,
    pub reason: RejectReason,
}

/// The outcome of a normalization pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizeReport {
    pub records: Vec<ScheduleRecord>,
    pub rejections: Vec<Rejection>,
}

impl NormalizeReport {
    /// How many rows were skipped
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}



/// Turns loosely-typed rows into schedules
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    mapping: KeyMapping,
}

impl Normalizer {
    pub fn new(mapping: KeyMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    /// Normalize every row.
    ///
    /// Invalid rows never stop the process: they are skipped, logged, and counted in the returned report
    pub fn normalize(&self, rows: &[Value]) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        for (index, row) in rows.iter().enumerate() {
            match self.normalize_one(row) {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    log::warn!("Skipping schedule row #{}: {}", index, reason);
                    report.rejections.push(Rejection { index, reason });
                },
            }
        }

        log::debug!("Normalized {} rows ({} rejected)", rows.len(), report.rejected());
        report
    }

    /// Normalize a single row
    pub fn normalize_one(&self, row: &Value) -> Result<ScheduleRecord, RejectReason> {
        let object = match row {
            Value::Object(o) => o,
            _ => return Err(RejectReason::NotAnObject),
        };

        let institution = text_field(object, &self.mapping.institution).ok_or(RejectReason::MissingInstitution)?;
        let subject = text_field(object, &self.mapping.subject).ok_or(RejectReason::MissingSubject)?;
        let raw_date = text_field(object, &self.mapping.date).ok_or(RejectReason::MissingDate)?;
        let date = match parse_date(&raw_date) {
            Some(d) => d,
            None => return Err(RejectReason::InvalidDate(raw_date)),
        };
        let participants = parse_participants(lookup(object, &self.mapping.participants));

        let id = self.mapping.id.as_ref()
            .and_then(|key| lookup(object, key))
            .and_then(ScheduleId::from_json);

        Ok(ScheduleRecord::new(id, institution, subject, date, participants))
    }
}


/// Find a key, with an exact match first, then ignoring ASCII case
fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key) {
        return Some(value);
    }
    object.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// A trimmed, non-empty text field. Numbers are accepted by their textual form (spreadsheets may produce them)
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match lookup(object, key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a calendar day.
///
/// Supported formats are `YYYY-MM-DD`, RFC 3339 timestamps (their UTC day is kept), naive `YYYY-MM-DDTHH:MM:SS` timestamps and `DD/MM/YYYY` (spreadsheet cells)
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%d/%m/%Y") {
        return Some(d);
    }
    None
}

/// Coerce whatever the source stored as participants into a list of names
pub fn parse_participants(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            items.iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => {
                        log::debug!("Participant {} is not a string", other);
                        INVALID_PARTICIPANT.to_string()
                    },
                })
                .filter(|name| name.is_empty() == false)
                .collect()
        },
        Some(Value::String(s)) => split_participants(s),
        Some(other) => {
            log::warn!("Unexpected participants value {}. Ignoring it", other);
            Vec::new()
        },
    }
}

/// Split a comma-separated list of names. Line breaks are turned into spaces first
pub fn split_participants(text: &str) -> Vec<String> {
    let flattened = text
        .replace("\r\n", " ")
        .replace(|c: char| c == '\n' || c == '\r', " ")
        .replace("<br>", " ")
        .replace("<br/>", " ")
        .replace("<br />", " ");

    flattened.split(',')
        .map(|name| name.trim())
        .filter(|name| name.is_empty() == false)
        .map(|name| name.to_string())
        .collect()
}
