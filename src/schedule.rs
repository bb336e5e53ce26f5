//! Schedules, as displayed on the board

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use chrono::NaiveDate;

/// Label displayed in place of an empty participant list
pub const NO_PARTICIPANTS: &str = "no participants";

/// The identifier of a schedule, as handed out by a mutable store.
///
/// Stores use either integer or textual keys. A numeric text is always read as an integer, so that `?id=5` and `{"id": 5}` designate the same schedule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScheduleId {
    Int(i64),
    Text(String),
}

impl ScheduleId {
    /// Read an id from a JSON value (a number or a string). Returns `None` for anything else, or for an empty string
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ScheduleId::Int),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScheduleId::Int(i) => Value::from(*i),
            ScheduleId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl FromStr for ScheduleId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("an id cannot be empty".to_string());
        }
        match s.parse::<i64>() {
            Ok(i) => Ok(ScheduleId::Int(i)),
            Err(_) => Ok(ScheduleId::Text(s.to_string())),
        }
    }
}

impl From<i64> for ScheduleId {
    fn from(i: i64) -> Self {
        ScheduleId::Int(i)
    }
}

impl Display for ScheduleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            ScheduleId::Int(i) => write!(f, "{}", i),
            ScheduleId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Used to support serde
impl Serialize for ScheduleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ScheduleId::Int(i) => serializer.serialize_i64(*i),
            ScheduleId::Text(s) => serializer.serialize_str(s),
        }
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for ScheduleId {
    fn deserialize<D>(deserializer: D) -> Result<ScheduleId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ScheduleId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid schedule id {}", value)))
    }
}



/// A normalized schedule.
///
/// Instances are built by the [`Normalizer`](crate::normalizer::Normalizer), which guarantees that
/// the institution and the subject are trimmed and non-empty, and that the participants contain no empty name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduleRecord {
    /// Only present for schedules coming from a mutable store
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<ScheduleId>,
    institution: String,
    subject: String,
    /// A calendar day, with no time-of-day nor timezone attached
    date: NaiveDate,
    /// In display order
    participants: Vec<String>,
}

impl ScheduleRecord {
    pub fn new(id: Option<ScheduleId>, institution: String, subject: String, date: NaiveDate, participants: Vec<String>) -> Self {
        Self { id, institution, subject, date, participants }
    }

    pub fn id(&self) -> Option<&ScheduleId> { self.id.as_ref()  }
    pub fn institution(&self) -> &str       { &self.institution }
    pub fn subject(&self) -> &str           { &self.subject     }
    pub fn date(&self) -> NaiveDate         { self.date         }
    pub fn participants(&self) -> &[String] { &self.participants }

    /// The lowercase text a free-text query is matched against
    pub fn search_surface(&self) -> String {
        let mut surface = String::with_capacity(self.institution.len() + self.subject.len() + 16 * self.participants.len());
        surface.push_str(&self.institution);
        surface.push(' ');
        surface.push_str(&self.subject);
        for participant in &self.participants {
            surface.push(' ');
            surface.push_str(participant);
        }
        surface.to_lowercase()
    }

    /// Participants joined for display, or [`NO_PARTICIPANTS`] when there is none
    pub fn participants_label(&self) -> String {
        if self.participants.is_empty() {
            NO_PARTICIPANTS.to_string()
        } else {
            self.participants.join(", ")
        }
    }

    /// Whether both records describe the same schedule, regardless of their ids
    pub fn has_same_content_as(&self, other: &ScheduleRecord) -> bool {
           self.institution == other.institution
        && self.subject == other.subject
        && self.date == other.date
        && self.participants == other.participants
    }
}



/// The payload sent to a store to create or update a schedule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    #[serde(rename = "institusi")]
    pub institution: String,
    #[serde(rename = "mata_pelajaran")]
    pub subject: String,
    /// Serialized as `YYYY-MM-DD`
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "peserta")]
    pub participants: Vec<String>,
}

impl ScheduleDraft {
    /// Build a draft from the text fields of an admin form.
    ///
    /// `participants` is a comma-separated text, split with the same rules the normalizer applies to delimited strings.
    pub fn from_form(institution: &str, subject: &str, date: &str, participants: &str) -> Result<Self, String> {
        let institution = institution.trim();
        if institution.is_empty() {
            return Err("institution is required".to_string());
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err("subject is required".to_string());
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|err| format!("invalid date {:?}: {}", date, err))?;

        Ok(Self {
            institution: institution.to_string(),
            subject: subject.to_string(),
            date,
            participants: crate::normalizer::split_participants(participants),
        })
    }

    /// Fill a draft with the content of an existing schedule (e.g. to edit it)
    pub fn from_record(record: &ScheduleRecord) -> Self {
        Self {
            institution: record.institution().to_string(),
            subject: record.subject().to_string(),
            date: record.date(),
            participants: record.participants().to_vec(),
        }
    }

    /// The participants, as they should be displayed in a form text field
    pub fn participants_text(&self) -> String {
        self.participants.join(", ")
    }
}
