use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::StoreError;
use crate::normalizer::KeyMapping;
use crate::traits::ScheduleSource;
use super::HTTP_CLIENT;

/// The public Google Sheets API
pub static DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com/";

/// The body of a `spreadsheets.values.get` response
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// A read-only source backed by a range of a Google Sheet.
///
/// The first row of the range holds the column headers. They are normalized to capitalized, underscore-separated keys
/// (`mata pelajaran` becomes `Mata_Pelajaran`), which is what [`KeyMapping::sheet`] expects.
#[derive(Clone, Debug)]
pub struct SheetSource {
    values_url: Url,
}

impl SheetSource {
    pub fn new(api_url: &Url, sheet_id: &str, range: &str, api_key: &str) -> Result<Self, StoreError> {
        let mut values_url = api_url.clone();
        values_url.path_segments_mut()
            .map_err(|_| StoreError::Backend(format!("{} cannot be a base URL", api_url)))?
            .pop_if_empty()
            .extend(&["v4", "spreadsheets", sheet_id, "values", range]);
        values_url.query_pairs_mut().append_pair("key", api_key);
        Ok(Self { values_url })
    }
}

/// Turn a header cell into a key: words are capitalized and joined with underscores
pub fn header_key(header: &str) -> String {
    header
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|word| word.is_empty() == false)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            }
        })
        .collect::<Vec<String>>()
        .join("_")
}

/// Convert a table (header row first) into one JSON object per row.
///
/// Cells missing at the end of a row are left out of its object, and rows with no content at all are skipped
pub fn rows_to_objects(table: &[Vec<Value>]) -> Vec<Value> {
    let (headers, rows) = match table.split_first() {
        None => return Vec::new(),
        Some((headers, rows)) => (headers, rows),
    };
    let keys: Vec<String> = headers.iter()
        .map(|cell| header_key(cell.as_str().unwrap_or_default()))
        .collect();

    rows.iter()
        .filter(|row| row.iter().any(|cell| cell.as_str().map(|s| s.trim().is_empty()) != Some(true)))
        .map(|row| {
            let object: Map<String, Value> = keys.iter()
                .zip(row.iter())
                .filter(|(key, _)| key.is_empty() == false)
                .map(|(key, cell)| (key.clone(), cell.clone()))
                .collect();
            Value::Object(object)
        })
        .collect()
}

#[async_trait]
impl ScheduleSource for SheetSource {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        log::debug!("Fetching schedules from a Google Sheet");
        let response = HTTP_CLIENT.get(self.values_url.clone())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() == false {
            // The body may echo the API key, it is not logged
            return Err(StoreError::Rejected { status: status.as_u16(), message: "Google Sheets API error".to_string() });
        }

        let range: ValueRange = response.json().await?;
        let rows = rows_to_objects(&range.values);
        log::info!("Fetched {} schedules from a Google Sheet", rows.len());
        Ok(rows)
    }

    fn key_mapping(&self) -> KeyMapping {
        KeyMapping::sheet()
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use crate::normalizer::Normalizer;

    #[test]
    fn headers() {
        assert_eq!(header_key("Institusi"), "Institusi");
        assert_eq!(header_key(" mata  pelajaran "), "Mata_Pelajaran");
        assert_eq!(header_key("MATA_PELAJARAN"), "Mata_Pelajaran");
        assert_eq!(header_key(""), "");
    }

    #[test]
    fn table_to_schedules() {
        let table: Vec<Vec<Value>> = serde_json::from_value(json!([
            ["Institusi", "Mata Pelajaran", "Tanggal", "Peserta"],
            ["SMA 1", "Matematika", "2099-01-01", "Ani, Budi"],
            ["", "", ""],
            ["SMA 2", "Fisika", "02/03/2099"],
        ])).unwrap();

        let rows = rows_to_objects(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], json!({"Institusi": "SMA 2", "Mata_Pelajaran": "Fisika", "Tanggal": "02/03/2099"}));

        let report = Normalizer::new(KeyMapping::sheet()).normalize(&rows);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].participants(), &["Ani".to_string(), "Budi".to_string()]);
        assert!(report.records[1].participants().is_empty());
    }

    #[test]
    fn values_url() {
        let api: Url = DEFAULT_SHEETS_API_URL.parse().unwrap();
        let source = SheetSource::new(&api, "abc123", "Jadwal!A1:D", "KEY").unwrap();
        assert_eq!(
            source.values_url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Jadwal!A1:D?key=KEY"
        );
    }
}
