use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::mock_behaviour::MockBehaviour;
use crate::normalizer::KeyMapping;
use crate::schedule::{ScheduleDraft, ScheduleId};
use crate::traits::{ScheduleSource, ScheduleStore};


/// A store that keeps its rows in memory, shaped like rows of the Supabase table.
///
/// Rows are returned in insertion order. Raw rows (possibly invalid) can be seeded, which is handy to test what readers do with dirty data.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

#[derive(Debug, Default)]
struct MemoryData {
    rows: Vec<Value>,
    last_id: i64,
    behaviour: MockBehaviour,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that contains the given rows, as they are
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let last_id = rows.iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        Self {
            data: Mutex::new(MemoryData { rows, last_id, behaviour: MockBehaviour::default() }),
        }
    }

    /// Change how this store behaves (e.g. to make its next calls fail)
    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.lock().behaviour = behaviour;
    }

    /// Append a raw row, without any validation
    pub fn push_raw(&self, row: Value) {
        self.lock().rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryData> {
        // A panic while holding this lock cannot leave the rows half-written, so a poisoned lock is still usable
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn row_id(row: &Value) -> Option<ScheduleId> {
    row.get("id").and_then(ScheduleId::from_json)
}

fn build_row(id: &ScheduleId, draft: &ScheduleDraft) -> Result<Value, StoreError> {
    let mut row = Map::new();
    row.insert("id".to_string(), id.to_json());
    if let Value::Object(fields) = serde_json::to_value(draft)? {
        row.extend(fields);
    }
    Ok(Value::Object(row))
}

#[async_trait]
impl ScheduleSource for MemoryStore {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        let mut data = self.lock();
        data.behaviour.can_fetch()?;
        Ok(data.rows.clone())
    }

    fn key_mapping(&self) -> KeyMapping {
        KeyMapping::supabase()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn create(&self, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let mut data = self.lock();
        data.behaviour.can_create()?;

        data.last_id += 1;
        let id = ScheduleId::Int(data.last_id);
        let row = build_row(&id, draft)?;
        data.rows.push(row.clone());
        log::debug!("Created schedule {} in memory", id);
        Ok(row)
    }

    async fn update(&self, id: &ScheduleId, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let mut data = self.lock();
        data.behaviour.can_update()?;

        let new_row = build_row(id, draft)?;
        match data.rows.iter_mut().find(|row| row_id(row).as_ref() == Some(id)) {
            None => Err(StoreError::NotFound(id.clone())),
            Some(row) => {
                *row = new_row.clone();
                Ok(new_row)
            },
        }
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.behaviour.can_delete()?;

        let before = data.rows.len();
        data.rows.retain(|row| row_id(row).as_ref() != Some(id));
        if data.rows.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}
