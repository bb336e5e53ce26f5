//! Board scenarios, with an in-memory store standing for the backend

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use schedule_board::board::fetch_progress::{feedback_channel, FeedbackReceiver, FetchEvent};
use schedule_board::board::BoardView;
use schedule_board::error::StoreError;
use schedule_board::mock_behaviour::MockBehaviour;
use schedule_board::pipeline::{Entity, InstitutionFilter};
use schedule_board::store::MemoryStore;
use schedule_board::traits::ScheduleSource;
use schedule_board::{Board, Normalizer, KeyMapping, ScheduleDraft, ScheduleId};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    day(2050, 6, 15)
}

fn schedule(id: i64, institution: &str, subject: &str, date: &str, participants: Value) -> Value {
    json!({
        "id": id,
        "institusi": institution,
        "mata_pelajaran": subject,
        "tanggal": date,
        "peserta": participants,
    })
}

async fn loaded_board(store: &MemoryStore) -> Board {
    let mut board = Board::new();
    assert!(board.refresh_at(store, today()).await);
    board
}


#[tokio::test]
async fn future_schedule_is_kept() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::with_rows(vec![
        json!({"institusi": "SMA 1", "mata_pelajaran": "Matematika", "tanggal": "2099-01-01", "peserta": ["Ani", "Budi"]}),
    ]);
    let board = loaded_board(&store).await;

    assert_eq!(board.schedules().len(), 1);
    let record = &board.schedules()[0];
    assert_eq!(record.institution(), "SMA 1");
    assert_eq!(record.subject(), "Matematika");
    assert_eq!(record.date(), day(2099, 1, 1));
    assert_eq!(record.participants(), &["Ani".to_string(), "Budi".to_string()]);
    assert_eq!(record.id(), None);
}

#[tokio::test]
async fn past_schedule_shows_the_empty_state() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2000-01-01", json!(["Ani"])),
    ]);
    let board = loaded_board(&store).await;

    assert!(board.schedules().is_empty());
    assert_eq!(board.view(), BoardView::Empty);
}

#[tokio::test]
async fn schedules_of_today_are_upcoming() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2050-06-14", json!([])),
        schedule(2, "SMA 1", "Matematika", "2050-06-15", json!([])),
        schedule(3, "SMA 1", "Matematika", "2050-06-15T23:30:00Z", json!([])),
    ]);
    let board = loaded_board(&store).await;

    let ids: Vec<_> = board.schedules().iter().filter_map(|r| r.id().cloned()).collect();
    assert_eq!(ids, vec![ScheduleId::Int(2), ScheduleId::Int(3)]);
}

#[tokio::test]
async fn delimited_participants_are_cleaned() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Biologi", "2099-03-01", json!("Ani, Budi ,,Citra\n")),
    ]);
    let board = loaded_board(&store).await;

    assert_eq!(board.schedules()[0].participants(), &["Ani".to_string(), "Budi".to_string(), "Citra".to_string()]);
}

#[tokio::test]
async fn search_and_institution_filter() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-03", json!(["Ani"])),
        schedule(2, "SMA 2", "Matematika", "2099-01-01", json!(["Budi"])),
        schedule(3, "SMA 1", "Fisika", "2099-01-02", json!(["Citra"])),
    ]);
    let mut board = loaded_board(&store).await;
    assert_eq!(board.facets(), &["SMA 1".to_string(), "SMA 2".to_string()]);

    board.set_query_text("MAT");
    let ids: Vec<_> = board.visible().iter().filter_map(|r| r.id().cloned()).collect();
    assert_eq!(ids, vec![ScheduleId::Int(2), ScheduleId::Int(1)]);

    board.set_institution(InstitutionFilter::from_selector("SMA 1"));
    let ids: Vec<_> = board.visible().iter().filter_map(|r| r.id().cloned()).collect();
    assert_eq!(ids, vec![ScheduleId::Int(1)]);

    // The same query always gives the same answer
    assert_eq!(board.visible(), board.visible());

    board.set_query_text("citra");
    board.set_institution(InstitutionFilter::All);
    assert_eq!(board.visible().len(), 1);
}

#[tokio::test]
async fn related_schedules() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-03", json!(["Ani", "Budi"])),
        schedule(2, "SMA 2", "Kimia", "2099-01-01", json!(["Ani"])),
        schedule(3, "SMA 1", "Fisika", "2099-01-02", json!(["Anita"])),
    ]);
    let board = loaded_board(&store).await;

    let ids: Vec<_> = board.related(&Entity::Participant("Ani".to_string())).iter().filter_map(|r| r.id().cloned()).collect();
    assert_eq!(ids, vec![ScheduleId::Int(2), ScheduleId::Int(1)]);
}

#[tokio::test]
async fn deleting_a_missing_schedule_resyncs() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-01", json!([])),
        schedule(2, "SMA 2", "Fisika", "2099-01-02", json!([])),
    ]);
    let mut board = loaded_board(&store).await;

    let err = board.delete(&store, &ScheduleId::Int(42)).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ScheduleId::Int(42))));
    assert_eq!(board.schedules().len(), 2);

    board.delete(&store, &ScheduleId::Int(1)).await.unwrap();
    assert_eq!(board.schedules().len(), 1);
    assert_eq!(board.facets(), &["SMA 2".to_string()]);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn failed_deletes_leave_the_board_untouched() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-01", json!([])),
    ]);
    let mut board = loaded_board(&store).await;

    store.set_behaviour(MockBehaviour::fail_now(1));
    assert!(matches!(board.delete(&store, &ScheduleId::Int(1)).await, Err(StoreError::Backend(_))));
    assert_eq!(board.schedules().len(), 1);

    board.delete(&store, &ScheduleId::Int(1)).await.unwrap();
    assert!(board.schedules().is_empty());
}

#[tokio::test]
async fn failed_fetches_keep_stale_data() {
    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-01", json!([])),
    ]);
    let mut board = loaded_board(&store).await;

    store.set_behaviour(MockBehaviour::fail_now(1));
    assert!(board.refresh_at(&store, today()).await == false);
    assert!(board.last_error().is_some());
    assert_eq!(board.visible().len(), 1);

    assert!(board.refresh_at(&store, today()).await);
    assert!(board.last_error().is_none());
}

#[tokio::test]
async fn created_schedules_read_back_equal() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::new();
    let mut board = Board::new();
    let draft = ScheduleDraft::from_form(" SMA 3 ", "Sejarah", "2099-05-20", "Dewi,\nEka, ").unwrap();

    let created = board.submit(&store, None, &draft).await.unwrap();
    let id = ScheduleId::from_json(&created["id"]).unwrap();

    let record = board.find(&id).unwrap();
    assert_eq!(ScheduleDraft::from_record(record), draft);
    assert_eq!(record.participants(), &["Dewi".to_string(), "Eka".to_string()]);

    // Same thing, straight from the raw rows
    let report = Normalizer::new(KeyMapping::supabase()).normalize(&store.fetch_raw().await.unwrap());
    assert_eq!(report.rejected(), 0);
    assert_eq!(ScheduleDraft::from_record(&report.records[0]), draft);

    let mut changed = draft.clone();
    changed.subject = "Sejarah Indonesia".to_string();
    board.submit(&store, Some(&id), &changed).await.unwrap();
    assert_eq!(board.find(&id).unwrap().subject(), "Sejarah Indonesia");

    let err = board.submit(&store, Some(&ScheduleId::Int(99)), &changed).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}


/// A source whose requests never complete
struct Unreachable;

#[async_trait]
impl ScheduleSource for Unreachable {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        std::future::pending().await
    }

    fn key_mapping(&self) -> KeyMapping {
        KeyMapping::supabase()
    }
}

#[tokio::test]
async fn cancelled_refreshes_do_not_block_the_board() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-01", json!([])),
    ]);
    let mut board = Board::new();

    tokio::select! {
        biased;
        _ = board.refresh_at(&Unreachable, today()) => panic!("this source never answers"),
        _ = std::future::ready(()) => {},
    }
    assert!(board.is_fetching() == false);
    assert!(board.view() != BoardView::Loading);

    assert!(board.refresh_at(&store, today()).await);
    assert_eq!(board.schedules().len(), 1);

    // Same thing once data is loaded: the previous set stays
    tokio::select! {
        biased;
        _ = board.refresh_at(&Unreachable, today()) => panic!("this source never answers"),
        _ = std::future::ready(()) => {},
    }
    assert!(board.is_fetching() == false);
    assert_eq!(board.visible().len(), 1);
}


/// Wraps a store, and records what the loading indicator showed while each fetch was in flight
struct Observed<'a> {
    store: &'a MemoryStore,
    feedback: FeedbackReceiver,
    seen: Mutex<Vec<FetchEvent>>,
}

#[async_trait]
impl<'a> ScheduleSource for Observed<'a> {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        let current = self.feedback.borrow().clone();
        self.seen.lock().unwrap().push(current);
        self.store.fetch_raw().await
    }

    fn key_mapping(&self) -> KeyMapping {
        self.store.key_mapping()
    }
}

#[tokio::test]
async fn loading_feedback() {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::with_rows(vec![
        schedule(1, "SMA 1", "Matematika", "2099-01-01", json!([])),
        schedule(2, "SMA 2", "Fisika", "2099-01-02", json!(["Ani"])),
        schedule(3, "SMA 2", "Kimia", "2000-01-01", json!([])),
        json!({"id": 4, "institusi": "SMA 3", "tanggal": "2099-01-01"}),
    ]);
    let (sender, receiver) = feedback_channel();
    assert_eq!(*receiver.borrow(), FetchEvent::NotStarted);

    let source = Observed { store: &store, feedback: receiver.clone(), seen: Mutex::new(Vec::new()) };
    let mut board = Board::new_with_feedback(sender);

    assert!(board.refresh_at(&source, today()).await);
    assert_eq!(*receiver.borrow(), FetchEvent::Finished{ success: true, records: 2, rejected: 1 });

    store.set_behaviour(MockBehaviour::fail_now(1));
    assert!(board.refresh_at(&source, today()).await == false);
    assert_eq!(*receiver.borrow(), FetchEvent::Finished{ success: false, records: 2, rejected: 0 });

    assert_eq!(*source.seen.lock().unwrap(), vec![FetchEvent::Started, FetchEvent::Started]);
}
