//! The state of a schedule board
//!
//! A [`Board`] owns the canonical set (the normalized, upcoming schedules of the last successful fetch),
//! the current search query and the institution facets. Views are recomputed from these on demand.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::StoreError;
use crate::normalizer::{KeyMapping, Normalizer};
use crate::pipeline::{self, Entity, InstitutionFilter, SearchQuery};
use crate::schedule::{ScheduleDraft, ScheduleId, ScheduleRecord};
use crate::traits::{ScheduleSource, ScheduleStore};

pub mod fetch_progress;
use fetch_progress::{FeedbackSender, FetchEvent, FetchProgress};

/// Displayed when no schedule matches
pub const EMPTY_STATE_MESSAGE: &str = "No schedules found.";

/// Proof that a fetch has been started. Only the latest ticket can complete a fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// What the board should currently display
#[derive(Debug, PartialEq)]
pub enum BoardView<'a> {
    /// The first fetch is in flight
    Loading,
    /// Nothing could be loaded
    Failed(&'a str),
    /// Data is available, but no schedule matches the current query
    Empty,
    /// Schedules to display, sorted by date
    Schedules(Vec<&'a ScheduleRecord>),
}


/// The state of a board
#[derive(Debug, Default)]
pub struct Board {
    canonical: Vec<ScheduleRecord>,
    facets: Vec<String>,
    query: SearchQuery,

    /// Generation of the fetch in flight, if any
    in_flight: Option<u64>,
    last_generation: u64,
    loaded: bool,
    last_error: Option<String>,
    last_rejected: usize,

    progress: FetchProgress,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board that reports the progress of its fetches to a feedback channel
    pub fn new_with_feedback(feedback_sender: FeedbackSender) -> Self {
        Self {
            progress: FetchProgress::new_with_feedback_channel(feedback_sender),
            ..Self::default()
        }
    }

    /// The canonical set, in the order the source returned it
    pub fn schedules(&self) -> &[ScheduleRecord] { &self.canonical }
    /// The distinct institutions of the canonical set, sorted
    pub fn facets(&self) -> &[String]             { &self.facets }
    pub fn query(&self) -> &SearchQuery           { &self.query }
    pub fn is_fetching(&self) -> bool             { self.in_flight.is_some() }
    pub fn last_error(&self) -> Option<&str>      { self.last_error.as_deref() }
    /// How many rows the last successful fetch had to skip
    pub fn last_rejected(&self) -> usize          { self.last_rejected }

    pub fn find(&self, id: &ScheduleId) -> Option<&ScheduleRecord> {
        self.canonical.iter().find(|r| r.id() == Some(id))
    }

    pub fn set_query_text(&mut self, text: &str) {
        self.query.set_text(text);
    }

    pub fn set_institution(&mut self, filter: InstitutionFilter) {
        self.query.set_institution(filter);
    }

    /// The schedules matching the current query, sorted by date
    pub fn visible(&self) -> Vec<&ScheduleRecord> {
        pipeline::render_list(&self.canonical, &self.query)
    }

    /// Every schedule referring to an entity (e.g. after a participant has been clicked)
    pub fn related(&self, entity: &Entity) -> Vec<&ScheduleRecord> {
        pipeline::related(&self.canonical, entity)
    }

    pub fn view(&self) -> BoardView<'_> {
        if self.loaded == false {
            if self.in_flight.is_some() {
                return BoardView::Loading;
            }
            if let Some(err) = &self.last_error {
                return BoardView::Failed(err);
            }
        }
        if self.canonical.is_empty() {
            if let Some(err) = &self.last_error {
                return BoardView::Failed(err);
            }
        }

        let visible = self.visible();
        if visible.is_empty() {
            BoardView::Empty
        } else {
            BoardView::Schedules(visible)
        }
    }


    /// Start a fetch. Returns `None` (and the request should be dropped) when another fetch is still in flight
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if let Some(generation) = self.in_flight {
            log::debug!("Fetch #{} is still in flight, ignoring this new one", generation);
            return None;
        }
        self.last_generation += 1;
        self.in_flight = Some(self.last_generation);
        self.progress.feedback(FetchEvent::Started);
        Some(FetchTicket { generation: self.last_generation })
    }

    /// Complete a fetch started by [`Self::begin_fetch`].
    ///
    /// On success, the canonical set is rebuilt from `rows`, dropping the schedules before `today`.
    /// On failure, the previous canonical set is kept.
    /// Returns whether the canonical set has been rebuilt.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<Value>, StoreError>, mapping: &KeyMapping, today: NaiveDate) -> bool {
        if self.in_flight != Some(ticket.generation) {
            log::warn!("Ignoring the outcome of stale fetch #{}", ticket.generation);
            return false;
        }
        self.in_flight = None;

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                self.progress.error(&format!("Unable to fetch schedules: {}", err));
                self.last_error = Some(format!("Unable to load schedules: {}", err));
                self.progress.feedback(FetchEvent::Finished{ success: false, records: self.canonical.len(), rejected: 0 });
                return false;
            },
        };

        let report = Normalizer::new(mapping.clone()).normalize(&rows);
        self.last_rejected = report.rejected();
        self.canonical = pipeline::retain_upcoming(report.records, today);
        self.loaded = true;
        self.last_error = None;
        self.rebuild_facets();

        self.progress.info(&format!("{} upcoming schedules ({} rows skipped)", self.canonical.len(), self.last_rejected));
        self.progress.feedback(FetchEvent::Finished{ success: true, records: self.canonical.len(), rejected: self.last_rejected });
        true
    }

    /// Fetch from `source` and rebuild the canonical set, with today's UTC date as the recency limit
    pub async fn refresh<S>(&mut self, source: &S) -> bool
    where
        S: ScheduleSource + ?Sized,
    {
        self.refresh_at(source, pipeline::today_utc()).await
    }

    /// See [`Self::refresh`]
    pub async fn refresh_at<S>(&mut self, source: &S, today: NaiveDate) -> bool
    where
        S: ScheduleSource + ?Sized,
    {
        let ticket = match self.begin_fetch() {
            None => return false,
            Some(ticket) => ticket,
        };
        // Releases the fetch if this future is dropped before the source answers
        let mut pending = PendingFetch { board: self, ticket: Some(ticket) };
        let result = source.fetch_raw().await;
        pending.finish(result, &source.key_mapping(), today)
    }

    /// Give up a fetch started by [`Self::begin_fetch`], e.g. when its request was cancelled.
    /// The canonical set is kept, and a new fetch can start. Returns whether `ticket` was the fetch in flight
    pub fn abandon_fetch(&mut self, ticket: FetchTicket) -> bool {
        if self.in_flight != Some(ticket.generation) {
            return false;
        }
        self.in_flight = None;
        self.progress.info(&format!("Fetch #{} was abandoned", ticket.generation));
        self.progress.feedback(FetchEvent::Finished{ success: false, records: self.canonical.len(), rejected: 0 });
        true
    }

    /// Remove a schedule from the canonical set without fetching again. Returns whether it was there
    pub fn remove_local(&mut self, id: &ScheduleId) -> bool {
        let before = self.canonical.len();
        self.canonical.retain(|r| r.id() != Some(id));
        let removed = self.canonical.len() != before;
        if removed {
            self.rebuild_facets();
        }
        removed
    }

    /// Delete a schedule from a store.
    ///
    /// On success the schedule is removed locally. If the store does not know this id, the board is fetched again to resync.
    pub async fn delete<S>(&mut self, store: &S, id: &ScheduleId) -> Result<(), StoreError>
    where
        S: ScheduleStore + ?Sized,
    {
        match store.delete(id).await {
            Ok(()) => {
                self.remove_local(id);
                Ok(())
            },
            Err(StoreError::NotFound(missing)) => {
                log::warn!("Schedule {} does not exist anymore, fetching the board again", missing);
                self.refresh(store).await;
                Err(StoreError::NotFound(missing))
            },
            Err(err) => Err(err),
        }
    }

    /// Create (`id` is `None`) or update a schedule, then fetch the board again
    pub async fn submit<S>(&mut self, store: &S, id: Option<&ScheduleId>, draft: &ScheduleDraft) -> Result<Value, StoreError>
    where
        S: ScheduleStore + ?Sized,
    {
        let row = match id {
            None => store.create(draft).await?,
            Some(id) => store.update(id, draft).await?,
        };
        self.refresh(store).await;
        Ok(row)
    }

    /// Facets must be rebuilt whenever the canonical set changes. The selected institution survives if it is still present
    fn rebuild_facets(&mut self) {
        self.facets = pipeline::institution_facets(&self.canonical);
        if let InstitutionFilter::Exact(name) = self.query.institution() {
            if self.facets.contains(name) == false {
                log::debug!("Institution {:?} is gone, resetting the filter", name);
                self.query.set_institution(InstitutionFilter::All);
            }
        }
    }
}


/// A fetch in flight, on behalf of a board
struct PendingFetch<'a> {
    board: &'a mut Board,
    ticket: Option<FetchTicket>,
}

impl<'a> PendingFetch<'a> {
    fn finish(&mut self, result: Result<Vec<Value>, StoreError>, mapping: &KeyMapping, today: NaiveDate) -> bool {
        match self.ticket.take() {
            Some(ticket) => self.board.finish_fetch(ticket, result, mapping, today),
            None => false,
        }
    }
}

impl<'a> Drop for PendingFetch<'a> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.board.abandon_fetch(ticket);
        }
    }
}
