//! Recency filter, search, sort and facets over normalized schedules
//!
//! Every function here is pure: the same input always gives the same output.
//!
//! Searching is a plain substring scan over every record (no index is built). This is fine for the
//! tens to low hundreds of schedules a board displays, and would need revisiting for much larger sets.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};

use crate::schedule::ScheduleRecord;
use crate::utils::comparison::compare_alpha;

/// The value a filter control uses to mean "every institution"
pub const ALL_INSTITUTIONS: &str = "all";

/// The current day, in UTC.
///
/// Dates are always compared at day granularity in UTC, so that the result does not depend on the timezone of the machine.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Drop the schedules that are strictly before `today`
pub fn retain_upcoming(mut records: Vec<ScheduleRecord>, today: NaiveDate) -> Vec<ScheduleRecord> {
    let before = records.len();
    records.retain(|r| r.date() >= today);
    log::debug!("{} past schedules filtered out (today is {})", before - records.len(), today);
    records
}


/// Restricts the displayed schedules to a single institution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstitutionFilter {
    All,
    /// Exact, case-sensitive institution name
    Exact(String),
}

impl InstitutionFilter {
    /// Read the value of a filter control, where [`ALL_INSTITUTIONS`] (or nothing) means no filtering
    pub fn from_selector(selector: &str) -> Self {
        if selector.is_empty() || selector == ALL_INSTITUTIONS {
            InstitutionFilter::All
        } else {
            InstitutionFilter::Exact(selector.to_string())
        }
    }

    /// The value to put back in a filter control
    pub fn selector(&self) -> &str {
        match self {
            InstitutionFilter::All => ALL_INSTITUTIONS,
            InstitutionFilter::Exact(name) => name,
        }
    }

    pub fn matches(&self, record: &ScheduleRecord) -> bool {
        match self {
            InstitutionFilter::All => true,
            InstitutionFilter::Exact(name) => record.institution() == name,
        }
    }
}

impl Default for InstitutionFilter {
    fn default() -> Self {
        InstitutionFilter::All
    }
}


/// A free-text query combined with an institution filter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    institution: InstitutionFilter,
}

impl SearchQuery {
    pub fn new(text: &str, institution: InstitutionFilter) -> Self {
        Self { text: text.trim().to_lowercase(), institution }
    }

    /// The normalized (trimmed, lowercase) text
    pub fn text(&self) -> &str { &self.text }
    pub fn institution(&self) -> &InstitutionFilter { &self.institution }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.trim().to_lowercase();
    }

    pub fn set_institution(&mut self, institution: InstitutionFilter) {
        self.institution = institution;
    }

    /// Whether a schedule satisfies both the text and the institution filter
    pub fn matches(&self, record: &ScheduleRecord) -> bool {
        self.institution.matches(record)
            && (self.text.is_empty() || record.search_surface().contains(&self.text))
    }
}

/// Keep the records that match the query. The relative order of the input is kept
pub fn search<'a>(records: &'a [ScheduleRecord], query: &SearchQuery) -> Vec<&'a ScheduleRecord> {
    records.iter()
        .filter(|r| query.matches(r))
        .collect()
}

/// Sort by ascending date. Records on the same day keep their relative order
pub fn sort_by_date(records: &mut Vec<&ScheduleRecord>) {
    // `sort_by_key` is a stable sort
    records.sort_by_key(|r| r.date());
}

/// Search, then sort: the list that should be rendered
pub fn render_list<'a>(records: &'a [ScheduleRecord], query: &SearchQuery) -> Vec<&'a ScheduleRecord> {
    let mut list = search(records, query);
    sort_by_date(&mut list);
    list
}

/// The distinct institutions, in alphabetical order
pub fn institution_facets(records: &[ScheduleRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut facets: Vec<String> = records.iter()
        .map(|r| r.institution())
        .filter(|name| seen.insert(*name))
        .map(|name| name.to_string())
        .collect();
    facets.sort_by(|l, r| compare_alpha(l, r));
    facets
}


/// Something a schedule refers to, and that can be clicked to list every related schedule
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Institution(String),
    Subject(String),
    Participant(String),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Entity::Institution(n) | Entity::Subject(n) | Entity::Participant(n) => n,
        }
    }

    pub fn is_referred_by(&self, record: &ScheduleRecord) -> bool {
        match self {
            Entity::Institution(name) => record.institution() == name,
            Entity::Subject(name) => record.subject() == name,
            Entity::Participant(name) => record.participants().iter().any(|p| p == name),
        }
    }
}

/// Every schedule that refers to `entity`, sorted by date
pub fn related<'a>(records: &'a [ScheduleRecord], entity: &Entity) -> Vec<&'a ScheduleRecord> {
    let mut list: Vec<&ScheduleRecord> = records.iter()
        .filter(|r| entity.is_referred_by(r))
        .collect();
    sort_by_date(&mut list);
    list
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::ScheduleId;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: i64, institution: &str, subject: &str, date: NaiveDate, participants: &[&str]) -> ScheduleRecord {
        ScheduleRecord::new(
            Some(ScheduleId::Int(id)),
            institution.to_string(),
            subject.to_string(),
            date,
            participants.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn sample() -> Vec<ScheduleRecord> {
        vec![
            record(1, "SMA 2", "Fisika", day(2099, 3, 1), &["Citra"]),
            record(2, "SMA 1", "Matematika", day(2099, 1, 1), &["Ani", "Budi"]),
            record(3, "SMA 1", "Biologi", day(2099, 3, 1), &[]),
            record(4, "smk 1", "Kimia", day(2099, 2, 1), &["Budi"]),
        ]
    }

    fn ids(list: &[&ScheduleRecord]) -> Vec<i64> {
        list.iter()
            .map(|r| match r.id() {
                Some(ScheduleId::Int(i)) => *i,
                _ => panic!("unexpected id"),
            })
            .collect()
    }

    #[test]
    fn recency_is_compared_by_day() {
        let today = day(2099, 2, 1);
        let kept = retain_upcoming(sample(), today);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.date() >= today));
        // A schedule dated today is still upcoming
        assert!(kept.iter().any(|r| r.date() == today));
    }

    #[test]
    fn text_query_is_a_case_insensitive_substring() {
        let records = sample();
        let query = SearchQuery::new("  MAT ", InstitutionFilter::All);
        assert_eq!(ids(&search(&records, &query)), vec![2]);

        let query = SearchQuery::new("budi", InstitutionFilter::All);
        assert_eq!(ids(&search(&records, &query)), vec![2, 4]);

        let query = SearchQuery::new("", InstitutionFilter::All);
        assert_eq!(search(&records, &query).len(), 4);
    }

    #[test]
    fn institution_filter_is_exact() {
        let records = sample();
        let query = SearchQuery::new("budi", InstitutionFilter::from_selector("SMA 1"));
        assert_eq!(ids(&search(&records, &query)), vec![2]);

        let query = SearchQuery::new("fisika", InstitutionFilter::from_selector("SMA 1"));
        assert!(search(&records, &query).is_empty());

        let query = SearchQuery::new("", InstitutionFilter::from_selector("sma 1"));
        assert!(search(&records, &query).is_empty());

        assert_eq!(InstitutionFilter::from_selector(ALL_INSTITUTIONS), InstitutionFilter::All);
        assert_eq!(InstitutionFilter::from_selector("SMA 1").selector(), "SMA 1");
    }

    #[test]
    fn search_is_idempotent() {
        let records = sample();
        let query = SearchQuery::new("sma", InstitutionFilter::All);
        assert_eq!(render_list(&records, &query), render_list(&records, &query));
    }

    #[test]
    fn sort_is_stable() {
        let records = sample();
        let list = render_list(&records, &SearchQuery::default());
        // 1 and 3 share the same date, and must keep their input order
        assert_eq!(ids(&list), vec![2, 4, 1, 3]);

        let mut reversed: Vec<ScheduleRecord> = sample();
        reversed.reverse();
        let list = render_list(&reversed, &SearchQuery::default());
        assert_eq!(ids(&list), vec![2, 4, 3, 1]);
    }

    #[test]
    fn facets_are_distinct_and_sorted() {
        assert_eq!(institution_facets(&sample()), vec!["SMA 1".to_string(), "SMA 2".to_string(), "smk 1".to_string()]);
        assert!(institution_facets(&[]).is_empty());
    }

    #[test]
    fn accented_facets_sort_with_their_base_letter() {
        let records = vec![
            record(1, "Zeta", "Fisika", day(2099, 1, 1), &[]),
            record(2, "Ölmez", "Fisika", day(2099, 1, 1), &[]),
            record(3, "Éclair", "Fisika", day(2099, 1, 1), &[]),
            record(4, "Zeta", "Kimia", day(2099, 1, 2), &[]),
        ];
        assert_eq!(institution_facets(&records), vec!["Éclair".to_string(), "Ölmez".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn related_schedules() {
        let records = sample();
        assert_eq!(ids(&related(&records, &Entity::Participant("Budi".to_string()))), vec![2, 4]);
        assert_eq!(ids(&related(&records, &Entity::Institution("SMA 1".to_string()))), vec![2, 3]);
        assert_eq!(ids(&related(&records, &Entity::Subject("Kimia".to_string()))), vec![4]);
        assert!(related(&records, &Entity::Participant("budi".to_string())).is_empty());
    }
}
