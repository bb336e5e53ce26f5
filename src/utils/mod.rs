//! Some utility functions

use chrono::{Datelike, NaiveDate, Weekday};

use crate::board::{Board, BoardView, EMPTY_STATE_MESSAGE};
use crate::schedule::ScheduleRecord;

pub mod comparison;

const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

/// Format a date the way the board displays it, e.g. `Kamis, 1 Januari 2099`
pub fn long_date(date: NaiveDate) -> String {
    format!("{}, {} {} {}",
        weekday_name(date.weekday()),
        date.day(),
        MONTHS[date.month0() as usize],
        date.year())
}


/// A debug utility that pretty-prints a schedule
pub fn print_schedule(record: &ScheduleRecord) {
    let id = match record.id() {
        Some(id) => id.to_string(),
        None => "-".to_string(),
    };
    println!("    {}\t{} | {}\t{}", long_date(record.date()), record.institution(), record.subject(), id);
    println!("        {}", record.participants_label());
}

/// A debug utility that pretty-prints what a board currently displays
pub fn print_board(board: &Board) {
    if board.facets().is_empty() == false {
        println!("Institutions: {}", board.facets().join(", "));
    }
    match board.view() {
        BoardView::Loading => println!("Loading..."),
        BoardView::Failed(err) => println!("Unable to load schedules: {}", err),
        BoardView::Empty => println!("{}", EMPTY_STATE_MESSAGE),
        BoardView::Schedules(records) => {
            for record in records {
                print_schedule(record);
            }
        },
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indonesian_dates() {
        assert_eq!(long_date(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()), "Kamis, 1 Januari 2099");
        assert_eq!(long_date(NaiveDate::from_ymd_opt(2024, 8, 17).unwrap()), "Sabtu, 17 Agustus 2024");
        assert_eq!(long_date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()), "Minggu, 31 Desember 2023");
    }
}
