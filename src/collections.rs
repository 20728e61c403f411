//! The named documents that make up a memory book.

use chrono::NaiveDate;

use crate::models::{DailyMessage, JournalEntry, Song, TimelineEntry};
use crate::store::{Collection, Scalar};

pub struct Timeline;

impl Collection for Timeline {
    const NAME: &'static str = "timeline";
    type Record = TimelineEntry;

    fn seed() -> Vec<TimelineEntry> {
        let mut seed = Vec::new();
        if let Some(date) = NaiveDate::from_ymd_opt(2024, 8, 1) {
            seed.push(TimelineEntry::new(date, "We Met", "That day at the coffee shop ☕"));
        }
        if let Some(date) = NaiveDate::from_ymd_opt(2024, 9, 10) {
            seed.push(TimelineEntry::new(date, "First Date", "Movie + fries 🍟"));
        }
        seed
    }
}

pub struct Journal;

impl Collection for Journal {
    const NAME: &'static str = "journal";
    type Record = JournalEntry;
}

pub struct LoveNotes;

impl Collection for LoveNotes {
    const NAME: &'static str = "love_notes";
    type Record = String;

    fn seed() -> Vec<String> {
        [
            "I love the way you smile.",
            "You're my favorite notification.",
            "You make ordinary days special.",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

pub struct Songs;

impl Collection for Songs {
    const NAME: &'static str = "songs";
    type Record = Song;
}

pub struct DailyMessages;

impl Collection for DailyMessages {
    const NAME: &'static str = "daily_messages";
    type Record = DailyMessage;

    fn seed() -> Vec<DailyMessage> {
        vec![
            DailyMessage::new(NaiveDate::from_ymd_opt(2025, 10, 1), "Good morning, love!"),
            DailyMessage::new(
                NaiveDate::from_ymd_opt(2025, 10, 2),
                "Remember our first silly dance?",
            ),
        ]
    }
}

/// Last calendar date on which the daily unlock succeeded
pub struct LastUnlocked;

impl Scalar for LastUnlocked {
    const NAME: &'static str = "last_unlocked";
    type Value = Option<NaiveDate>;
}
