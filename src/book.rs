use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::assets::{AssetError, AssetStore};
use crate::collections::{DailyMessages, Journal, LastUnlocked, LoveNotes, Songs, Timeline};
use crate::gate::{GateError, RevealGate};
use crate::models::{Author, JournalEntry, Song, TimelineEntry};
use crate::store::{DocumentStore, StoreError};

/// Used when there are no love notes to draw from
pub const FALLBACK_LOVE_NOTE: &str = "You are my everything.";
/// Used when the drawn daily message has no text
pub const FALLBACK_DAILY_MESSAGE: &str = "A little hello from me";

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Asset error: {0}")]
    AssetError(#[from] AssetError),
    #[error("{0}")]
    GateError(#[from] GateError),
    #[error("No file chosen")]
    NoFileChosen,
    #[error("Love note is empty")]
    EmptyNote,
    #[error("A locked entry needs a non-empty secret")]
    EmptyLockSecret,
    #[error("No journal entry at index {0}")]
    EntryNotFound(usize),
}

/// A file handed over by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked(String),
    AlreadyUnlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    pub photos_removed: usize,
    pub audio_removed: usize,
}

/// Every section of the memory book over one data directory:
/// `<root>/*.json`, `<root>/photos/`, `<root>/audio/`
#[derive(Debug)]
pub struct MemoryBook {
    store: DocumentStore,
    photos: AssetStore,
    audio: AssetStore,
    reveal: RevealGate,
}

impl MemoryBook {
    pub fn open(root: impl Into<PathBuf>, reveal: RevealGate) -> Result<Self, BookError> {
        let root = root.into();
        let store = DocumentStore::open(&root)?;
        info!(root = %root.display(), "opened memory book");
        Ok(Self {
            store,
            photos: AssetStore::new(root.join("photos")),
            audio: AssetStore::new(root.join("audio")),
            reveal,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    // Our story

    pub fn add_memory(
        &self,
        date: NaiveDate,
        title: &str,
        description: &str,
        photo: Option<&Upload>,
    ) -> Result<TimelineEntry, BookError> {
        let mut entry = TimelineEntry::new(date, title, description);
        if let Some(upload) = photo {
            entry = entry.with_photo(self.photos.save(&upload.name, &upload.bytes)?);
        }
        self.store.append_record::<Timeline>(entry.clone())?;
        Ok(entry)
    }

    /// Newest date first; entries sharing a date keep insertion order
    pub fn timeline(&self) -> Result<Vec<TimelineEntry>, BookError> {
        let mut entries = self.store.load_collection::<Timeline>()?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    /// The memory with the latest date, preferring the last added on ties
    pub fn latest_memory(&self) -> Result<Option<TimelineEntry>, BookError> {
        let entries = self.store.load_collection::<Timeline>()?;
        Ok(entries.into_iter().max_by_key(|e| e.date))
    }

    // Photos

    pub fn upload_photos(&self, uploads: &[Upload]) -> Result<Vec<PathBuf>, BookError> {
        if uploads.is_empty() {
            return Err(BookError::NoFileChosen);
        }
        let mut saved = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let asset = self.photos.save(&upload.name, &upload.bytes)?;
            saved.push(asset.path().to_path_buf());
        }
        Ok(saved)
    }

    pub fn album(&self) -> Result<Vec<PathBuf>, BookError> {
        Ok(self.photos.list_all()?)
    }

    // Love notes

    pub fn add_love_note(&self, text: &str) -> Result<(), BookError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BookError::EmptyNote);
        }
        self.store.append_record::<LoveNotes>(text.to_string())?;
        Ok(())
    }

    pub fn random_love_note<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>, BookError> {
        let notes = self.store.load_collection::<LoveNotes>()?;
        Ok(notes.choose(rng).cloned())
    }

    // Daily unlock

    /// At most one successful unlock per calendar date
    pub fn daily_unlock<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<UnlockOutcome, BookError> {
        if self.store.load_scalar::<LastUnlocked>()? == Some(today) {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        let note = self
            .store
            .load_collection::<LoveNotes>()?
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_LOVE_NOTE.to_string());

        let mut pool: Vec<Option<String>> = self
            .store
            .load_collection::<DailyMessages>()?
            .into_iter()
            .map(|m| m.message)
            .collect();
        pool.push(Some(note));

        let message = pool
            .choose(rng)
            .cloned()
            .flatten()
            .unwrap_or_else(|| FALLBACK_DAILY_MESSAGE.to_string());

        let claimed = self.store.update_scalar::<LastUnlocked>(|last| {
            if *last == Some(today) {
                return false;
            }
            *last = Some(today);
            true
        })?;
        if !claimed {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }
        info!(%today, "daily message unlocked");
        Ok(UnlockOutcome::Unlocked(message))
    }

    // Journal

    pub fn add_journal_entry(
        &self,
        author: Author,
        text: &str,
        photo: Option<&Upload>,
        lock_secret: Option<&str>,
    ) -> Result<JournalEntry, BookError> {
        let mut entry = JournalEntry::new(author, text);
        if let Some(secret) = lock_secret {
            entry = entry.locked_with(secret).ok_or(BookError::EmptyLockSecret)?;
        }
        if let Some(upload) = photo {
            entry = entry.with_photo(self.photos.save(&upload.name, &upload.bytes)?);
        }
        self.store.append_record::<Journal>(entry.clone())?;
        Ok(entry)
    }

    /// Newest first
    pub fn journal(&self) -> Result<Vec<JournalEntry>, BookError> {
        let mut entries = self.store.load_collection::<Journal>()?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Text of the entry at `index` in [`MemoryBook::journal`] order
    pub fn reveal_journal_entry(&self, index: usize, attempt: &str) -> Result<String, BookError> {
        let entries = self.journal()?;
        let entry = entries.get(index).ok_or(BookError::EntryNotFound(index))?;
        Ok(entry.reveal(attempt)?.to_string())
    }

    // Songs

    pub fn add_song(&self, title: &str, link: Option<&str>, note: &str) -> Result<Song, BookError> {
        let song = Song::new(title, link.map(str::to_string), note);
        self.store.append_record::<Songs>(song.clone())?;
        Ok(song)
    }

    pub fn songs(&self) -> Result<Vec<Song>, BookError> {
        Ok(self.store.load_collection::<Songs>()?)
    }

    // Surprises

    pub fn upload_audio(&self, upload: Option<&Upload>) -> Result<PathBuf, BookError> {
        let upload = upload.ok_or(BookError::NoFileChosen)?;
        let asset = self.audio.save(&upload.name, &upload.bytes)?;
        Ok(asset.path().to_path_buf())
    }

    pub fn surprises(&self) -> Result<Vec<PathBuf>, BookError> {
        Ok(self.audio.list_all()?)
    }

    pub fn reveal_secret(&self, attempt: &str) -> Result<&str, BookError> {
        Ok(self.reveal.reveal(attempt)?)
    }

    // Settings

    /// Empty every collection and delete every photo and audio file
    pub fn clear_all(&self) -> Result<ClearReport, BookError> {
        self.store.clear_all()?;
        let report = ClearReport {
            photos_removed: self.photos.delete_all(),
            audio_removed: self.audio.delete_all(),
        };
        info!(?report, "cleared memory book");
        Ok(report)
    }

    pub fn export(&self) -> Result<Value, BookError> {
        Ok(self.store.export()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn book() -> (TempDir, MemoryBook) {
        let dir = TempDir::new().unwrap();
        let book = MemoryBook::open(dir.path(), RevealGate::new("italian", "psst")).unwrap();
        (dir, book)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn memory_with_photo_references_saved_asset() {
        let (_dir, book) = book();
        let photo = Upload::new("beach.jpg", b"jpeg bytes".to_vec());

        let entry = book
            .add_memory(day(2025, 1, 1), "Trip", "Beach day", Some(&photo))
            .unwrap();

        let photo_ref = entry.photo_ref.clone().unwrap();
        assert!(photo_ref.as_str().ends_with("_beach.jpg"));
        assert_eq!(photo_ref.read().unwrap(), b"jpeg bytes");
        assert_eq!(book.timeline().unwrap()[0], entry);
    }

    #[test]
    fn timeline_is_newest_first_and_latest_memory_matches() {
        let (_dir, book) = book();
        book.add_memory(day(2023, 5, 5), "Old", "", None).unwrap();
        book.add_memory(day(2025, 2, 14), "Valentine", "", None).unwrap();

        let titles: Vec<_> = book.timeline().unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["Valentine", "First Date", "We Met", "Old"]);
        assert_eq!(book.latest_memory().unwrap().unwrap().title, "Valentine");
    }

    #[test]
    fn upload_without_files_is_rejected_without_writing() {
        let (_dir, book) = book();
        assert!(matches!(book.upload_photos(&[]), Err(BookError::NoFileChosen)));
        assert!(matches!(book.upload_audio(None), Err(BookError::NoFileChosen)));
        assert!(book.album().unwrap().is_empty());
        assert!(book.surprises().unwrap().is_empty());
    }

    #[test]
    fn blank_love_note_is_rejected() {
        let (_dir, book) = book();
        assert!(matches!(book.add_love_note("   "), Err(BookError::EmptyNote)));

        book.add_love_note("  You laugh at my jokes.  ").unwrap();
        let notes = book.store().load_collection::<LoveNotes>().unwrap();
        assert_eq!(notes.last().map(String::as_str), Some("You laugh at my jokes."));
    }

    #[test]
    fn random_love_note_is_none_when_empty() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(book.random_love_note(&mut rng).unwrap().is_some());

        book.store().overwrite_collection::<LoveNotes>(&[]).unwrap();
        assert_eq!(book.random_love_note(&mut rng).unwrap(), None);
    }

    #[test]
    fn daily_unlock_succeeds_once_per_day() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(42);
        let today = day(2025, 10, 19);

        assert!(matches!(
            book.daily_unlock(today, &mut rng).unwrap(),
            UnlockOutcome::Unlocked(_)
        ));
        assert_eq!(
            book.daily_unlock(today, &mut rng).unwrap(),
            UnlockOutcome::AlreadyUnlocked
        );
        assert_eq!(book.store().load_scalar::<LastUnlocked>().unwrap(), Some(today));

        assert!(matches!(
            book.daily_unlock(day(2025, 10, 20), &mut rng).unwrap(),
            UnlockOutcome::Unlocked(_)
        ));
    }

    #[test]
    fn concurrent_daily_unlocks_succeed_once_per_day() {
        let (_dir, book) = book();
        let first = day(2026, 1, 1);

        for offset in 0..50 {
            let today = first + chrono::Days::new(offset);
            let unlocked: usize = std::thread::scope(|s| {
                let handles: Vec<_> = (0..4)
                    .map(|worker| {
                        let book = &book;
                        s.spawn(move || {
                            let mut rng = StdRng::seed_from_u64(worker);
                            book.daily_unlock(today, &mut rng).unwrap()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|outcome| matches!(outcome, UnlockOutcome::Unlocked(_)))
                    .count()
            });
            assert_eq!(unlocked, 1, "{today} unlocked {unlocked} times");
        }
    }

    #[test]
    fn daily_unlock_falls_back_when_pools_are_empty() {
        let (_dir, book) = book();
        book.store().overwrite_collection::<LoveNotes>(&[]).unwrap();
        book.store().overwrite_collection::<DailyMessages>(&[]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(
            book.daily_unlock(day(2025, 1, 1), &mut rng).unwrap(),
            UnlockOutcome::Unlocked(FALLBACK_LOVE_NOTE.to_string())
        );
    }

    #[test]
    fn locked_journal_entry_reveals_with_secret() {
        let (_dir, book) = book();
        book.add_journal_entry(Author::Me, "open me later", None, Some("Rome"))
            .unwrap();

        let entries = book.journal().unwrap();
        assert!(entries[0].locked);
        assert_eq!(entries[0].visible_text(), None);
        assert!(matches!(
            book.reveal_journal_entry(0, "Paris"),
            Err(BookError::GateError(GateError::WrongSecret))
        ));
        assert_eq!(book.reveal_journal_entry(0, "Rome").unwrap(), "open me later");
        assert!(matches!(
            book.reveal_journal_entry(5, "Rome"),
            Err(BookError::EntryNotFound(5))
        ));
    }

    #[test]
    fn empty_lock_secret_is_rejected() {
        let (_dir, book) = book();
        assert!(matches!(
            book.add_journal_entry(Author::Partner, "hi", None, Some("")),
            Err(BookError::EmptyLockSecret)
        ));
        assert!(book.journal().unwrap().is_empty());
    }

    #[test]
    fn songs_round_trip() {
        let (_dir, book) = book();
        book.add_song("La Vie en Rose", Some("https://example.com/song"), "our first dance")
            .unwrap();
        book.add_song("Hum", Some("  "), "").unwrap();

        let songs = book.songs().unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].link.as_deref(), Some("https://example.com/song"));
        assert_eq!(songs[1].link, None);
    }

    #[test]
    fn reveal_secret_uses_its_own_gate() {
        let (_dir, book) = book();
        assert!(book.reveal_secret("love").is_err());
        assert_eq!(book.reveal_secret("italian").unwrap(), "psst");
    }

    #[test]
    fn clear_all_removes_records_and_assets() {
        let (_dir, book) = book();
        book.upload_photos(&[Upload::new("a.png", b"a".to_vec())]).unwrap();
        book.upload_audio(Some(&Upload::new("hi.mp3", b"b".to_vec())))
            .unwrap();
        book.add_memory(day(2025, 1, 1), "Trip", "", None).unwrap();

        let report = book.clear_all().unwrap();

        assert_eq!(report, ClearReport { photos_removed: 1, audio_removed: 1 });
        assert!(book.timeline().unwrap().is_empty());
        assert!(book.album().unwrap().is_empty());
        assert!(book.surprises().unwrap().is_empty());
    }
}
