use chrono::NaiveDate;
use keepsake::collections::{DailyMessages, LoveNotes};
use keepsake::gate::{AccessGate, GateError, GateState, Session, check_passphrase};
use keepsake::{Author, Config, MemoryBook, RevealGate, UnlockOutcome, Upload};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use tempfile::TempDir;

fn open(dir: &TempDir) -> MemoryBook {
    MemoryBook::open(dir.path(), RevealGate::new("italian", "I miss you more than pizza. Always.")).unwrap()
}

#[test]
fn fresh_book_is_seeded_and_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let book = open(&dir);
        assert_eq!(book.timeline().unwrap().len(), 2);
        book.add_love_note("You steal the blanket.").unwrap();
    }

    let book = open(&dir);
    let notes = book.store().load_collection::<LoveNotes>().unwrap();
    assert_eq!(notes.len(), 4);
    assert_eq!(notes[3], "You steal the blanket.");
    assert!(dir.path().join("timeline.json").exists());
}

#[test]
fn daily_unlock_message_comes_from_pool() {
    let dir = TempDir::new().unwrap();
    let book = open(&dir);
    book.store().overwrite_collection::<LoveNotes>(&["only note".to_string()]).unwrap();
    let messages: Vec<String> = book
        .store()
        .load_collection::<DailyMessages>()
        .unwrap()
        .into_iter()
        .filter_map(|m| m.message)
        .collect();

    let mut rng = StdRng::seed_from_u64(9);
    let today = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
    let UnlockOutcome::Unlocked(message) = book.daily_unlock(today, &mut rng).unwrap() else {
        panic!("first unlock of the day must succeed");
    };
    assert!(message == "only note" || messages.contains(&message));

    let before = fs::read_to_string(dir.path().join("last_unlocked.json")).unwrap();
    assert_eq!(book.daily_unlock(today, &mut rng).unwrap(), UnlockOutcome::AlreadyUnlocked);
    assert_eq!(fs::read_to_string(dir.path().join("last_unlocked.json")).unwrap(), before);
}

#[test]
fn dangling_photo_reference_is_skipped_not_an_error() {
    let dir = TempDir::new().unwrap();
    let book = open(&dir);
    let day = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
    let entry = book
        .add_memory(day, "Fireworks", "", Some(&Upload::new("sky.jpg", b"img".to_vec())))
        .unwrap();

    let photo = entry.photo_ref.clone().unwrap();
    fs::remove_file(photo.path()).unwrap();

    let stored = book.timeline().unwrap().into_iter().find(|e| e.title == "Fireworks").unwrap();
    assert_eq!(stored.photo_ref, Some(photo.clone()));
    assert_eq!(photo.resolve(), None);
    assert_eq!(photo.read(), None);
}

#[test]
fn clear_all_truncates_everything() {
    let dir = TempDir::new().unwrap();
    let book = open(&dir);
    book.add_journal_entry(Author::Partner, "hi", Some(&Upload::new("us.png", b"x".to_vec())), None)
        .unwrap();
    book.upload_audio(Some(&Upload::new("voice.wav", b"y".to_vec()))).unwrap();
    book.daily_unlock(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &mut StdRng::seed_from_u64(0))
        .unwrap();

    book.clear_all().unwrap();

    let export = book.export().unwrap();
    for name in ["timeline", "journal", "love_notes", "songs", "daily_messages"] {
        assert_eq!(export[name], serde_json::json!([]), "{name} not cleared");
    }
    assert!(export["last_unlocked"].is_null());
    assert!(book.album().unwrap().is_empty());
    assert!(book.surprises().unwrap().is_empty());
}

#[test]
fn gate_contract() {
    assert!(check_passphrase("love", "love"));
    assert!(!check_passphrase("love", "LOVE"));

    let config = Config {
        passphrase: Some("sunflower".to_string()),
        ..Config::default()
    };
    let gate: AccessGate = config.access_gate_with(|_| None);
    let mut session = Session::new();
    assert_eq!(session.state(), GateState::Locked);
    assert_eq!(session.unlock(&gate, "love"), Err(GateError::WrongPassphrase));
    session.unlock(&gate, "sunflower").unwrap();
    assert_eq!(session.state(), GateState::Unlocked);
    let _ = session.unlock(&gate, "anything");
    assert_eq!(session.state(), GateState::Unlocked);
}

#[test]
fn reveal_and_locked_entry_secrets_are_unrelated() {
    let dir = TempDir::new().unwrap();
    let book = open(&dir);
    book.add_journal_entry(Author::Me, "for your eyes", None, Some("moonlight"))
        .unwrap();

    assert!(book.reveal_journal_entry(0, "italian").is_err());
    assert!(book.reveal_secret("moonlight").is_err());
    assert_eq!(book.reveal_journal_entry(0, "moonlight").unwrap(), "for your eyes");
    assert_eq!(book.reveal_secret("italian").unwrap(), "I miss you more than pizza. Always.");
}
