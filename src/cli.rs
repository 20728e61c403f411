use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::book::{BookError, MemoryBook, UnlockOutcome, Upload};
use crate::config::Config;
use crate::games::{self, QuizError};
use crate::gate::{GateError, Session};
use crate::models::{Author, UNTITLED};
use crate::utils::{parse_date, today};

/// Extensions accepted for photo uploads
pub const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
/// Extensions accepted for audio uploads
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "A little world for you two - a password-gated memory book")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/data)
    #[arg(long)]
    pub dev: bool,

    /// Shared passphrase to enter the book
    #[arg(short, long, env = "KEEPSAKE_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show the latest memory (default if no subcommand)
    Home,
    /// List the timeline, newest first
    Timeline,
    /// Add a memory to the timeline
    AddMemory {
        /// Memory title
        title: Option<String>,
        /// Date of the memory (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<String>,
        /// Short note / description
        #[arg(long)]
        description: Option<String>,
        /// Optional photo (png, jpg, jpeg)
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// List the photo album, newest first
    Album,
    /// Add one or more photos to the album
    UploadPhotos {
        /// Photo files (png, jpg, jpeg)
        files: Vec<PathBuf>,
    },
    /// Draw a random love note
    LoveNote,
    /// Add a custom love note
    AddLoveNote {
        text: String,
    },
    /// Unlock today's message (once a day)
    Unlock,
    /// Read the shared journal, newest first
    Journal,
    /// Write a journal entry
    AddJournal {
        text: String,
        /// Who is writing: me or partner
        #[arg(long, default_value = "me")]
        author: Author,
        /// Optional photo (png, jpg, jpeg)
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Lock the entry behind a secret
        #[arg(long)]
        lock: Option<String>,
    },
    /// Reveal a locked journal entry by its number in the journal listing
    RevealEntry {
        number: usize,
        secret: String,
    },
    /// List our songs
    Songs,
    /// Add a song
    AddSong {
        title: String,
        #[arg(long)]
        link: Option<String>,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// List saved voice notes and audio clips
    Surprises,
    /// Save a voice note or audio clip (mp3, wav)
    UploadAudio {
        file: Option<PathBuf>,
    },
    /// Reveal the hidden message
    Reveal {
        secret: String,
    },
    /// Spin the Wheel of Cute
    Spin,
    /// Answer the quiz, or show it when no answer is given
    Quiz {
        answer: Option<String>,
    },
    /// Delete every record and every uploaded file
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print all stored data as JSON
    Export,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    BookError(#[from] BookError),
    #[error("{0}")]
    GateError(#[from] GateError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("No journal entry #{0}")]
    NoSuchEntry(usize),
    #[error("Failed to read {}: {source}", path.display())]
    UploadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unsupported file {0}: expected one of {1}")]
    UnsupportedFile(String, String),
    #[error("{0}")]
    QuizError(#[from] QuizError),
    #[error("Failed to serialize export: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Case-insensitive extension check
pub fn has_allowed_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

fn read_upload(path: &Path, allowed: &[&str]) -> Result<Upload, CliError> {
    if !has_allowed_extension(path, allowed) {
        return Err(CliError::UnsupportedFile(
            path.display().to_string(),
            allowed.join(", "),
        ));
    }
    Upload::from_path(path).map_err(|source| CliError::UploadError {
        path: path.to_path_buf(),
        source,
    })
}

fn memory_date(date: Option<&str>) -> Result<NaiveDate, CliError> {
    match date {
        Some(date_str) => parse_date(date_str)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e))),
        None => Ok(today()),
    }
}

/// Open a session for this invocation
pub fn open_session(config: &Config, attempt: Option<&str>) -> Result<Session, CliError> {
    let mut session = Session::new();
    session.unlock(&config.access_gate(), attempt.unwrap_or_default())?;
    Ok(session)
}

/// Run one command against an unlocked session
pub fn dispatch(
    command: Commands,
    session: &Session,
    book: &MemoryBook,
    config: &Config,
) -> Result<(), CliError> {
    session.require_unlocked()?;

    match command {
        Commands::Home => handle_home(book),
        Commands::Timeline => handle_timeline(book),
        Commands::AddMemory {
            title,
            date,
            description,
            photo,
        } => handle_add_memory(title, date, description, photo, book),
        Commands::Album => handle_album(book),
        Commands::UploadPhotos { files } => handle_upload_photos(files, book),
        Commands::LoveNote => handle_love_note(book),
        Commands::AddLoveNote { text } => handle_add_love_note(text, book),
        Commands::Unlock => handle_unlock(book),
        Commands::Journal => handle_journal(book),
        Commands::AddJournal {
            text,
            author,
            photo,
            lock,
        } => handle_add_journal(text, author, photo, lock, book),
        Commands::RevealEntry { number, secret } => handle_reveal_entry(number, secret, book),
        Commands::Songs => handle_songs(book),
        Commands::AddSong { title, link, note } => handle_add_song(title, link, note, book),
        Commands::Surprises => handle_surprises(book),
        Commands::UploadAudio { file } => handle_upload_audio(file, book),
        Commands::Reveal { secret } => handle_reveal(secret, book),
        Commands::Spin => {
            println!("The wheel says: {}", games::spin_wheel(&mut rand::thread_rng()));
            Ok(())
        }
        Commands::Quiz { answer } => handle_quiz(answer, config),
        Commands::Clear { yes } => handle_clear(yes, book),
        Commands::Export => handle_export(book),
    }
}

/// Handle the home command
pub fn handle_home(book: &MemoryBook) -> Result<(), CliError> {
    println!("Welcome, lovebirds!");
    if let Some(memory) = book.latest_memory()? {
        println!("Latest memory: {} - {}", memory.title, memory.date);
        if !memory.description.is_empty() {
            println!("{}", memory.description);
        }
    }
    Ok(())
}

/// Handle the timeline command
pub fn handle_timeline(book: &MemoryBook) -> Result<(), CliError> {
    let entries = book.timeline()?;
    if entries.is_empty() {
        println!("No memories yet.");
    }
    for entry in entries {
        println!("{} - {}", entry.title, entry.date);
        // A missing photo is skipped silently
        if let Some(path) = entry.photo_ref.as_ref().and_then(|p| p.resolve()) {
            println!("  photo: {}", path.display());
        }
        if !entry.description.is_empty() {
            println!("  {}", entry.description);
        }
    }
    Ok(())
}

/// Handle the add-memory command
pub fn handle_add_memory(
    title: Option<String>,
    date: Option<String>,
    description: Option<String>,
    photo: Option<PathBuf>,
    book: &MemoryBook,
) -> Result<(), CliError> {
    let date = memory_date(date.as_deref())?;
    let upload = photo
        .as_deref()
        .map(|path| read_upload(path, PHOTO_EXTENSIONS))
        .transpose()?;

    let entry = book.add_memory(
        date,
        title.as_deref().unwrap_or(UNTITLED),
        description.as_deref().unwrap_or_default(),
        upload.as_ref(),
    )?;
    println!("Memory saved: {} - {}", entry.title, entry.date);
    Ok(())
}

/// Handle the album command
pub fn handle_album(book: &MemoryBook) -> Result<(), CliError> {
    let photos = book.album()?;
    if photos.is_empty() {
        println!("No photos yet - upload a few to start filling this album.");
    }
    for photo in photos {
        println!("{}", photo.display());
    }
    Ok(())
}

/// Handle the upload-photos command
pub fn handle_upload_photos(files: Vec<PathBuf>, book: &MemoryBook) -> Result<(), CliError> {
    let uploads = files
        .iter()
        .map(|path| read_upload(path, PHOTO_EXTENSIONS))
        .collect::<Result<Vec<_>, _>>()?;
    let saved = book.upload_photos(&uploads)?;
    println!("Saved {} photo(s).", saved.len());
    Ok(())
}

/// Handle the love-note command
pub fn handle_love_note(book: &MemoryBook) -> Result<(), CliError> {
    match book.random_love_note(&mut rand::thread_rng())? {
        Some(note) => println!("{}", note),
        None => println!("No notes yet - add one!"),
    }
    Ok(())
}

/// Handle the add-love-note command
pub fn handle_add_love_note(text: String, book: &MemoryBook) -> Result<(), CliError> {
    book.add_love_note(&text)?;
    println!("Added your note.");
    Ok(())
}

/// Handle the unlock command
pub fn handle_unlock(book: &MemoryBook) -> Result<(), CliError> {
    match book.daily_unlock(today(), &mut rand::thread_rng())? {
        UnlockOutcome::Unlocked(message) => {
            println!("Unlocked!");
            println!("{}", message);
        }
        UnlockOutcome::AlreadyUnlocked => {
            println!("Today's secret is already unlocked. Come back tomorrow for another one.");
        }
    }
    Ok(())
}

/// Handle the journal command
pub fn handle_journal(book: &MemoryBook) -> Result<(), CliError> {
    let entries = book.journal()?;
    if entries.is_empty() {
        println!("The journal is empty.");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("#{} {} - {}", i + 1, entry.author, entry.timestamp.format("%Y-%m-%d %H:%M"));
        match entry.visible_text() {
            Some(text) => println!("  {}", text),
            None => println!("  (locked)"),
        }
        if let Some(path) = entry.photo_ref.as_ref().and_then(|p| p.resolve()) {
            println!("  photo: {}", path.display());
        }
    }
    Ok(())
}

/// Handle the add-journal command
pub fn handle_add_journal(
    text: String,
    author: Author,
    photo: Option<PathBuf>,
    lock: Option<String>,
    book: &MemoryBook,
) -> Result<(), CliError> {
    let upload = photo
        .as_deref()
        .map(|path| read_upload(path, PHOTO_EXTENSIONS))
        .transpose()?;
    let entry = book.add_journal_entry(author, &text, upload.as_ref(), lock.as_deref())?;
    if entry.locked {
        println!("Saved a locked entry.");
    } else {
        println!("Saved! Your note is safe here.");
    }
    Ok(())
}

/// Handle the reveal-entry command
pub fn handle_reveal_entry(number: usize, secret: String, book: &MemoryBook) -> Result<(), CliError> {
    let index = number.checked_sub(1).ok_or(CliError::NoSuchEntry(number))?;
    let text = match book.reveal_journal_entry(index, &secret) {
        Err(BookError::EntryNotFound(_)) => return Err(CliError::NoSuchEntry(number)),
        other => other?,
    };
    println!("{}", text);
    Ok(())
}

/// Handle the songs command
pub fn handle_songs(book: &MemoryBook) -> Result<(), CliError> {
    let songs = book.songs()?;
    if songs.is_empty() {
        println!("No songs yet.");
    }
    for song in songs {
        match song.link {
            Some(link) => println!("{} <{}>", song.title, link),
            None => println!("{}", song.title),
        }
        if !song.note.is_empty() {
            println!("  {}", song.note);
        }
    }
    Ok(())
}

/// Handle the add-song command
pub fn handle_add_song(
    title: String,
    link: Option<String>,
    note: String,
    book: &MemoryBook,
) -> Result<(), CliError> {
    let song = book.add_song(&title, link.as_deref(), &note)?;
    println!("Added {}.", song.title);
    Ok(())
}

/// Handle the surprises command
pub fn handle_surprises(book: &MemoryBook) -> Result<(), CliError> {
    let clips = book.surprises()?;
    if clips.is_empty() {
        println!("No voice notes yet.");
    }
    for clip in clips {
        println!("{}", clip.display());
    }
    Ok(())
}

/// Handle the upload-audio command
pub fn handle_upload_audio(file: Option<PathBuf>, book: &MemoryBook) -> Result<(), CliError> {
    let upload = file
        .as_deref()
        .map(|path| read_upload(path, AUDIO_EXTENSIONS))
        .transpose()?;
    let path = book.upload_audio(upload.as_ref())?;
    println!("Saved audio: {}", path.display());
    Ok(())
}

/// Handle the reveal command
pub fn handle_reveal(secret: String, book: &MemoryBook) -> Result<(), CliError> {
    println!("{}", book.reveal_secret(&secret)?);
    Ok(())
}

/// Handle the quiz command
pub fn handle_quiz(answer: Option<String>, config: &Config) -> Result<(), CliError> {
    let quiz = &config.quiz;
    let Some(answer) = answer else {
        println!("{}", quiz.question);
        for option in &quiz.options {
            println!("  - {}", option);
        }
        return Ok(());
    };
    if quiz.check(&answer)? {
        println!("Correct!");
    } else {
        println!("Close, but not quite!");
    }
    Ok(())
}

/// Handle the clear command
pub fn handle_clear(yes: bool, book: &MemoryBook) -> Result<(), CliError> {
    if !yes {
        println!("This deletes every memory, note and upload. Re-run with --yes to confirm.");
        return Ok(());
    }
    let report = book.clear_all()?;
    println!(
        "Cleared everything ({} photo(s), {} audio file(s) removed).",
        report.photos_removed, report.audio_removed
    );
    Ok(())
}

/// Handle the export command
pub fn handle_export(book: &MemoryBook) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&book.export()?)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::RevealGate;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(has_allowed_extension(Path::new("a/b/Beach.JPG"), PHOTO_EXTENSIONS));
        assert!(has_allowed_extension(Path::new("song.wav"), AUDIO_EXTENSIONS));
        assert!(!has_allowed_extension(Path::new("notes.txt"), PHOTO_EXTENSIONS));
        assert!(!has_allowed_extension(Path::new("no_extension"), AUDIO_EXTENSIONS));
    }

    #[test]
    fn unsupported_upload_is_rejected_before_reading() {
        let err = read_upload(Path::new("/nowhere/clip.ogg"), AUDIO_EXTENSIONS).unwrap_err();
        assert!(matches!(err, CliError::UnsupportedFile(..)));
    }

    #[test]
    fn memory_date_defaults_to_today_and_validates() {
        assert_eq!(memory_date(None).unwrap(), today());
        assert!(matches!(memory_date(Some("2025-02-30")), Err(CliError::DateParseError(_))));
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from([
            "keepsake",
            "--passphrase",
            "love",
            "add-journal",
            "hello",
            "--author",
            "partner",
            "--lock",
            "Rome",
        ])
        .unwrap();

        assert_eq!(cli.passphrase.as_deref(), Some("love"));
        assert_eq!(
            cli.command,
            Some(Commands::AddJournal {
                text: "hello".to_string(),
                author: Author::Partner,
                photo: None,
                lock: Some("Rome".to_string()),
            })
        );
        assert!(Cli::try_parse_from(["keepsake", "add-journal", "x", "--author", "them"]).is_err());
    }

    #[test]
    fn wrong_passphrase_opens_no_session() {
        let config = Config {
            passphrase: Some("secret".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            open_session(&config, Some("guess")),
            Err(CliError::GateError(GateError::WrongPassphrase))
        ));
        assert!(matches!(
            open_session(&config, None),
            Err(CliError::GateError(GateError::WrongPassphrase))
        ));
    }

    #[test]
    fn locked_session_cannot_dispatch() {
        let dir = TempDir::new().unwrap();
        let book = MemoryBook::open(dir.path(), RevealGate::new("r", "m")).unwrap();
        let result = dispatch(Commands::Timeline, &Session::new(), &book, &Config::default());
        assert!(matches!(result, Err(CliError::GateError(GateError::Locked))));
    }

    #[test]
    fn upload_photos_command_saves_files() {
        let dir = TempDir::new().unwrap();
        let book = MemoryBook::open(dir.path().join("book"), RevealGate::new("r", "m")).unwrap();
        let photo = dir.path().join("kiss.png");
        fs::write(&photo, b"png").unwrap();

        handle_upload_photos(vec![photo], &book).unwrap();
        assert_eq!(book.album().unwrap().len(), 1);

        assert!(matches!(
            handle_upload_photos(Vec::new(), &book),
            Err(CliError::BookError(BookError::NoFileChosen))
        ));
    }
}
