pub mod assets;
pub mod book;
pub mod cli;
pub mod collections;
pub mod config;
pub mod games;
pub mod gate;
pub mod models;
pub mod store;
pub mod utils;

pub use assets::{AssetRef, AssetStore};
pub use book::{MemoryBook, UnlockOutcome, Upload};
pub use config::Config;
pub use gate::{AccessGate, GateState, RevealGate, Session};
pub use models::{Author, DailyMessage, JournalEntry, Song, TimelineEntry};
pub use store::DocumentStore;
pub use utils::Profile;
