use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::assets::AssetRef;
use crate::gate::{GateError, check_passphrase};
use crate::store::Record;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub date: NaiveDate,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default, alias = "photo")]
    pub photo_ref: Option<AssetRef>,
}

/// Who wrote a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    #[serde(alias = "Me")]
    Me,
    #[serde(alias = "You (him)", alias = "You")]
    Partner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub author: Author,
    #[serde(default)]
    pub text: String,
    #[serde(alias = "date", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "photo")]
    pub photo_ref: Option<AssetRef>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub lock_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub note: String,
}

/// A message in the pool the daily unlock draws from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMessage {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub message: Option<String>,
}

fn untitled() -> String {
    UNTITLED.to_string()
}

fn title_or_placeholder(title: String) -> String {
    if title.trim().is_empty() {
        untitled()
    } else {
        title
    }
}

/// Accepts RFC 3339 as well as the offset-less `YYYY-MM-DDTHH:MM:SS.ffffff`
/// form written by older data files, which is read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl TimelineEntry {
    /// A blank title is replaced with "Untitled"
    pub fn new(date: NaiveDate, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            date,
            title: title_or_placeholder(title.into()),
            description: description.into(),
            photo_ref: None,
        }
    }

    pub fn with_photo(mut self, photo_ref: AssetRef) -> Self {
        self.photo_ref = Some(photo_ref);
        self
    }
}

impl Record for TimelineEntry {
    fn validate(mut self) -> Result<Self, String> {
        self.title = title_or_placeholder(self.title);
        Ok(self)
    }
}

impl Author {
    pub const ALL: [Author; 2] = [Author::Me, Author::Partner];

    pub fn as_str(self) -> &'static str {
        match self {
            Author::Me => "me",
            Author::Partner => "partner",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Author {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Author::ALL
            .into_iter()
            .find(|author| author.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown author '{}', expected 'me' or 'partner'", s))
    }
}

impl JournalEntry {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            author,
            text: text.into(),
            timestamp: Utc::now(),
            photo_ref: None,
            locked: false,
            lock_secret: None,
        }
    }

    pub fn with_photo(mut self, photo_ref: AssetRef) -> Self {
        self.photo_ref = Some(photo_ref);
        self
    }

    /// Lock the entry behind `secret`. Returns `None` for an empty secret.
    pub fn locked_with(mut self, secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return None;
        }
        self.locked = true;
        self.lock_secret = Some(secret);
        Some(self)
    }

    /// The text, unless the entry is locked
    pub fn visible_text(&self) -> Option<&str> {
        (!self.locked).then_some(self.text.as_str())
    }

    /// The text of a locked entry when `attempt` matches its secret
    pub fn reveal(&self, attempt: &str) -> Result<&str, GateError> {
        if !self.locked {
            return Ok(&self.text);
        }
        match self.lock_secret.as_deref() {
            Some(secret) if check_passphrase(secret, attempt) => Ok(&self.text),
            _ => Err(GateError::WrongSecret),
        }
    }
}

impl Record for JournalEntry {
    fn validate(self) -> Result<Self, String> {
        if self.locked && self.lock_secret.as_deref().is_none_or(str::is_empty) {
            return Err("locked entry has no lock secret".to_string());
        }
        Ok(self)
    }
}

impl Song {
    pub fn new(title: impl Into<String>, link: Option<String>, note: impl Into<String>) -> Self {
        Self {
            title: title_or_placeholder(title.into()),
            link: link.filter(|l| !l.trim().is_empty()),
            note: note.into(),
        }
    }
}

impl Record for Song {
    fn validate(mut self) -> Result<Self, String> {
        self.title = title_or_placeholder(self.title);
        Ok(self)
    }
}

impl DailyMessage {
    pub fn new(date: Option<NaiveDate>, message: impl Into<String>) -> Self {
        Self {
            date,
            message: Some(message.into()),
        }
    }
}

impl Record for DailyMessage {}

/// Love notes are bare strings
impl Record for String {
    fn validate(self) -> Result<Self, String> {
        if self.trim().is_empty() {
            return Err("blank love note".to_string());
        }
        Ok(self)
    }
}
