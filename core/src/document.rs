use crate::index::DocId;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Number of body characters shown as a snippet.
pub const SNIPPET_CHARS: usize = 120;

lazy_static! {
    static ref DATETIME_RE: Regex = Regex::new(
        r"(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?(?:[\sT]*(\d{1,2})\s*[:：]\s*(\d{2})(?:\s*[:：]\s*(\d{2}))?)?"
    )
    .expect("valid regex");
}

/// A stored news article. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

/// An article extracted by the crawler, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub url: String,
    pub title: String,
    pub body: String,
    pub published_at: OffsetDateTime,
}

impl NewDocument {
    pub fn with_id(self, id: DocId) -> Document {
        Document { id, url: self.url, title: self.title, body: self.body, published_at: self.published_at }
    }
}

impl Document {
    /// First [`SNIPPET_CHARS`] characters of the body, `…` appended when cut.
    pub fn snippet(&self) -> String {
        snippet_of(&self.body)
    }

    pub fn published_rfc3339(&self) -> String {
        self.published_at.format(&Rfc3339).unwrap_or_default()
    }
}

pub fn snippet_of(body: &str) -> String {
    let body = body.trim();
    let mut chars = body.char_indices();
    match chars.nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// Parse the date-time forms found on news pages: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`,
/// slash or dot separated dates, and `YYYY年MM月DD日 HH:MM`. Values without an
/// offset are taken as UTC; a bare date is midnight.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    find_timestamp(raw)
}

/// First date-time pattern anywhere in `text`.
pub fn find_timestamp(text: &str) -> Option<OffsetDateTime> {
    DATETIME_RE.captures_iter(text).find_map(|caps| {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = i32::try_from(num(1)?).ok()?;
        let month = Month::try_from(u8::try_from(num(2)?).ok()?).ok()?;
        let day = u8::try_from(num(3)?).ok()?;
        let date = Date::from_calendar_date(year, month, day).ok()?;
        let hour = u8::try_from(num(4).unwrap_or(0)).ok()?;
        let minute = u8::try_from(num(5).unwrap_or(0)).ok()?;
        let second = u8::try_from(num(6).unwrap_or(0)).ok()?;
        let time = Time::from_hms(hour, minute, second).ok()?;
        Some(PrimitiveDateTime::new(date, time).assume_utc())
    })
}
