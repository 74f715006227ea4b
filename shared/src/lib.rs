//! Shared data model and storage for the song catalog service.
//!
//! The backend crate owns HTTP concerns; everything that describes a song,
//! how lyrics are split into verses, and how songs are persisted lives here.

pub mod lyrics;
pub mod song_store;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date layout used by the external metadata service, e.g. `16.07.2006`.
pub const RELEASE_DATE_FORMAT: &str = "%d.%m.%Y";

/// A stored catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Generated on insert, never reused.
    pub id: i64,
    /// Performing artist or group.
    pub group: String,
    /// Song name. Exposed as `song` on the wire.
    #[serde(rename = "song")]
    pub title: String,
    /// Release date reported by the metadata service.
    pub release_date: NaiveDate,
    /// Full lyrics, verses separated by a blank line.
    pub text: String,
    /// External audio/video link.
    pub link: String,
    /// Unix milliseconds, set on insert.
    #[serde(default, skip_serializing)]
    pub created_at: i64,
    /// Unix milliseconds, refreshed on every update.
    #[serde(default, skip_serializing)]
    pub updated_at: i64,
}

/// Fields of a song before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    /// Performing artist or group.
    pub group: String,
    /// Song name.
    pub title: String,
    /// Parsed release date.
    pub release_date: NaiveDate,
    /// Full lyrics.
    pub text: String,
    /// External audio/video link.
    pub link: String,
}

impl NewSong {
    /// Builds the insertable record from a request pair and its enrichment.
    pub fn enriched(
        group: String,
        title: String,
        detail: SongDetail,
    ) -> Result<Self, chrono::ParseError> {
        let release_date = parse_release_date(&detail.release_date)?;
        Ok(Self {
            group,
            title,
            release_date,
            text: detail.text,
            link: detail.link,
        })
    }
}

/// Optional substring filters for listing. Absent fields do not constrain
/// the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    /// Case-insensitive substring of the group name.
    pub group: Option<String>,
    /// Case-insensitive substring of the song name.
    pub song: Option<String>,
}

impl SongFilter {
    /// Builds a filter, dropping empty values.
    pub fn new(group: Option<String>, song: Option<String>) -> Self {
        Self {
            group: group.filter(|value| !value.is_empty()),
            song: song.filter(|value| !value.is_empty()),
        }
    }
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRequest {
    /// Performing artist or group.
    pub group: String,
    /// Song name.
    pub song: String,
}

/// Response shape of the external metadata service's `/info` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDetail {
    /// Release date as `DD.MM.YYYY`.
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    /// Full lyrics.
    pub text: String,
    /// External audio/video link.
    pub link: String,
}

/// Envelope for paginated song listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Number of matching rows before pagination.
    pub total: u64,
    /// Requested page, 1-based.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Rows on this page.
    pub data: Vec<T>,
}

/// Envelope for verse-paginated lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsResponse {
    /// Verse count of the whole song.
    pub total: u64,
    /// Requested page, 1-based.
    pub page: u32,
    /// Requested verses per page.
    pub size: u32,
    /// Verses on this page.
    pub verses: Vec<String>,
}

/// Parses a `DD.MM.YYYY` release date.
pub fn parse_release_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_FORMAT)
}
