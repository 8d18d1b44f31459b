/// Database row types and write outcomes. These map directly to SQLite rows
/// and stay independent of the HTTP DTOs in mingle-types.
use mingle_types::models::ProfileSnippet;

/// Cumulative counts for one calendar day that saw at least one connection.
pub struct DensityRow {
    pub date: String,
    pub links: i64,
    pub nodes: i64,
}

/// A registrant considered for smart matching.
pub struct CandidateRow {
    pub user_id: i64,
    pub username: String,
    pub fullname: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub photo_url: Option<String>,
}

pub struct FeedbackRow {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectKind {
    /// The pair already has a row at this event; nothing was written.
    Duplicate,
    FirstMeeting,
    /// New row for a pair that has met at some other event before.
    Reconnection,
}

#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub kind: ConnectKind,
    pub profile: Option<ProfileSnippet>,
    /// Rows the pair had across all events before this scan.
    pub encounter_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered { qr_token: String },
    UnknownUser,
    UnknownEvent,
}
