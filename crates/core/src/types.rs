/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Queue job identifiers are UUID v4 strings.
pub type JobId = String;
