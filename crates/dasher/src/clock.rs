use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

const FOLDER_STAMP_FORMAT: &[time::format_description::FormatItem<'_>] =
    format_description!("[year][month][day]");

/// Source of wall-clock UTC time for manifest `publishTime`/
/// `availabilityStartTime` (spec §4.2 `utcClock`).
///
/// Injected rather than read from a process-wide singleton, so tests can
/// substitute a fixed clock (spec §9 "Global clock -> injected clock").
pub trait UtcClock: Send + Sync {
    fn now_rfc3339(&self) -> String;

    /// Compact `YYYYMMDD` stamp used for multi-period folder names (spec §8
    /// scenario 3: "segment filenames carry date-named subfolders").
    fn folder_stamp(&self) -> String;
}

pub struct SystemUtcClock;

impl UtcClock for SystemUtcClock {
    fn now_rfc3339(&self) -> String {
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .expect("Rfc3339 formatting of now_utc cannot fail")
    }

    fn folder_stamp(&self) -> String {
        OffsetDateTime::now_utc()
            .format(FOLDER_STAMP_FORMAT)
            .expect("date-only formatting of now_utc cannot fail")
    }
}

/// A clock pinned to one fixed instant, for deterministic tests.
pub struct FixedUtcClock {
    pub rfc3339: String,
    pub folder_stamp: String,
}

impl UtcClock for FixedUtcClock {
    fn now_rfc3339(&self) -> String {
        self.rfc3339.clone()
    }

    fn folder_stamp(&self) -> String {
        self.folder_stamp.clone()
    }
}
