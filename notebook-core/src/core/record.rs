//! Common shape shared by every persisted record.

use chrono::{DateTime, Utc};

/// A record identified by a string id and stamped with a modification time.
///
/// Implemented by [`Note`](super::note::Note), [`Category`](super::category::Category)
/// and [`Tag`](super::tag::Tag) so that sync and merge code can work over any
/// collection.
pub trait Record: Clone {
    fn id(&self) -> &str;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Returns the latest `updated_at` in `records`, or `None` when it is empty.
pub fn latest_update<'a, R, I>(records: I) -> Option<DateTime<Utc>>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records.into_iter().map(|r| r.updated_at()).max()
}

/// Generates a fresh random record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
