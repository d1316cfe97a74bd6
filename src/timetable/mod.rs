pub mod adapter;
pub mod classify;
pub mod differ;
pub mod fingerprint;
pub mod schema;
pub mod store;

pub use adapter::{
    lesson_from_record, ElementKind, ElementTable, MalformedRecord, RawPayload, SourceVariant,
};
pub use classify::classify;
pub use differ::{diff, Change, ChangeKind};
pub use fingerprint::fingerprint;
pub use schema::{ChangeType, Lesson, LessonCode, Snapshot};
pub use store::SnapshotStore;
