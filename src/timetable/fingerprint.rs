use sha2::{Digest, Sha256};

use crate::timetable::schema::Snapshot;

/// Deterministic digest of a snapshot, used as a cheap equality gate before
/// running a full diff.
///
/// The snapshot is already sorted by `(start, id)` and struct fields
/// serialize in declaration order, so logically identical snapshots digest
/// identically no matter what order the upstream returned the records in.
/// A matching digest is sufficient proof that no notification is needed; a
/// mismatch only means the differ has to look. Not a security boundary.
pub fn fingerprint(snapshot: &Snapshot) -> String {
    let canonical = serde_json::to_string(snapshot).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::timetable::schema::{Lesson, LessonCode, Snapshot};

    use super::*;

    fn lesson(id: i64, hour: u32, code: Option<LessonCode>) -> Lesson {
        let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        Lesson::new(
            id,
            day.and_hms_opt(hour, 0, 0).unwrap(),
            day.and_hms_opt(hour, 45, 0).unwrap(),
            vec!["Mathe".to_string()],
            vec!["MUE".to_string()],
            vec!["R204".to_string()],
            code,
        )
    }

    #[test]
    fn permuted_construction_order_digests_identically() {
        let a = Snapshot::from_lessons(vec![
            lesson(1, 8, None),
            lesson(2, 9, None),
            lesson(3, 10, None),
        ]);
        let b = Snapshot::from_lessons(vec![
            lesson(3, 10, None),
            lesson(1, 8, None),
            lesson(2, 9, None),
        ]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn identical_snapshots_digest_identically() {
        let a = Snapshot::from_lessons(vec![lesson(1, 8, None)]);
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[test]
    fn field_change_changes_digest() {
        let a = Snapshot::from_lessons(vec![lesson(1, 8, None)]);
        let b = Snapshot::from_lessons(vec![lesson(1, 8, Some(LessonCode::Cancelled))]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn empty_snapshot_has_stable_digest() {
        assert_eq!(
            fingerprint(&Snapshot::default()),
            fingerprint(&Snapshot::from_lessons(Vec::new()))
        );
    }
}
