use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::timetable::schema::{ChangeType, Lesson, Snapshot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
    Exam,
}

/// One detected difference between two snapshots.
///
/// `lesson` is the new record for added/changed/exam events and the old
/// record for removed events; `before`/`after` are populated for changed
/// events only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub lesson: Lesson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Lesson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Lesson>,
}

impl Change {
    fn added(lesson: Lesson) -> Self {
        Self {
            kind: ChangeKind::Added,
            lesson,
            before: None,
            after: None,
        }
    }

    fn removed(lesson: Lesson) -> Self {
        Self {
            kind: ChangeKind::Removed,
            lesson,
            before: None,
            after: None,
        }
    }

    fn changed(before: Lesson, after: Lesson) -> Self {
        Self {
            kind: ChangeKind::Changed,
            lesson: after.clone(),
            before: Some(before),
            after: Some(after),
        }
    }

    fn exam(lesson: Lesson) -> Self {
        Self {
            kind: ChangeKind::Exam,
            lesson,
            before: None,
            after: None,
        }
    }
}

/// Compare two snapshots by lesson id and return every difference exactly
/// once, in added, removed, changed/exam order.
///
/// Total over well-formed snapshots; never fails. A lesson whose derived
/// classification newly flips to exam, and which is otherwise untouched
/// apart from the subject text that carries the keyword, produces a single
/// exam event rather than a changed event: a newly scheduled exam is its
/// own category of notification. When any other field moved as well (room,
/// time, teacher, code), the event stays a changed event so the delta is
/// not lost.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<Change> {
    let old_by_id = index_by_id(old);
    let new_by_id = index_by_id(new);

    let mut changes = Vec::new();

    for (id, lesson) in &new_by_id {
        if !old_by_id.contains_key(id) {
            changes.push(Change::added((*lesson).clone()));
        }
    }

    for (id, lesson) in &old_by_id {
        if !new_by_id.contains_key(id) {
            changes.push(Change::removed((*lesson).clone()));
        }
    }

    for (id, before) in &old_by_id {
        let Some(after) = new_by_id.get(id) else {
            continue;
        };
        let newly_exam =
            after.change_type == ChangeType::Exam && before.change_type != ChangeType::Exam;
        if newly_exam && equal_apart_from_subjects(before, after) {
            changes.push(Change::exam((*after).clone()));
        } else if before != after {
            changes.push(Change::changed((*before).clone(), (*after).clone()));
        }
    }

    changes
}

/// Equality over everything except the subject names and the classification
/// they drive. Decides whether a fresh exam flag stands alone or rides
/// along with other modifications.
fn equal_apart_from_subjects(before: &Lesson, after: &Lesson) -> bool {
    before.id == after.id
        && before.start == after.start
        && before.end == after.end
        && before.teachers == after.teachers
        && before.rooms == after.rooms
        && before.code == after.code
}

/// Duplicate ids within one snapshot are a caller contract violation; the
/// last record wins, which may mask a real double-booking, so it is logged
/// rather than silently absorbed.
fn index_by_id(snapshot: &Snapshot) -> BTreeMap<i64, &Lesson> {
    let mut by_id = BTreeMap::new();
    for lesson in snapshot.lessons() {
        if by_id.insert(lesson.id, lesson).is_some() {
            warn!(id = lesson.id, "duplicate lesson id in snapshot, keeping last");
        }
    }
    by_id
}
