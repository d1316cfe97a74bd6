use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timetable::classify::classify;

/// The provider's own raw change flag as it appears on a period record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LessonCode {
    Cancelled,
    Irregular,
}

impl Display for LessonCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Irregular => write!(f, "irregular"),
        }
    }
}

/// Derived, display-oriented classification of a lesson.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Normal,
    Cancelled,
    Changed,
    Exam,
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Normal => "normal",
            Self::Cancelled => "cancelled",
            Self::Changed => "changed",
            Self::Exam => "exam",
        };
        write!(f, "{display}")
    }
}

/// One scheduled class period, in canonical form.
///
/// Equality over every field is what the differ means by "unchanged";
/// matching `id`s only establish that two records describe the same period
/// across snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub subjects: Vec<String>,
    pub teachers: Vec<String>,
    pub rooms: Vec<String>,
    pub code: Option<LessonCode>,
    pub change_type: ChangeType,
}

impl Lesson {
    pub fn new(
        id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        subjects: Vec<String>,
        teachers: Vec<String>,
        rooms: Vec<String>,
        code: Option<LessonCode>,
    ) -> Self {
        let change_type = classify(code, &subjects);
        Self {
            id,
            start,
            end,
            subjects,
            teachers,
            rooms,
            code,
            change_type,
        }
    }
}

/// Full ordered set of lessons for the lookahead window at one point in time.
///
/// Sorted by `(start, id)` on construction and immutable afterwards, so the
/// fingerprint is stable regardless of upstream return order. Serializes as a
/// plain JSON array of lessons; loading a persisted snapshot is a direct
/// structural deserialization, no re-normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Snapshot {
    lessons: Vec<Lesson>,
}

impl Snapshot {
    pub fn from_lessons(mut lessons: Vec<Lesson>) -> Self {
        lessons.sort_by(|a, b| (a.start, a.id).cmp(&(b.start, b.id)));
        Self { lessons }
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn lesson(id: i64, day: u32, hour: u32) -> Lesson {
        Lesson::new(
            id,
            at(day, hour),
            at(day, hour + 1),
            vec!["Mathe".to_string()],
            vec!["MUE".to_string()],
            vec!["R204".to_string()],
            None,
        )
    }

    #[test]
    fn snapshot_sorts_by_start_then_id() {
        let snapshot = Snapshot::from_lessons(vec![
            lesson(7, 2, 8),
            lesson(3, 1, 10),
            lesson(5, 1, 8),
            lesson(2, 1, 8),
        ]);
        let ids: Vec<i64> = snapshot.lessons().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![2, 5, 3, 7]);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = Snapshot::from_lessons(vec![lesson(1, 1, 8), lesson(2, 1, 9)]);
        let serialized = serde_json::to_string_pretty(&snapshot).unwrap();
        let loaded: Snapshot = serde_json::from_str(&serialized).unwrap();
        assert_eq!(snapshot, loaded);
    }

    #[test]
    fn lesson_new_derives_change_type() {
        let cancelled = Lesson::new(
            1,
            at(1, 8),
            at(1, 9),
            vec!["Englisch".to_string()],
            vec![],
            vec![],
            Some(LessonCode::Cancelled),
        );
        assert_eq!(cancelled.change_type, ChangeType::Cancelled);
    }
}
