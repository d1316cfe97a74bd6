use std::fmt::Write;

use crate::timetable::{Change, ChangeKind, ChangeType, Lesson};

/// Render the change list as a short plain-text message.
///
/// Exams are always listed first, then cancellations, then modifications,
/// then added and removed lessons. Markers follow the provider's household
/// convention: 🟡 exam, 🔺 cancelled, 🟢 changed.
pub fn summarize_changes(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "No timetable changes.".to_string();
    }

    let mut lines: Vec<String> = Vec::new();

    for change in ordered(changes) {
        let line = match change.kind {
            ChangeKind::Exam => format!("🟡 Exam: {}", describe(&change.lesson)),
            ChangeKind::Changed => match (&change.before, &change.after) {
                (Some(_), Some(after)) if after.change_type == ChangeType::Cancelled => {
                    format!("🔺 Cancelled: {}", describe(after))
                }
                (Some(before), Some(after)) => {
                    format!(
                        "🟢 Changed: {}{}",
                        describe(after),
                        describe_delta(before, after)
                    )
                }
                _ => format!("🟢 Changed: {}", describe(&change.lesson)),
            },
            ChangeKind::Added => format!("➕ New lesson: {}", describe(&change.lesson)),
            ChangeKind::Removed => format!("➖ Dropped: {}", describe(&change.lesson)),
        };
        lines.push(line);
    }

    let mut out = format!(
        "{} timetable change{}:\n",
        lines.len(),
        if lines.len() == 1 { "" } else { "s" }
    );
    for (index, line) in lines.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, line);
    }
    out.trim_end().to_string()
}

fn ordered(changes: &[Change]) -> Vec<&Change> {
    let mut sorted: Vec<&Change> = changes.iter().collect();
    sorted.sort_by_key(|c| match c.kind {
        ChangeKind::Exam => 0,
        ChangeKind::Changed => {
            if c.after
                .as_ref()
                .map(|a| a.change_type == ChangeType::Cancelled)
                .unwrap_or(false)
            {
                1
            } else {
                2
            }
        }
        ChangeKind::Added => 3,
        ChangeKind::Removed => 4,
    });
    sorted
}

fn describe(lesson: &Lesson) -> String {
    let mut parts = vec![
        join_or_dash(&lesson.subjects),
        format!(
            "{}–{}",
            lesson.start.format("%a %d.%m. %H:%M"),
            lesson.end.format("%H:%M")
        ),
    ];
    if !lesson.rooms.iter().all(|r| r.is_empty()) {
        parts.push(format!("in {}", join_or_dash(&lesson.rooms)));
    }
    if !lesson.teachers.iter().all(|t| t.is_empty()) {
        parts.push(format!("with {}", join_or_dash(&lesson.teachers)));
    }
    parts.join(", ")
}

fn describe_delta(before: &Lesson, after: &Lesson) -> String {
    let mut deltas = Vec::new();
    if before.rooms != after.rooms {
        deltas.push(format!(
            "room {} → {}",
            join_or_dash(&before.rooms),
            join_or_dash(&after.rooms)
        ));
    }
    if before.teachers != after.teachers {
        deltas.push(format!(
            "teacher {} → {}",
            join_or_dash(&before.teachers),
            join_or_dash(&after.teachers)
        ));
    }
    if before.start != after.start || before.end != after.end {
        deltas.push(format!(
            "time {} → {}",
            before.start.format("%H:%M"),
            after.start.format("%H:%M")
        ));
    }
    if before.subjects != after.subjects {
        deltas.push(format!(
            "subject {} → {}",
            join_or_dash(&before.subjects),
            join_or_dash(&after.subjects)
        ));
    }
    if deltas.is_empty() {
        String::new()
    } else {
        format!(" ({})", deltas.join("; "))
    }
}

fn join_or_dash(names: &[String]) -> String {
    let joined = names
        .iter()
        .filter(|n| !n.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::timetable::{diff, Lesson, LessonCode, Snapshot};

    use super::*;

    fn lesson(id: i64, subject: &str, code: Option<LessonCode>, room: &str) -> Lesson {
        let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        Lesson::new(
            id,
            day.and_hms_opt(8, 0, 0).unwrap(),
            day.and_hms_opt(8, 45, 0).unwrap(),
            vec![subject.to_string()],
            vec!["MUE".to_string()],
            vec![room.to_string()],
            code,
        )
    }

    #[test]
    fn empty_change_list_has_a_quiet_summary() {
        assert_eq!(summarize_changes(&[]), "No timetable changes.");
    }

    #[test]
    fn exams_come_first() {
        let old = Snapshot::from_lessons(vec![
            lesson(1, "Mathe", None, "R204"),
            lesson(2, "Sport", None, "Halle"),
        ]);
        let new = Snapshot::from_lessons(vec![
            lesson(1, "Mathe Klausur", None, "R204"),
            lesson(2, "Sport", Some(LessonCode::Cancelled), "Halle"),
            lesson(3, "Kunst", None, "K1"),
        ]);
        let summary = summarize_changes(&diff(&old, &new));
        let exam_pos = summary.find("🟡").unwrap();
        let cancel_pos = summary.find("🔺").unwrap();
        let added_pos = summary.find("➕").unwrap();
        assert!(exam_pos < cancel_pos);
        assert!(cancel_pos < added_pos);
        assert!(summary.contains("Mathe Klausur"));
    }

    #[test]
    fn room_change_shows_old_and_new() {
        let old = Snapshot::from_lessons(vec![lesson(1, "Deutsch", None, "A113")]);
        let new = Snapshot::from_lessons(vec![lesson(1, "Deutsch", None, "B201")]);
        let summary = summarize_changes(&diff(&old, &new));
        assert!(summary.contains("room A113 → B201"), "summary: {summary}");
    }
}
