use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::timetable::{Change, ChangeKind, ChangeType, Lesson, Snapshot};

pub fn render_snapshot_table(snapshot: &Snapshot) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Id", "Start", "End", "Subject", "Teacher", "Room", "Status",
    ]);

    for lesson in snapshot.lessons() {
        table.add_row(Row::from(vec![
            Cell::new(lesson.id),
            Cell::new(lesson.start.format("%Y-%m-%d %H:%M")),
            Cell::new(lesson.end.format("%H:%M")),
            Cell::new(join(&lesson.subjects)),
            Cell::new(join(&lesson.teachers)),
            Cell::new(join(&lesson.rooms)),
            status_cell(lesson.change_type),
        ]));
    }
    table.to_string()
}

pub fn render_changes_table(changes: &[Change]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Id", "Start", "Subject", "Detail"]);

    for change in changes {
        let kind = match change.kind {
            ChangeKind::Added => Cell::new("ADDED").fg(Color::Green),
            ChangeKind::Removed => Cell::new("REMOVED").fg(Color::Red),
            ChangeKind::Changed => Cell::new("CHANGED").fg(Color::Yellow),
            ChangeKind::Exam => Cell::new("EXAM").fg(Color::Magenta),
        };
        table.add_row(Row::from(vec![
            kind,
            Cell::new(change.lesson.id),
            Cell::new(change.lesson.start.format("%Y-%m-%d %H:%M")),
            Cell::new(join(&change.lesson.subjects)),
            Cell::new(change_detail(change)),
        ]));
    }
    table.to_string()
}

fn change_detail(change: &Change) -> String {
    match (&change.before, &change.after) {
        (Some(before), Some(after)) => {
            let mut parts = Vec::new();
            if before.rooms != after.rooms {
                parts.push(format!(
                    "room {} → {}",
                    join(&before.rooms),
                    join(&after.rooms)
                ));
            }
            if before.teachers != after.teachers {
                parts.push(format!(
                    "teacher {} → {}",
                    join(&before.teachers),
                    join(&after.teachers)
                ));
            }
            if before.start != after.start {
                parts.push(format!(
                    "start {} → {}",
                    before.start.format("%H:%M"),
                    after.start.format("%H:%M")
                ));
            }
            if before.code != after.code {
                parts.push(format!(
                    "status {} → {}",
                    code_label(before),
                    code_label(after)
                ));
            }
            parts.join("; ")
        }
        _ => String::new(),
    }
}

fn status_cell(change_type: ChangeType) -> Cell {
    match change_type {
        ChangeType::Normal => Cell::new("normal"),
        ChangeType::Cancelled => Cell::new("cancelled").fg(Color::Red),
        ChangeType::Changed => Cell::new("changed").fg(Color::Yellow),
        ChangeType::Exam => Cell::new("exam").fg(Color::Magenta),
    }
}

fn code_label(lesson: &Lesson) -> String {
    lesson
        .code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "regular".to_string())
}

fn join(names: &[String]) -> String {
    names.join("/")
}
