use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::timetable::schema::{Lesson, LessonCode, Snapshot};

/// Which upstream wire shape produced a payload. Selected by the active
/// fetch collaborator, not sniffed from the records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceVariant {
    SessionRpc,
    RestGrid,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElementKind {
    Class,
    Teacher,
    Subject,
    Room,
}

impl ElementKind {
    /// Numeric element types as the weekly-grid API encodes them.
    pub fn from_type_id(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::Class),
            2 => Some(Self::Teacher),
            3 => Some(Self::Subject),
            4 => Some(Self::Room),
            _ => None,
        }
    }
}

/// id -> display-name lookup for payloads that reference schedule elements
/// by id instead of embedding them. A miss resolves to an empty name, never
/// an error.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    names: BTreeMap<(ElementKind, i64), String>,
}

impl ElementTable {
    pub fn insert(&mut self, kind: ElementKind, id: i64, name: impl Into<String>) {
        self.names.insert((kind, id), name.into());
    }

    pub fn name(&self, kind: ElementKind, id: i64) -> String {
        self.names.get(&(kind, id)).cloned().unwrap_or_default()
    }

    /// Build a table from the `elements` section of a weekly-grid response:
    /// an array of `{type, id, name|displayname}` objects. Entries with an
    /// unknown type or no id are skipped.
    pub fn from_rest_elements(elements: &[Value]) -> Self {
        let mut table = Self::default();
        for entry in elements {
            let Some(object) = entry.as_object() else {
                continue;
            };
            let Some(kind) = int_value(object.get("type")).and_then(ElementKind::from_type_id)
            else {
                continue;
            };
            let Some(id) = int_value(object.get("id")) else {
                continue;
            };
            let name = string_from_keys(object, &["name", "displayname", "displayName"])
                .unwrap_or_default();
            table.insert(kind, id, name);
        }
        table
    }
}

/// A raw record lacked one of the fields no lesson can be built without.
/// Everything else (names, codes, optional fields) degrades gracefully; an
/// id is never fabricated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("period record has no usable lesson id")]
    MissingId,
    #[error("lesson {id}: missing or unparsable date")]
    BadDate { id: i64 },
    #[error("lesson {id}: missing or unparsable start time")]
    BadStartTime { id: i64 },
    #[error("lesson {id}: missing or unparsable end time")]
    BadEndTime { id: i64 },
}

/// One fetched batch of period records plus the lookup table that came with
/// it, exactly as the fetch collaborator handed it over.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub variant: SourceVariant,
    pub records: Vec<Value>,
    pub elements: ElementTable,
}

impl RawPayload {
    /// Convert the whole batch, failing on the first malformed record.
    pub fn to_snapshot_strict(&self) -> Result<Snapshot, MalformedRecord> {
        let mut lessons = Vec::with_capacity(self.records.len());
        for record in &self.records {
            lessons.push(lesson_from_record(self.variant, record, &self.elements)?);
        }
        Ok(Snapshot::from_lessons(lessons))
    }

    /// Convert the whole batch, skipping malformed records with a warning.
    pub fn to_snapshot_lossy(&self) -> Snapshot {
        let mut lessons = Vec::with_capacity(self.records.len());
        for record in &self.records {
            match lesson_from_record(self.variant, record, &self.elements) {
                Ok(lesson) => lessons.push(lesson),
                Err(err) => warn!(%err, "skipping malformed period record"),
            }
        }
        Snapshot::from_lessons(lessons)
    }
}

/// Convert one upstream period record into a canonical lesson.
///
/// Tolerant by contract: a field present in one upstream variant and absent
/// in another means "empty" or "none", never a failure. Only a missing id,
/// date, start time, or end time is malformed.
pub fn lesson_from_record(
    variant: SourceVariant,
    record: &Value,
    elements: &ElementTable,
) -> Result<Lesson, MalformedRecord> {
    let object = record.as_object().ok_or(MalformedRecord::MissingId)?;

    let id = int_from_keys(object, &["id", "lessonId", "lesson_id"])
        .ok_or(MalformedRecord::MissingId)?;

    let (start, end) = parse_times(object, id)?;

    let (subjects, teachers, rooms) = match variant {
        SourceVariant::SessionRpc => (
            inline_names(object, &["su", "subjects"], ElementKind::Subject, elements),
            inline_names(object, &["te", "teachers"], ElementKind::Teacher, elements),
            inline_names(object, &["ro", "rooms"], ElementKind::Room, elements),
        ),
        SourceVariant::RestGrid => {
            let by_kind = grid_element_names(object, elements);
            (
                by_kind.subjects,
                by_kind.teachers,
                by_kind.rooms,
            )
        }
        SourceVariant::Mobile => (
            inline_names(object, &["subjects", "su"], ElementKind::Subject, elements),
            inline_names(object, &["teachers", "te"], ElementKind::Teacher, elements),
            inline_names(object, &["rooms", "ro"], ElementKind::Room, elements),
        ),
    };

    let code = parse_code(variant, object);

    Ok(Lesson::new(id, start, end, subjects, teachers, rooms, code))
}

/// Start and end are assembled from a date plus zero-padded HHMM times, or
/// taken from full date-time strings where the variant carries those. Local
/// wall-clock throughout, no timezone math.
fn parse_times(
    object: &Map<String, Value>,
    id: i64,
) -> Result<(NaiveDateTime, NaiveDateTime), MalformedRecord> {
    if let Some(start) = datetime_from_keys(object, &["startDateTime", "start"]) {
        let end = datetime_from_keys(object, &["endDateTime", "end"])
            .ok_or(MalformedRecord::BadEndTime { id })?;
        return Ok((start, end));
    }

    let date = parse_date(object.get("date")).ok_or(MalformedRecord::BadDate { id })?;
    let start_time = parse_hhmm(object.get("startTime"))
        .ok_or(MalformedRecord::BadStartTime { id })?;
    let end_time =
        parse_hhmm(object.get("endTime")).ok_or(MalformedRecord::BadEndTime { id })?;
    Ok((date.and_time(start_time), date.and_time(end_time)))
}

fn parse_code(variant: SourceVariant, object: &Map<String, Value>) -> Option<LessonCode> {
    match variant {
        SourceVariant::SessionRpc => code_from_string(object.get("code")),
        SourceVariant::RestGrid => {
            // The weekly grid spells the flag through cellState; some
            // deployments also carry a plain code field.
            match object.get("cellState").and_then(Value::as_str) {
                Some(state) => match state.to_ascii_uppercase().as_str() {
                    "CANCEL" | "CANCELLED" | "FREE" => Some(LessonCode::Cancelled),
                    "SUBSTITUTION" | "ROOMSUBSTITUTION" | "SHIFT" | "ADDITIONAL" => {
                        Some(LessonCode::Irregular)
                    }
                    _ => None,
                },
                None => code_from_string(object.get("code")),
            }
        }
        SourceVariant::Mobile => {
            let flags = object.get("is").and_then(Value::as_object);
            let flag = |key: &str| {
                flags
                    .and_then(|f| f.get(key))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            if flag("cancelled") {
                Some(LessonCode::Cancelled)
            } else if flag("irregular") || flag("substitution") {
                Some(LessonCode::Irregular)
            } else {
                code_from_string(object.get("code"))
            }
        }
    }
}

fn code_from_string(value: Option<&Value>) -> Option<LessonCode> {
    match value.and_then(Value::as_str)?.to_ascii_lowercase().as_str() {
        "cancelled" | "cancel" => Some(LessonCode::Cancelled),
        "irregular" => Some(LessonCode::Irregular),
        _ => None,
    }
}

/// Display names from an inline sub-record array: entries are objects with a
/// name, objects with only an id (resolved through the lookup table), or
/// bare strings. Order is preserved verbatim.
fn inline_names(
    object: &Map<String, Value>,
    keys: &[&str],
    kind: ElementKind,
    elements: &ElementTable,
) -> Vec<String> {
    let Some(array) = keys.iter().find_map(|k| object.get(*k)).and_then(Value::as_array)
    else {
        return Vec::new();
    };
    let mut names = Vec::with_capacity(array.len());
    for entry in array {
        match entry {
            Value::String(s) => names.push(s.clone()),
            Value::Object(fields) => {
                if let Some(name) =
                    string_from_keys(fields, &["name", "displayname", "displayName", "longname"])
                {
                    names.push(name);
                } else if let Some(id) = int_from_keys(fields, &["id"]) {
                    names.push(elements.name(kind, id));
                }
            }
            _ => {}
        }
    }
    names
}

struct GridNames {
    subjects: Vec<String>,
    teachers: Vec<String>,
    rooms: Vec<String>,
}

/// The weekly grid references elements as `{type, id}` pairs; every name
/// goes through the lookup table supplied alongside the payload.
fn grid_element_names(object: &Map<String, Value>, elements: &ElementTable) -> GridNames {
    let mut names = GridNames {
        subjects: Vec::new(),
        teachers: Vec::new(),
        rooms: Vec::new(),
    };
    let Some(refs) = object.get("elements").and_then(Value::as_array) else {
        return names;
    };
    for entry in refs {
        let Some(fields) = entry.as_object() else {
            continue;
        };
        let Some(kind) = int_value(fields.get("type")).and_then(ElementKind::from_type_id) else {
            continue;
        };
        let Some(id) = int_from_keys(fields, &["id"]) else {
            continue;
        };
        let name = elements.name(kind, id);
        match kind {
            ElementKind::Subject => names.subjects.push(name),
            ElementKind::Teacher => names.teachers.push(name),
            ElementKind::Room => names.rooms.push(name),
            ElementKind::Class => {}
        }
    }
    names
}

fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::Number(n) => {
            let raw = n.as_i64()?;
            NaiveDate::parse_from_str(&raw.to_string(), "%Y%m%d").ok()
        }
        Value::String(s) => {
            let trimmed = s.trim();
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
                .ok()
        }
        _ => None,
    }
}

/// Times arrive as integers like 800 or 1345; zero-pad to HHMM before
/// splitting into hour and minute.
fn parse_hhmm(value: Option<&Value>) -> Option<NaiveTime> {
    let raw = int_value(value)?;
    if !(0..=2359).contains(&raw) {
        return None;
    }
    let padded = format!("{raw:04}");
    let hour: u32 = padded[..2].parse().ok()?;
    let minute: u32 = padded[2..].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn datetime_from_keys(object: &Map<String, Value>, keys: &[&str]) -> Option<NaiveDateTime> {
    let raw = keys
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(Value::as_str)?;
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn int_from_keys(object: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| int_value(object.get(*k)))
}

fn int_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn string_from_keys(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = object.get(*key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return Some(s.trim().to_string());
            }
        }
    }
    None
}
