use crate::timetable::schema::{ChangeType, LessonCode};

/// Subject-name tokens that mark a period as an exam. The provider's own
/// code does not distinguish exams from ordinary substitutions, so this
/// lexical check takes priority over the code.
const EXAM_KEYWORDS: [&str; 4] = ["prüfung", "klausur", "test", "pruefung"];

/// Map a raw provider code plus the subject names to a change type.
///
/// Provider codes: `None` means a regular lesson, `Irregular` means room,
/// teacher, or time changed, `Cancelled` means the lesson was dropped.
pub fn classify(code: Option<LessonCode>, subjects: &[String]) -> ChangeType {
    let subject_text = subjects.join(" ").to_lowercase();
    if EXAM_KEYWORDS.iter().any(|kw| subject_text.contains(kw)) {
        return ChangeType::Exam;
    }
    match code {
        Some(LessonCode::Cancelled) => ChangeType::Cancelled,
        Some(LessonCode::Irregular) => ChangeType::Changed,
        None => ChangeType::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exam_keyword_overrides_missing_code() {
        assert_eq!(
            classify(None, &subjects(&["Mathe Klausur"])),
            ChangeType::Exam
        );
    }

    #[test]
    fn exam_keyword_overrides_provider_code() {
        assert_eq!(
            classify(Some(LessonCode::Cancelled), &subjects(&["Deutsch Prüfung"])),
            ChangeType::Exam
        );
        assert_eq!(
            classify(Some(LessonCode::Irregular), &subjects(&["Bio-Test"])),
            ChangeType::Exam
        );
    }

    #[test]
    fn exam_match_is_case_insensitive() {
        assert_eq!(
            classify(None, &subjects(&["MATHE KLAUSUR"])),
            ChangeType::Exam
        );
        assert_eq!(classify(None, &subjects(&["Pruefung EF"])), ChangeType::Exam);
    }

    #[test]
    fn cancelled_wins_over_non_exam_text() {
        assert_eq!(
            classify(Some(LessonCode::Cancelled), &subjects(&["Englisch"])),
            ChangeType::Cancelled
        );
    }

    #[test]
    fn irregular_maps_to_changed() {
        assert_eq!(
            classify(Some(LessonCode::Irregular), &subjects(&["Sport"])),
            ChangeType::Changed
        );
    }

    #[test]
    fn no_code_no_keyword_is_normal() {
        assert_eq!(classify(None, &subjects(&["Erdkunde"])), ChangeType::Normal);
        assert_eq!(classify(None, &[]), ChangeType::Normal);
    }
}
