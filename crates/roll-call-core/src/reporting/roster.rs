use crate::storage::models::{Roster, StudentProfile};

/// Distinct class names in roster order.
pub fn class_names(roster: &Roster) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    for student in roster.values() {
        if !student.class_name.is_empty() && !classes.contains(&student.class_name) {
            classes.push(student.class_name.clone());
        }
    }
    classes
}

/// Case-insensitive substring search over id, name, class, roll number and course.
pub fn search_students<'a>(roster: &'a Roster, term: &str) -> Vec<(&'a str, &'a StudentProfile)> {
    let needle = term.trim().to_lowercase();
    roster
        .iter()
        .filter(|(student_id, student)| {
            needle.is_empty()
                || [
                    student_id.as_str(),
                    student.name.as_str(),
                    student.class_name.as_str(),
                    student.roll_no.as_str(),
                    student.course.as_deref().unwrap_or(""),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .map(|(student_id, student)| (student_id.as_str(), student))
        .collect()
}
