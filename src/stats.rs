use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::model::{AssessmentSnapshot, Level, Student};

/// Window for the "recently assessed" dashboard counter, in calendar
/// days back from the evaluation date.
const RECENT_WINDOW_DAYS: i64 = 30;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_label(month: u32) -> &'static str {
    MONTH_LABELS[(month - 1) as usize]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_students: usize,
    pub beginner_count: usize,
    pub developing_count: usize,
    pub proficient_count: usize,
    pub need_support_count: usize,
    pub recent_assessments: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatistics {
    pub total_students: usize,
    pub beginner_count: usize,
    pub developing_count: usize,
    pub proficient_count: usize,
    pub need_support_count: usize,
    pub recent_assessments: usize,
    pub average_reading_score: i64,
    pub average_writing_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub month: String,
    pub beginner_count: usize,
    pub developing_count: usize,
    pub proficient_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgressPoint {
    pub month: String,
    pub reading_score: f64,
    pub writing_score: f64,
    pub level: Level,
}

/// Level tallies and the trailing-30-day assessment counter over an
/// in-memory population. Callers pass the evaluation date so results
/// are reproducible in tests.
pub fn statistics(students: &[Student], today: NaiveDate) -> Statistics {
    if students.is_empty() {
        return Statistics::default();
    }

    let cutoff = today - Duration::days(RECENT_WINDOW_DAYS);
    let mut stats = Statistics {
        total_students: students.len(),
        ..Statistics::default()
    };
    for student in students {
        match student.current_level {
            Level::Beginner => stats.beginner_count += 1,
            Level::Developing => stats.developing_count += 1,
            Level::Proficient => stats.proficient_count += 1,
        }
        if student
            .last_assessment
            .map(|date| date >= cutoff)
            .unwrap_or(false)
        {
            stats.recent_assessments += 1;
        }
    }
    // Every beginner is flagged as needing support; this is the same
    // count by definition, kept as its own field in the contract.
    stats.need_support_count = stats.beginner_count;
    stats
}

/// The base tallies plus mean reading/writing scores rounded to the
/// nearest integer. All-zero for an empty population.
pub fn class_statistics(students: &[Student], today: NaiveDate) -> ClassStatistics {
    if students.is_empty() {
        return ClassStatistics::default();
    }

    let base = statistics(students, today);
    let count = students.len() as f64;
    let reading_total: f64 = students.iter().map(|s| s.reading_score).sum();
    let writing_total: f64 = students.iter().map(|s| s.writing_score).sum();

    ClassStatistics {
        total_students: base.total_students,
        beginner_count: base.beginner_count,
        developing_count: base.developing_count,
        proficient_count: base.proficient_count,
        need_support_count: base.need_support_count,
        recent_assessments: base.recent_assessments,
        average_reading_score: (reading_total / count).round() as i64,
        average_writing_score: (writing_total / count).round() as i64,
    }
}

/// Of the snapshots falling in the given month, the last appended wins,
/// even when an earlier position carries a later date.
fn latest_in_month(
    history: &[AssessmentSnapshot],
    year: i32,
    month: u32,
) -> Option<&AssessmentSnapshot> {
    history
        .iter()
        .filter(|snap| snap.date.year() == year && snap.date.month() == month)
        .last()
}

fn months_present(students: &[Student], year: i32) -> BTreeSet<u32> {
    let mut months = BTreeSet::new();
    for student in students {
        for snap in &student.assessment_history {
            if snap.date.year() == year {
                months.insert(snap.date.month());
            }
        }
    }
    months
}

/// Per-month level tallies for the current calendar year. Months carry
/// no year qualifier in the label; the year restriction keeps them
/// unambiguous. An empty month set yields an empty list, not zero-filled
/// entries.
pub fn progress_by_month(
    students: &[Student],
    today: NaiveDate,
    include_all_months: bool,
) -> Vec<ProgressPoint> {
    let year = today.year();
    let mut months = months_present(students, year);
    if include_all_months {
        months.extend(1u32..=12);
    }
    if months.is_empty() {
        return Vec::new();
    }

    months
        .into_iter()
        .map(|month| {
            let mut point = ProgressPoint {
                month: month_label(month).to_string(),
                beginner_count: 0,
                developing_count: 0,
                proficient_count: 0,
            };
            for student in students {
                let Some(snap) = latest_in_month(&student.assessment_history, year, month) else {
                    continue;
                };
                match snap.level {
                    Level::Beginner => point.beginner_count += 1,
                    Level::Developing => point.developing_count += 1,
                    Level::Proficient => point.proficient_count += 1,
                }
            }
            point
        })
        .collect()
}

/// Single-student variant: raw scores and level of the month's
/// representative snapshot.
pub fn student_progress(student: &Student, today: NaiveDate) -> Vec<StudentProgressPoint> {
    let year = today.year();
    let mut months = BTreeSet::new();
    for snap in &student.assessment_history {
        if snap.date.year() == year {
            months.insert(snap.date.month());
        }
    }
    if months.is_empty() {
        return Vec::new();
    }

    months
        .into_iter()
        .map(|month| {
            match latest_in_month(&student.assessment_history, year, month) {
                Some(snap) => StudentProgressPoint {
                    month: month_label(month).to_string(),
                    reading_score: snap.reading_score,
                    writing_score: snap.writing_score,
                    level: snap.level,
                },
                // Months enter the set only via this student's own
                // history, so a representative always exists.
                None => StudentProgressPoint {
                    month: month_label(month).to_string(),
                    reading_score: 0.0,
                    writing_score: 0.0,
                    level: Level::Beginner,
                },
            }
        })
        .collect()
}
