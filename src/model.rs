use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Proficiency tier derived from a pair of scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Developing,
    Proficient,
}

impl Level {
    /// Average the two scores and map onto a tier. The 60 and 80 cut
    /// points belong to the upper tier.
    pub fn classify(reading: f64, writing: f64) -> Level {
        let average = (reading + writing) / 2.0;
        if average >= 80.0 {
            Level::Proficient
        } else if average >= 60.0 {
            Level::Developing
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Developing => "developing",
            Level::Proficient => "proficient",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        match s {
            "beginner" => Some(Level::Beginner),
            "developing" => Some(Level::Developing),
            "proficient" => Some(Level::Proficient),
            _ => None,
        }
    }
}

/// One dated (reading, writing, level) record in a student's history.
/// Immutable once appended; history order is order of append, which is
/// not guaranteed to match date order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSnapshot {
    pub date: NaiveDate,
    pub reading_score: f64,
    pub writing_score: f64,
    pub level: Level,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub grade: String,
    pub subject: String,
    pub created_at: String,
    /// Cached count of students referencing this class. Updated on
    /// student add/delete, floored at zero; eventually consistent.
    pub student_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_id: String,
    pub class_name: String,
    pub current_level: Level,
    pub reading_score: f64,
    pub writing_score: f64,
    /// None until the first assessment is recorded.
    pub last_assessment: Option<NaiveDate>,
    pub assessment_history: Vec<AssessmentSnapshot>,
}

/// Partial update for a class. Defined fields win over the existing
/// value; absent fields leave it untouched. Scores, levels and history
/// never travel through patches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
}

impl ClassPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.grade.is_none() && self.subject.is_none()
    }
}

impl Class {
    pub fn apply(&mut self, patch: &ClassPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(grade) = &patch.grade {
            self.grade = grade.clone();
        }
        if let Some(subject) = &patch.subject {
            self.subject = subject.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentPatch {
    pub name: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

impl Student {
    pub fn apply(&mut self, patch: &StudentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_tier_boundaries() {
        assert_eq!(Level::classify(80.0, 80.0), Level::Proficient);
        assert_eq!(Level::classify(60.0, 60.0), Level::Developing);
        assert_eq!(Level::classify(59.0, 59.0), Level::Beginner);
        assert_eq!(Level::classify(0.0, 0.0), Level::Beginner);
        assert_eq!(Level::classify(100.0, 100.0), Level::Proficient);
    }

    #[test]
    fn classify_uses_the_average_not_either_score() {
        // 100 + 60 averages to 80: proficient even though writing alone is not.
        assert_eq!(Level::classify(100.0, 60.0), Level::Proficient);
        // 79.5 average stays developing.
        assert_eq!(Level::classify(80.0, 79.0), Level::Developing);
        // (0 + 100) / 2 = 50: beginner despite the perfect reading score.
        assert_eq!(Level::classify(0.0, 100.0), Level::Beginner);
    }

    #[test]
    fn level_round_trips_through_text() {
        for level in [Level::Beginner, Level::Developing, Level::Proficient] {
            assert_eq!(Level::parse(level.as_str()), Some(level));
        }
        assert_eq!(Level::parse("advanced"), None);
    }

    #[test]
    fn class_patch_defined_fields_win() {
        let mut class = Class {
            id: "c1".into(),
            name: "Grade 3A".into(),
            teacher_id: "t1".into(),
            teacher_name: "Teacher Demo".into(),
            grade: "3".into(),
            subject: "General".into(),
            created_at: "2026-01-05T09:00:00Z".into(),
            student_count: 4,
        };
        class.apply(&ClassPatch {
            name: Some("Grade 3B".into()),
            grade: None,
            subject: None,
        });
        assert_eq!(class.name, "Grade 3B");
        assert_eq!(class.grade, "3");
        assert_eq!(class.subject, "General");
        assert_eq!(class.student_count, 4);
    }

    #[test]
    fn student_patch_rejects_score_fields() {
        let err = serde_json::from_value::<StudentPatch>(serde_json::json!({
            "readingScore": 90
        }));
        assert!(err.is_err(), "score fields must not be patchable");
    }
}
