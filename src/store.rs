use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::model::{AssessmentSnapshot, Class, Level, Student};

const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT).ok()
}

const CLASS_COLUMNS: &str =
    "id, name, teacher_id, teacher_name, grade, subject, created_at, student_count";

fn class_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        id: row.get(0)?,
        name: row.get(1)?,
        teacher_id: row.get(2)?,
        teacher_name: row.get(3)?,
        grade: row.get(4)?,
        subject: row.get(5)?,
        created_at: row.get(6)?,
        student_count: row.get(7)?,
    })
}

pub fn load_classes(conn: &Connection, teacher_id: Option<&str>) -> rusqlite::Result<Vec<Class>> {
    match teacher_id {
        Some(tid) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLASS_COLUMNS} FROM classes WHERE teacher_id = ? ORDER BY name"
            ))?;
            let rows = stmt.query_map([tid], class_from_row)?.collect();
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {CLASS_COLUMNS} FROM classes ORDER BY name"))?;
            let rows = stmt.query_map([], class_from_row)?.collect();
            rows
        }
    }
}

pub fn load_class(conn: &Connection, class_id: &str) -> rusqlite::Result<Option<Class>> {
    conn.query_row(
        &format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = ?"),
        [class_id],
        class_from_row,
    )
    .optional()
}

pub fn insert_class(conn: &Connection, class: &Class) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO classes(id, name, teacher_id, teacher_name, grade, subject, created_at, student_count)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &class.id,
            &class.name,
            &class.teacher_id,
            &class.teacher_name,
            &class.grade,
            &class.subject,
            &class.created_at,
            class.student_count,
        ),
    )?;
    Ok(())
}

/// Write back the patchable columns of a merged class.
pub fn update_class_row(conn: &Connection, class: &Class) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE classes SET name = ?, grade = ?, subject = ? WHERE id = ?",
        (&class.name, &class.grade, &class.subject, &class.id),
    )?;
    Ok(())
}

/// Rewrite the denormalized class name on every member student.
pub fn rename_class_students(
    conn: &Connection,
    class_id: &str,
    class_name: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE students SET class_name = ? WHERE class_id = ?",
        (class_name, class_id),
    )
}

/// Adjust the cached member count, floored at zero. A missing class is
/// not an error (the class may have been deleted concurrently); returns
/// the number of rows touched.
pub fn bump_student_count(conn: &Connection, class_id: &str, delta: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE classes SET student_count = MAX(0, student_count + ?) WHERE id = ?",
        (delta, class_id),
    )
}

pub fn delete_class_row(conn: &Connection, class_id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM classes WHERE id = ?", [class_id])?;
    Ok(())
}

const STUDENT_COLUMNS: &str =
    "id, class_id, name, class_name, current_level, reading_score, writing_score, last_assessment";

fn student_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    let level: String = row.get(4)?;
    let last_assessment: Option<String> = row.get(7)?;
    Ok(Student {
        id: row.get(0)?,
        class_id: row.get(1)?,
        name: row.get(2)?,
        class_name: row.get(3)?,
        current_level: Level::parse(&level).unwrap_or(Level::Beginner),
        reading_score: row.get(5)?,
        writing_score: row.get(6)?,
        last_assessment: last_assessment.as_deref().and_then(parse_day),
        assessment_history: Vec::new(),
    })
}

/// Full-collection read, optionally restricted to one class. History is
/// attached in append order; all further filtering and grouping happens
/// in memory on the returned slice.
pub fn load_students(conn: &Connection, class_id: Option<&str>) -> rusqlite::Result<Vec<Student>> {
    let mut students: Vec<Student> = match class_id {
        Some(cid) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE class_id = ? ORDER BY rowid"
            ))?;
            let rows = stmt.query_map([cid], student_from_row)?.collect::<Result<_, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY rowid"))?;
            let rows = stmt.query_map([], student_from_row)?.collect::<Result<_, _>>()?;
            rows
        }
    };
    attach_history(conn, &mut students)?;
    Ok(students)
}

pub fn load_student(conn: &Connection, student_id: &str) -> rusqlite::Result<Option<Student>> {
    let student = conn
        .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"),
            [student_id],
            student_from_row,
        )
        .optional()?;
    let Some(student) = student else {
        return Ok(None);
    };
    let mut single = vec![student];
    attach_history(conn, &mut single)?;
    Ok(single.pop())
}

fn attach_history(conn: &Connection, students: &mut [Student]) -> rusqlite::Result<()> {
    if students.is_empty() {
        return Ok(());
    }

    let placeholders = std::iter::repeat("?")
        .take(students.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT student_id, date, reading_score, writing_score, level
         FROM assessments
         WHERE student_id IN ({})
         ORDER BY student_id, seq",
        placeholders
    );
    let bind_values: Vec<Value> = students
        .iter()
        .map(|s| Value::Text(s.id.clone()))
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind_values), |r| {
        let student_id: String = r.get(0)?;
        let date: String = r.get(1)?;
        let reading_score: f64 = r.get(2)?;
        let writing_score: f64 = r.get(3)?;
        let level: String = r.get(4)?;
        Ok((student_id, date, reading_score, writing_score, level))
    })?;

    let mut by_student: HashMap<String, Vec<AssessmentSnapshot>> = HashMap::new();
    for row in rows {
        let (student_id, date, reading_score, writing_score, level) = row?;
        let Some(date) = parse_day(&date) else {
            continue;
        };
        by_student
            .entry(student_id)
            .or_default()
            .push(AssessmentSnapshot {
                date,
                reading_score,
                writing_score,
                level: Level::parse(&level).unwrap_or(Level::Beginner),
            });
    }

    for student in students.iter_mut() {
        if let Some(history) = by_student.remove(&student.id) {
            student.assessment_history = history;
        }
    }
    Ok(())
}

pub fn insert_student(conn: &Connection, student: &Student) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students(id, class_id, name, class_name, current_level, reading_score, writing_score, last_assessment)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student.id,
            &student.class_id,
            &student.name,
            &student.class_name,
            student.current_level.as_str(),
            student.reading_score,
            student.writing_score,
            student.last_assessment.map(format_day),
        ),
    )?;
    Ok(())
}

/// Write back the patchable columns of a merged student.
pub fn update_student_row(conn: &Connection, student: &Student) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE students SET name = ? WHERE id = ?",
        (&student.name, &student.id),
    )?;
    Ok(())
}

/// Append a snapshot at the next sequence position for the student.
pub fn append_assessment(
    conn: &Connection,
    student_id: &str,
    snapshot: &AssessmentSnapshot,
) -> rusqlite::Result<()> {
    let seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(seq), -1) + 1 FROM assessments WHERE student_id = ?",
        [student_id],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO assessments(id, student_id, seq, date, reading_score, writing_score, level)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            student_id,
            seq,
            format_day(snapshot.date),
            snapshot.reading_score,
            snapshot.writing_score,
            snapshot.level.as_str(),
        ),
    )?;
    Ok(())
}

/// Merge the recorded snapshot into the student's current fields,
/// leaving everything else untouched.
pub fn set_current_assessment(
    conn: &Connection,
    student_id: &str,
    snapshot: &AssessmentSnapshot,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE students
         SET reading_score = ?, writing_score = ?, current_level = ?, last_assessment = ?
         WHERE id = ?",
        (
            snapshot.reading_score,
            snapshot.writing_score,
            snapshot.level.as_str(),
            format_day(snapshot.date),
            student_id,
        ),
    )?;
    Ok(())
}

pub fn student_ids_in_class(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT id FROM students WHERE class_id = ? ORDER BY rowid")?;
    let rows = stmt.query_map([class_id], |r| r.get::<_, String>(0))?.collect();
    rows
}

/// Point delete of one student document: history rows first, then the
/// student row. No enclosing transaction; callers sequence their own
/// cascades.
pub fn delete_student(conn: &Connection, student_id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM assessments WHERE student_id = ?", [student_id])?;
    conn.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    Ok(())
}
