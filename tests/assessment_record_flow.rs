mod test_support;

use serde_json::json;
use test_support::{
    open_workspace_and_session, request_err, request_ok, spawn_sidecar, temp_dir,
};

fn setup_student(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        "setup-class",
        "classes.create",
        json!({ "name": "Grade 4B", "grade": "4", "subject": "General" }),
    );
    let class_id = created
        .get("classId")
        .and_then(|v| v.as_str())
        .expect("classId")
        .to_string();
    let created = request_ok(
        stdin,
        reader,
        "setup-student",
        "students.create",
        json!({ "classId": class_id, "name": "Rahul Kumar" }),
    );
    created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string()
}

#[test]
fn recording_classifies_and_appends_history() {
    let workspace = temp_dir("skillmap-record-flow");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace_and_session(&mut stdin, &mut reader, &workspace);
    let student_id = setup_student(&mut stdin, &mut reader);

    // A new student starts unassessed.
    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        fetched.pointer("/student/currentLevel").and_then(|v| v.as_str()),
        Some("beginner")
    );
    assert!(fetched
        .pointer("/student/lastAssessment")
        .map(|v| v.is_null())
        .unwrap_or(false));

    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();

    let recorded = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assessments.record",
        json!({ "studentId": student_id, "readingScore": 85, "writingScore": 90 }),
    );
    let student = recorded.get("student").expect("student");
    assert_eq!(
        student.get("currentLevel").and_then(|v| v.as_str()),
        Some("proficient")
    );
    assert_eq!(
        student.get("lastAssessment").and_then(|v| v.as_str()),
        Some(today.as_str())
    );
    let history = student
        .get("assessmentHistory")
        .and_then(|v| v.as_array())
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].get("level").and_then(|v| v.as_str()),
        Some("proficient")
    );
    assert_eq!(history[0].get("date").and_then(|v| v.as_str()), Some(today.as_str()));

    // A second recording appends; it never rewrites the first snapshot.
    let recorded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assessments.record",
        json!({ "studentId": student_id, "readingScore": 40, "writingScore": 35 }),
    );
    let student = recorded.get("student").expect("student");
    assert_eq!(
        student.get("currentLevel").and_then(|v| v.as_str()),
        Some("beginner")
    );
    let history = student
        .get("assessmentHistory")
        .and_then(|v| v.as_array())
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].get("level").and_then(|v| v.as_str()),
        Some("proficient")
    );
    assert_eq!(
        history[1].get("level").and_then(|v| v.as_str()),
        Some("beginner")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn out_of_range_scores_are_rejected_without_a_write() {
    let workspace = temp_dir("skillmap-record-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace_and_session(&mut stdin, &mut reader, &workspace);
    let student_id = setup_student(&mut stdin, &mut reader);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "assessments.record",
        json!({ "studentId": student_id, "readingScore": -1, "writingScore": 50 }),
    );
    assert_eq!(code, "invalid_score");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "assessments.record",
        json!({ "studentId": student_id, "readingScore": 50, "writingScore": 101 }),
    );
    assert_eq!(code, "invalid_score");

    // Nothing was persisted by either rejected call.
    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "studentId": student_id }),
    );
    let history = fetched
        .pointer("/student/assessmentHistory")
        .and_then(|v| v.as_array())
        .expect("history");
    assert!(history.is_empty());
    assert_eq!(
        fetched.pointer("/student/currentLevel").and_then(|v| v.as_str()),
        Some("beginner")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn recording_for_an_unknown_student_is_not_found() {
    let workspace = temp_dir("skillmap-record-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace_and_session(&mut stdin, &mut reader, &workspace);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "assessments.record",
        json!({ "studentId": "missing", "readingScore": 70, "writingScore": 70 }),
    );
    assert_eq!(code, "not_found");

    let _ = std::fs::remove_dir_all(workspace);
}
