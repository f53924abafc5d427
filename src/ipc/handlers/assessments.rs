use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{AssessmentSnapshot, Level};
use crate::store;
use serde_json::json;

fn handle_assessments_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let reading_score = match req.params.get("readingScore").and_then(|v| v.as_f64()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing readingScore", None),
    };
    let writing_score = match req.params.get("writingScore").and_then(|v| v.as_f64()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing writingScore", None),
    };

    // Out-of-range scores are rejected up front, never clamped.
    if !(0.0..=100.0).contains(&reading_score) || !(0.0..=100.0).contains(&writing_score) {
        return err(
            &req.id,
            "invalid_score",
            "scores must be between 0 and 100",
            Some(json!({ "readingScore": reading_score, "writingScore": writing_score })),
        );
    }

    match store::load_student(conn, &student_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let snapshot = AssessmentSnapshot {
        date: chrono::Local::now().date_naive(),
        reading_score,
        writing_score,
        level: Level::classify(reading_score, writing_score),
    };

    if let Err(e) = store::append_assessment(conn, &student_id, &snapshot) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "assessments" })),
        );
    }
    if let Err(e) = store::set_current_assessment(conn, &student_id, &snapshot) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }
    state.revisions.bump_students();
    tracing::debug!(
        "recorded assessment for {student_id}: {} ({} / {})",
        snapshot.level.as_str(),
        reading_score,
        writing_score
    );

    match store::load_student(conn, &student_id) {
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assessments.record" => Some(handle_assessments_record(state, req)),
        _ => None,
    }
}
