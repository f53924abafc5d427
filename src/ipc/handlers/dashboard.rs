use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::stats;
use crate::store;
use serde_json::json;

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn handle_stats_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = req.params.get("classId").and_then(|v| v.as_str());
    let students = match store::load_students(conn, class_id) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({ "stats": stats::statistics(&students, today()) }),
    )
}

fn handle_stats_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };
    let students = match store::load_students(conn, Some(&class_id)) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({ "stats": stats::class_statistics(&students, today()) }),
    )
}

fn handle_progress_by_month(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = req.params.get("classId").and_then(|v| v.as_str());
    let include_all_months = req
        .params
        .get("includeAllMonths")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let students = match store::load_students(conn, class_id) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let points = stats::progress_by_month(&students, today(), include_all_months);
    ok(&req.id, json!({ "points": points }))
}

fn handle_progress_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let student = match store::load_student(conn, &student_id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let points = stats::student_progress(&student, today());
    ok(&req.id, json!({ "points": points }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.overview" => Some(handle_stats_overview(state, req)),
        "stats.class" => Some(handle_stats_class(state, req)),
        "progress.byMonth" => Some(handle_progress_by_month(state, req)),
        "progress.student" => Some(handle_progress_student(state, req)),
        _ => None,
    }
}
