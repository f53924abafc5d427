use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, TeacherSession};
use serde_json::json;

fn handle_session_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teacher_id = match req.params.get("teacherId").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing teacherId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if teacher_id.is_empty() || name.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "teacherId/name must not be empty",
            None,
        );
    }
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let school = req
        .params
        .get("school")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let session = TeacherSession {
        id: teacher_id,
        name,
        email,
        school,
    };
    tracing::debug!("session opened for teacher {}", session.id);
    state.session = Some(session.clone());
    ok(&req.id, json!({ "teacher": session }))
}

fn handle_session_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "teacher": state.session }))
}

fn handle_session_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.open" => Some(handle_session_open(state, req)),
        "session.current" => Some(handle_session_current(state, req)),
        "session.close" => Some(handle_session_close(state, req)),
        _ => None,
    }
}
