use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Coalesced change signal for the two collections. Callers hand back
/// the revisions they last saw; a `changed` flag tells them whether a
/// re-read (and re-aggregation) is worthwhile. The streams are
/// independent; nothing is implied about cross-collection ordering.
fn handle_changes_poll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let seen_classes = req.params.get("classes").and_then(|v| v.as_u64());
    let seen_students = req.params.get("students").and_then(|v| v.as_u64());

    let revs = state.revisions;
    ok(
        &req.id,
        json!({
            "classes": {
                "rev": revs.classes,
                "changed": seen_classes.map(|s| s != revs.classes).unwrap_or(true),
            },
            "students": {
                "rev": revs.students,
                "changed": seen_students.map(|s| s != revs.students).unwrap_or(true),
            },
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "changes.poll" => Some(handle_changes_poll(state, req)),
        _ => None,
    }
}
