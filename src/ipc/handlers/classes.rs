use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Class, ClassPatch};
use crate::store;
use serde_json::json;
use uuid::Uuid;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    let teacher_id = state.session.as_ref().map(|s| s.id.clone());
    match store::load_classes(conn, teacher_id.as_deref()) {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };

    match store::load_class(conn, &class_id) {
        Ok(Some(class)) => ok(&req.id, json!({ "class": class })),
        Ok(None) => err(&req.id, "not_found", "class not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(teacher) = state.session.as_ref() else {
        return err(&req.id, "no_session", "sign in before creating a class", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let grade = match req.params.get("grade").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing grade", None),
    };
    let subject = match req.params.get("subject").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing subject", None),
    };

    let class = Class {
        id: Uuid::new_v4().to_string(),
        name,
        teacher_id: teacher.id.clone(),
        teacher_name: teacher.name.clone(),
        grade,
        subject,
        created_at: chrono::Utc::now().to_rfc3339(),
        student_count: 0,
    };

    if let Err(e) = store::insert_class(conn, &class) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }
    state.revisions.bump_classes();

    ok(&req.id, json!({ "classId": class.id, "name": class.name }))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };
    let Some(raw_patch) = req.params.get("patch") else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    let mut patch: ClassPatch = match serde_json::from_value(raw_patch.clone()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", format!("invalid patch: {e}"), None),
    };
    if patch.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "patch must include at least one field",
            None,
        );
    }
    if let Some(name) = patch.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return err(&req.id, "bad_params", "name must not be empty", None);
        }
    }

    let mut class = match store::load_class(conn, &class_id) {
        Ok(Some(c)) => c,
        Ok(None) => return err(&req.id, "not_found", "class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let renamed = patch
        .name
        .as_ref()
        .map(|n| *n != class.name)
        .unwrap_or(false);
    class.apply(&patch);

    if let Err(e) = store::update_class_row(conn, &class) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }
    state.revisions.bump_classes();

    // Member students carry a denormalized class name; keep it aligned.
    if renamed {
        if let Err(e) = store::rename_class_students(conn, &class.id, &class.name) {
            return err(
                &req.id,
                "db_update_failed",
                e.to_string(),
                Some(json!({ "table": "students" })),
            );
        }
        state.revisions.bump_students();
    }

    ok(&req.id, json!({ "class": class }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };

    match store::load_class(conn, &class_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let student_ids = match store::student_ids_in_class(conn, &class_id) {
        Ok(ids) => ids,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // Child-first cascade, one student at a time, no enclosing
    // transaction. A failed student delete halts here and leaves the
    // class in place; the store stays partially deleted until retried.
    for student_id in &student_ids {
        if let Err(e) = store::delete_student(conn, student_id) {
            tracing::warn!("cascade halted deleting student {student_id}: {e}");
            state.revisions.bump_students();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": "students", "studentId": student_id })),
            );
        }
    }
    if !student_ids.is_empty() {
        state.revisions.bump_students();
    }

    if let Err(e) = store::delete_class_row(conn, &class_id) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }
    state.revisions.bump_classes();

    ok(&req.id, json!({ "ok": true, "deletedStudents": student_ids.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.get" => Some(handle_classes_get(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
