use std::path::PathBuf;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The signed-in teacher as supplied by the external identity provider.
/// Held in process state only; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSession {
    pub id: String,
    pub name: String,
    pub email: String,
    pub school: String,
}

/// Monotonic per-collection revisions. The two collections advance
/// independently; no cross-collection ordering is implied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Revisions {
    pub classes: u64,
    pub students: u64,
}

impl Revisions {
    pub fn bump_classes(&mut self) {
        self.classes += 1;
    }

    pub fn bump_students(&mut self) {
        self.students += 1;
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<TeacherSession>,
    pub revisions: Revisions,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            db: None,
            session: None,
            revisions: Revisions::default(),
        }
    }
}
