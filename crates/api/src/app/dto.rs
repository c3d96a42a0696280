use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;

use groundwork_infra::Record;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub body: String,
}

impl Record for Note {
    const COLUMNS: &'static [&'static str] = &["id", "body"];

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Note {
            id: row.try_get("id")?,
            body: row.try_get("body")?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
