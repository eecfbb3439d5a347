use chrono::{NaiveDate, NaiveDateTime};

/// A row of the `project` table.
///
/// `id` and `created_at` stay `None` until the record is first saved.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Project {
    #[sqlx(rename = "project_id")]
    pub id: Option<i32>,
    pub name: String,
    pub description: String,
    pub created_at: Option<NaiveDateTime>,
    pub due_date: NaiveDate,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            created_at: None,
            due_date,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
