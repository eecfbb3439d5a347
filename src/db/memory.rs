//! In-memory [`ProjectGateway`] for exercising the paging and worker code
//! without a database.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::ProjectGateway;
use crate::error::PersistenceError;
use crate::models::Project;

#[derive(Default)]
struct Rows {
    projects: Vec<Project>,
    last_id: i32,
    failures: u32,
}

#[derive(Default)]
pub struct MemoryGateway {
    rows: Mutex<Rows>,
    delay: Option<Duration>,
}

impl MemoryGateway {
    /// Every operation sleeps for `delay` before touching the rows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make the next operation fail.
    pub fn fail_next(&self) {
        self.rows.lock().unwrap().failures += 1;
    }

    /// Store a project synchronously, assigning id and creation time.
    pub fn insert(&self, mut project: Project) -> Project {
        let mut rows = self.rows.lock().unwrap();
        rows.last_id += 1;
        project.id = Some(rows.last_id);
        if project.created_at.is_none() {
            project.created_at = Some(timestamp(rows.last_id));
        }
        rows.projects.push(project.clone());
        project
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().projects.len()
    }

    async fn begin(&self, operation: &'static str) -> Result<(), PersistenceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.failures > 0 {
            rows.failures -= 1;
            return Err(PersistenceError::Query {
                operation,
                source: sqlx::Error::PoolTimedOut,
            });
        }
        Ok(())
    }

    fn select<F>(&self, keep: F, offset: Option<i64>, limit: Option<i64>) -> Vec<Project>
    where
        F: Fn(&Project) -> bool,
    {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Project> = rows.projects.iter().filter(|p| keep(p)).cloned().collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.map_or(usize::MAX, |l| l.max(0) as usize);
        matching.into_iter().skip(offset).take(limit).collect()
    }

    fn tally<F>(&self, keep: F) -> i64
    where
        F: Fn(&Project) -> bool,
    {
        self.rows.lock().unwrap().projects.iter().filter(|p| keep(p)).count() as i64
    }
}

/// Creation times one second apart so ordering is deterministic.
fn timestamp(id: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t + chrono::Duration::seconds(i64::from(id)))
        .unwrap()
}

impl ProjectGateway for MemoryGateway {
    async fn save(&self, project: &mut Project) -> Result<(), PersistenceError> {
        self.begin("save project").await?;
        match project.id {
            None => *project = self.insert(project.clone()),
            Some(id) => {
                let mut rows = self.rows.lock().unwrap();
                if let Some(row) = rows.projects.iter_mut().find(|p| p.id == Some(id)) {
                    row.name = project.name.clone();
                    row.description = project.description.clone();
                    row.due_date = project.due_date;
                }
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, PersistenceError> {
        self.begin("delete project").await?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.projects.len();
        rows.projects.retain(|p| p.id != Some(id));
        Ok(rows.projects.len() < before)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Project>, PersistenceError> {
        self.begin("find project").await?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.projects.iter().find(|p| p.id == Some(id)).cloned())
    }

    async fn list(&self, offset: Option<i64>, limit: Option<i64>) -> Result<Vec<Project>, PersistenceError> {
        self.begin("list projects").await?;
        Ok(self.select(|_| true, offset, limit))
    }

    async fn list_by_name_contains(
        &self,
        substring: &str,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Project>, PersistenceError> {
        self.begin("search projects by name").await?;
        Ok(self.select(|p| p.name.contains(substring), offset, limit))
    }

    async fn list_by_due_date(
        &self,
        due_date: NaiveDate,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Project>, PersistenceError> {
        self.begin("list projects by due date").await?;
        Ok(self.select(|p| p.due_date == due_date, offset, limit))
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        self.begin("count projects").await?;
        Ok(self.tally(|_| true))
    }

    async fn count_by_name_contains(&self, substring: &str) -> Result<i64, PersistenceError> {
        self.begin("count projects by name").await?;
        Ok(self.tally(|p| p.name.contains(substring)))
    }

    async fn count_by_due_date(&self, due_date: NaiveDate) -> Result<i64, PersistenceError> {
        self.begin("count projects by due date").await?;
        Ok(self.tally(|p| p.due_date == due_date))
    }
}
