use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::PersistenceError;
use crate::models::Project;

#[cfg(test)]
pub mod memory;

/// Column list shared across project queries.
const COLUMNS: &str = "project_id, name, description, created_at, due_date";

/// Newest first; the id breaks ties so offsets stay stable.
const ORDER_BY: &str = " ORDER BY created_at DESC, project_id DESC";

/// Data access for project records.
///
/// Every operation either succeeds or fails with a [`PersistenceError`];
/// nothing is retried. Asking for a row that does not exist is not a failure.
pub trait ProjectGateway: Send + Sync {
    /// Insert the project when it has no id yet, otherwise update its
    /// name, description and due date. A fresh insert writes the generated
    /// id and creation time back onto `project`.
    fn save(&self, project: &mut Project) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Remove the row; returns whether one existed.
    fn delete_by_id(&self, id: i32) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    fn find_by_id(&self, id: i32) -> impl Future<Output = Result<Option<Project>, PersistenceError>> + Send;

    fn list(
        &self,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Project>, PersistenceError>> + Send;

    fn list_by_name_contains(
        &self,
        substring: &str,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Project>, PersistenceError>> + Send;

    fn list_by_due_date(
        &self,
        due_date: NaiveDate,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Project>, PersistenceError>> + Send;

    fn count(&self) -> impl Future<Output = Result<i64, PersistenceError>> + Send;

    fn count_by_name_contains(&self, substring: &str) -> impl Future<Output = Result<i64, PersistenceError>> + Send;

    fn count_by_due_date(&self, due_date: NaiveDate) -> impl Future<Output = Result<i64, PersistenceError>> + Send;
}

/// Row filter shared by the list and count queries.
#[derive(Debug, Clone)]
enum Criteria {
    All,
    NameLike(String),
    DueDate(NaiveDate),
}

impl Criteria {
    fn name_contains(substring: &str) -> Self {
        Criteria::NameLike(format!("%{}%", escape_like(substring)))
    }

    fn push_where(self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Criteria::All => {}
            Criteria::NameLike(pattern) => {
                query.push(" WHERE name LIKE ").push_bind(pattern).push(" ESCAPE '\\'");
            }
            Criteria::DueDate(date) => {
                query.push(" WHERE due_date = ").push_bind(date);
            }
        }
    }
}

/// Escape LIKE metacharacters so the search text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn select_query(criteria: Criteria, offset: Option<i64>, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM project"));
    criteria.push_where(&mut query);
    query.push(ORDER_BY);
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = offset {
        query.push(" OFFSET ").push_bind(offset);
    }
    query
}

fn count_query(criteria: Criteria) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM project");
    criteria.push_where(&mut query);
    query
}

/// Database connection pool
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self::from_pool(pool, config.query_timeout()))
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }

    /// Run one statement under the query timeout, logging any failure.
    async fn run<T, F>(&self, operation: &'static str, statement: F) -> Result<T, PersistenceError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let result = match tokio::time::timeout(self.query_timeout, statement).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(source)) => PersistenceError::Query { operation, source },
            Err(_) => PersistenceError::Timeout {
                operation,
                after: self.query_timeout,
            },
        };
        error!(operation, error = %result.chain(), "database operation failed");
        Err(result)
    }

    async fn fetch_projects(
        &self,
        operation: &'static str,
        criteria: Criteria,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Project>, PersistenceError> {
        let mut query = select_query(criteria, offset, limit);
        let projects = self
            .run(operation, query.build_query_as::<Project>().fetch_all(&self.pool))
            .await?;
        debug!(operation, ?offset, ?limit, rows = projects.len(), "fetched projects");
        Ok(projects)
    }

    async fn fetch_count(&self, operation: &'static str, criteria: Criteria) -> Result<i64, PersistenceError> {
        let mut query = count_query(criteria);
        self.run(operation, query.build_query_scalar::<i64>().fetch_one(&self.pool))
            .await
    }

    async fn insert(&self, project: &mut Project) -> Result<(), PersistenceError> {
        let created_at = project
            .created_at
            .unwrap_or_else(|| Local::now().naive_local());
        let (id, stored_at): (i32, NaiveDateTime) = self
            .run(
                "insert project",
                sqlx::query_as(
                    r#"
                    INSERT INTO project (name, description, created_at, due_date)
                    VALUES ($1, $2, $3, $4)
                    RETURNING project_id, created_at
                    "#,
                )
                .bind(&project.name)
                .bind(&project.description)
                .bind(created_at)
                .bind(project.due_date)
                .fetch_one(&self.pool),
            )
            .await?;

        project.id = Some(id);
        project.created_at = Some(stored_at);
        debug!(id, "inserted project");
        Ok(())
    }

    async fn update(&self, id: i32, project: &Project) -> Result<(), PersistenceError> {
        let result = self
            .run(
                "update project",
                sqlx::query(
                    r#"
                    UPDATE project
                    SET name = $1, description = $2, due_date = $3
                    WHERE project_id = $4
                    "#,
                )
                .bind(&project.name)
                .bind(&project.description)
                .bind(project.due_date)
                .bind(id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            warn!(id, "update matched no project");
        } else {
            debug!(id, "updated project");
        }
        Ok(())
    }
}

impl ProjectGateway for Database {
    async fn save(&self, project: &mut Project) -> Result<(), PersistenceError> {
        match project.id {
            None => self.insert(project).await,
            Some(id) => self.update(id, project).await,
        }
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool, PersistenceError> {
        let result = self
            .run(
                "delete project",
                sqlx::query("DELETE FROM project WHERE project_id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        let removed = result.rows_affected() > 0;
        debug!(id, removed, "deleted project");
        Ok(removed)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Project>, PersistenceError> {
        let query = format!("SELECT {COLUMNS} FROM project WHERE project_id = $1");
        self.run(
            "find project",
            sqlx::query_as::<_, Project>(&query)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list(&self, offset: Option<i64>, limit: Option<i64>) -> Result<Vec<Project>, PersistenceError> {
        self.fetch_projects("list projects", Criteria::All, offset, limit)
            .await
    }

    async fn list_by_name_contains(
        &self,
        substring: &str,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Project>, PersistenceError> {
        self.fetch_projects(
            "search projects by name",
            Criteria::name_contains(substring),
            offset,
            limit,
        )
        .await
    }

    async fn list_by_due_date(
        &self,
        due_date: NaiveDate,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Project>, PersistenceError> {
        self.fetch_projects(
            "list projects by due date",
            Criteria::DueDate(due_date),
            offset,
            limit,
        )
        .await
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        self.fetch_count("count projects", Criteria::All).await
    }

    async fn count_by_name_contains(&self, substring: &str) -> Result<i64, PersistenceError> {
        self.fetch_count(
            "count projects by name",
            Criteria::name_contains(substring),
        )
        .await
    }

    async fn count_by_due_date(&self, due_date: NaiveDate) -> Result<i64, PersistenceError> {
        self.fetch_count("count projects by due date", Criteria::DueDate(due_date))
            .await
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    tracing::info!(max_connections = config.max_connections, "database connection established");
    Ok(db)
}
