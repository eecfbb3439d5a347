use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::db::ProjectGateway;
use crate::models::Project;
use crate::paging::{self, PageSize, PageState, SearchFilter};

/// Manage project records. Runs the interactive table when no command is given.
#[derive(Debug, Parser)]
#[command(name = "project_manager", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one page of projects, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = PageSize::default(), value_parser = parse_page_size)]
        page_size: PageSize,
    },
    /// Print how many projects match
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only projects whose name contains this text
    #[arg(long, conflicts_with = "due")]
    pub search: Option<String>,
    /// Only projects due on this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_filter(&self) -> SearchFilter {
        match (&self.search, self.due) {
            (_, Some(date)) => SearchFilter::DueDate(date),
            (Some(text), None) => SearchFilter::by_name(text),
            (None, None) => SearchFilter::All,
        }
    }
}

fn parse_page_size(value: &str) -> Result<PageSize, String> {
    value
        .parse::<u32>()
        .ok()
        .and_then(PageSize::from_value)
        .ok_or_else(|| format!("page size must be one of {}", PageSize::describe_all()))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

pub fn format_project(project: &Project) -> String {
    let id = project.id.map(|id| id.to_string()).unwrap_or_default();
    let created = project
        .created_at
        .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    format!(
        "{:>6}  {:<24}  {:<19}  {}  {}",
        id,
        project.name,
        created,
        project.due_date.format("%Y-%m-%d"),
        project.description
    )
}

pub async fn run<G: ProjectGateway, W: Write>(command: Command, gateway: &G, out: &mut W) -> Result<()> {
    match command {
        Command::List {
            filter,
            page,
            page_size,
        } => {
            let state = PageState {
                filter: filter.to_filter(),
                page_number: page,
                page_size,
            };
            let result = paging::reload(gateway, &state.query()).await?;
            for project in &result.projects {
                writeln!(out, "{}", format_project(project))?;
            }
            writeln!(
                out,
                "page {} of {} ({} matching, {})",
                page + 1,
                state.page_count(result.total).max(1),
                result.total,
                state.filter
            )?;
        }
        Command::Count { filter } => {
            let total = match filter.to_filter() {
                SearchFilter::All => gateway.count().await?,
                SearchFilter::NameContains(text) => gateway.count_by_name_contains(&text).await?,
                SearchFilter::DueDate(date) => gateway.count_by_due_date(date).await?,
            };
            writeln!(out, "{}", total)?;
        }
    }
    Ok(())
}
