use chrono::NaiveDate;
use crossterm::event::KeyCode;
use tracing::debug;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::error::ErrorReport;
use crate::models::Project;
use crate::paging::{PageSize, PageState, SearchFilter};
use crate::ui::popup;
use crate::worker::{WorkerCommand, WorkerEvent};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputMode {
    Browse,
    SearchName,
    SearchDueDate,
}

/// The row a delete popup was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeleteTarget {
    id: i32,
    slot: usize,
    name: String,
}

pub enum ProjectAction {
    Quit,
    Submit(WorkerCommand),
    NewProject,
    EditProject(usize),
}

/// The project table and everything that decides what it shows.
///
/// `projects` is only ever changed here, from the UI loop, by applying
/// [`WorkerEvent`]s.
pub struct ProjectsState {
    projects: Vec<Project>,
    table_state: TableState,
    page: PageState,
    total: Option<i64>,
    generation: u64,
    loading: bool,
    input_mode: InputMode,
    input: String,
    delete_target: Option<DeleteTarget>,
    error: Option<ErrorReport>,
    notice: Option<String>,
}

impl ProjectsState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            projects: Vec::new(),
            table_state: TableState::default(),
            page: PageState::new(page_size),
            total: None,
            generation: 0,
            loading: false,
            input_mode: InputMode::Browse,
            input: String::new(),
            delete_target: None,
            error: None,
            notice: None,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn total(&self) -> Option<i64> {
        self.total
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    /// Close the error popup; returns whether one was open.
    pub fn dismiss_error(&mut self) -> bool {
        self.error.take().is_some()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Issue a load for the current page state under a fresh generation.
    pub fn load(&mut self) -> WorkerCommand {
        self.generation += 1;
        self.loading = true;
        WorkerCommand::Load {
            generation: self.generation,
            query: self.page.query(),
        }
    }

    /// Move to `page`, reloading only when something changed.
    fn navigate(&mut self, page: PageState) -> Option<ProjectAction> {
        if page == self.page {
            return None;
        }
        self.page = page;
        Some(ProjectAction::Submit(self.load()))
    }

    fn search(&mut self, filter: SearchFilter) -> ProjectAction {
        self.page = self.page.clone().with_filter(filter);
        ProjectAction::Submit(self.load())
    }

    pub fn next(&mut self) {
        if self.projects.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) if i + 1 < self.projects.len() => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.projects.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) if i > 0 => i - 1,
            _ => self.projects.len() - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_slot(&self) -> Option<usize> {
        self.table_state
            .selected()
            .filter(|&i| i < self.projects.len())
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.selected_slot().and_then(|i| self.projects.get(i))
    }

    /// Remember the selected row so the popup and the delete agree on it
    /// even if a page load lands while the popup is open.
    fn confirm_delete(&mut self) {
        self.delete_target = self.selected_slot().and_then(|slot| {
            let project = &self.projects[slot];
            Some(DeleteTarget {
                id: project.id?,
                slot,
                name: project.name.clone(),
            })
        });
    }

    /// Apply a worker result to the table. Returns a follow-up load when a
    /// delete emptied a page other than the first.
    pub fn apply(&mut self, event: WorkerEvent) -> Option<WorkerCommand> {
        match event {
            WorkerEvent::Loaded { generation, page } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "discarding stale page");
                    return None;
                }
                self.loading = false;
                self.total = Some(page.total);
                self.projects.clear();
                self.projects.extend(page.projects);
                self.table_state
                    .select(if self.projects.is_empty() { None } else { Some(0) });
            }
            WorkerEvent::LoadFailed { generation, report } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "discarding stale load failure");
                    return None;
                }
                self.loading = false;
                self.error = Some(report);
            }
            WorkerEvent::Saved { project, slot: Some(slot) } => {
                match self.projects.get_mut(slot) {
                    Some(row) if row.id == project.id => *row = project,
                    _ => debug!(slot, id = ?project.id, "edited row is no longer on this page"),
                }
            }
            WorkerEvent::Saved { project, slot: None } => {
                self.projects.push(project);
                self.total = self.total.map(|t| t + 1);
                if self.table_state.selected().is_none() {
                    self.table_state.select(Some(0));
                }
            }
            WorkerEvent::Deleted { id, slot } => {
                let before = self.projects.len();
                if self.projects.get(slot).and_then(|p| p.id) == Some(id) {
                    self.projects.remove(slot);
                } else {
                    self.projects.retain(|p| p.id != Some(id));
                }
                if self.projects.len() < before {
                    self.total = self.total.map(|t| (t - 1).max(0));
                }
                self.clamp_selection();
                self.notice = Some("Project deleted.".to_string());
                if self.projects.is_empty() && self.page.page_number > 0 {
                    self.page = self.page.clone().previous();
                    return Some(self.load());
                }
            }
            WorkerEvent::SaveFailed { report } | WorkerEvent::DeleteFailed { report } => {
                self.error = Some(report);
            }
        }
        None
    }

    fn clamp_selection(&mut self) {
        let selected = match (self.table_state.selected(), self.projects.len()) {
            (_, 0) => None,
            (Some(i), len) if i >= len => Some(len - 1),
            (Some(i), _) => Some(i),
            (None, _) => Some(0),
        };
        self.table_state.select(selected);
    }

    fn submit_input(&mut self) -> Option<ProjectAction> {
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Browse);
        let text = std::mem::take(&mut self.input);
        match mode {
            InputMode::Browse => None,
            InputMode::SearchName => Some(self.search(SearchFilter::by_name(&text))),
            InputMode::SearchDueDate => {
                let text = text.trim();
                if text.is_empty() {
                    return Some(self.search(SearchFilter::All));
                }
                match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    Ok(date) => Some(self.search(SearchFilter::DueDate(date))),
                    Err(_) => {
                        self.error = Some(ErrorReport::new(
                            "Invalid due date.",
                            format!("Expected YYYY-MM-DD, got \"{}\".", text),
                        ));
                        None
                    }
                }
            }
        }
    }
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    // Search bar
    let search = match state.input_mode {
        InputMode::Browse => Spans::from(vec![
            Span::styled("Showing: ", Style::default().fg(Color::Yellow)),
            Span::raw(state.page.filter.to_string()),
        ]),
        InputMode::SearchName => Spans::from(vec![
            Span::styled("Name contains: ", Style::default().fg(Color::Yellow)),
            Span::styled(format!("{}|", state.input), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        InputMode::SearchDueDate => Spans::from(vec![
            Span::styled("Due date (YYYY-MM-DD): ", Style::default().fg(Color::Yellow)),
            Span::styled(format!("{}|", state.input), Style::default().add_modifier(Modifier::BOLD)),
        ]),
    };
    let search_bar = Paragraph::new(search).block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search_bar, chunks[0]);

    // Table
    let header_cells = ["ID", "Name", "Description", "Created", "Due Date"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells)
        .style(Style::default())
        .height(1)
        .bottom_margin(1);

    let rows = state.projects.iter().map(|project| {
        let id = project.id.map(|id| id.to_string()).unwrap_or_default();
        let created = project
            .created_at
            .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        Row::new(vec![
            Cell::from(id),
            Cell::from(project.name.as_str()),
            Cell::from(project.description.as_str()),
            Cell::from(created),
            Cell::from(project.due_date.format("%Y-%m-%d").to_string()),
        ])
        .height(1)
    });

    let page = state.page();
    let page_info = match state.total() {
        Some(total) => format!(
            "Projects | page {} of {} | {} total | {} per page",
            page.page_number + 1,
            page.page_count(total).max(1),
            total,
            page.page_size
        ),
        None => format!(
            "Projects | page {} | {} per page",
            page.page_number + 1,
            page.page_size
        ),
    };
    let title = if state.is_loading() {
        format!("{} | loading...", page_info)
    } else {
        page_info
    };

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(8),
            Constraint::Percentage(22),
            Constraint::Percentage(35),
            Constraint::Percentage(20),
            Constraint::Percentage(15),
        ]);

    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    // Key help
    let buttons_text = match state.input_mode {
        InputMode::Browse if state.selected_project().is_some() => {
            "<N> New | <E> Edit | <D> Delete | </> Name | <T> Due date | <C> Clear | <Left/Right/Home/End> Page | <+/-> Size | <Q> Quit"
        }
        InputMode::Browse => {
            "<N> New | </> Name | <T> Due date | <C> Clear | <Left/Right/Home/End> Page | <+/-> Size | <Q> Quit"
        }
        InputMode::SearchName | InputMode::SearchDueDate => "<Enter> Search | <Esc> Cancel",
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[2]);

    if let Some(target) = &state.delete_target {
        popup::render_delete_confirmation(frame, &target.name);
    }
    if let Some(notice) = state.notice() {
        popup::render_notice(frame, notice);
    }
    if let Some(report) = state.error() {
        popup::render_error(frame, report);
    }
}

pub fn handle_key(state: &mut ProjectsState, key: KeyCode) -> Option<ProjectAction> {
    // Popups swallow the next key press.
    if state.error.take().is_some() || state.notice.take().is_some() {
        return None;
    }

    if let Some(target) = &state.delete_target {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let DeleteTarget { id, slot, .. } = *target;
                state.delete_target = None;
                return Some(ProjectAction::Submit(WorkerCommand::Delete { id, slot }));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.delete_target = None,
            _ => {}
        }
        return None;
    }

    if state.input_mode != InputMode::Browse {
        match key {
            KeyCode::Enter => return state.submit_input(),
            KeyCode::Esc => {
                state.input_mode = InputMode::Browse;
                state.input.clear();
            }
            KeyCode::Backspace => {
                state.input.pop();
            }
            KeyCode::Char(c) => state.input.push(c),
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ProjectAction::Quit),
        KeyCode::Char('/') => {
            state.input = match &state.page.filter {
                SearchFilter::NameContains(text) => text.clone(),
                _ => String::new(),
            };
            state.input_mode = InputMode::SearchName;
        }
        KeyCode::Char('t') => {
            state.input = match &state.page.filter {
                SearchFilter::DueDate(date) => date.format("%Y-%m-%d").to_string(),
                _ => String::new(),
            };
            state.input_mode = InputMode::SearchDueDate;
        }
        KeyCode::Char('c') => {
            if state.page.filter != SearchFilter::All {
                return Some(state.search(SearchFilter::All));
            }
        }
        KeyCode::Char('r') => return Some(ProjectAction::Submit(state.load())),
        KeyCode::Right | KeyCode::PageDown => {
            let page = state.page.clone().next(state.total);
            return state.navigate(page);
        }
        KeyCode::Left | KeyCode::PageUp => {
            let page = state.page.clone().previous();
            return state.navigate(page);
        }
        KeyCode::Home => {
            let page = state.page.clone().first();
            return state.navigate(page);
        }
        KeyCode::End => {
            let total = state.total?;
            let page = state.page.clone().last(total);
            return state.navigate(page);
        }
        KeyCode::Char('+') => {
            let size = state.page.page_size.larger();
            let page = state.page.clone().with_page_size(size);
            return state.navigate(page);
        }
        KeyCode::Char('-') => {
            let size = state.page.page_size.smaller();
            let page = state.page.clone().with_page_size(size);
            return state.navigate(page);
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Char('n') => return Some(ProjectAction::NewProject),
        KeyCode::Char('e') => return state.selected_slot().map(ProjectAction::EditProject),
        KeyCode::Char('d') => {
            if state.selected_project().is_some_and(Project::is_persisted) {
                state.confirm_delete();
            }
        }
        _ => {}
    }
    None
}
