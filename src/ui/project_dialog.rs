use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use crossterm::event::KeyCode;
use thiserror::Error;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::Project;
use crate::ui::components::date_input::DateInputState;

pub enum ProjectDialogAction {
    Cancel,
    /// `slot` is the table row the dialog was opened from, `None` when adding.
    Save { project: Project, slot: Option<usize> },
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ProjectField {
    Name,
    Description,
    DueDate,
}

impl ProjectField {
    const ALL: [ProjectField; 3] = [ProjectField::Name, ProjectField::Description, ProjectField::DueDate];

    fn label(self) -> &'static str {
        match self {
            ProjectField::Name => "Name",
            ProjectField::Description => "Description",
            ProjectField::DueDate => "Due Date",
        }
    }
}

impl fmt::Display for ProjectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The form had empty fields; nothing was saved.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("All fields must be filled in. Missing: {}", list_fields(.missing))]
pub struct ValidationError {
    pub missing: Vec<ProjectField>,
}

fn list_fields(fields: &[ProjectField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct ProjectDialogState {
    project_id: Option<i32>,
    created_at: Option<NaiveDateTime>,
    slot: Option<usize>,
    pub name: String,
    pub description: String,
    pub current_field: ProjectField,
    pub editing: bool,
    pub due_date_state: DateInputState,
    pub validation: Option<ValidationError>,
    /// Set once a save has been sent to the worker; the form is frozen until it answers.
    pub saving: bool,
}

impl ProjectDialogState {
    /// An empty form for adding a project.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            project_id: None,
            created_at: None,
            slot: None,
            name: String::new(),
            description: String::new(),
            current_field: ProjectField::Name,
            editing: false,
            due_date_state: DateInputState::empty(today),
            validation: None,
            saving: false,
        }
    }

    /// A form pre-filled from the project shown at `slot` in the table.
    pub fn from_existing(project: &Project, slot: usize) -> Self {
        Self {
            project_id: project.id,
            created_at: project.created_at,
            slot: Some(slot),
            name: project.name.clone(),
            description: project.description.clone(),
            current_field: ProjectField::Name,
            editing: false,
            due_date_state: DateInputState::new(project.due_date),
            validation: None,
            saving: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.project_id.is_none()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.current_field == ProjectField::DueDate {
            self.due_date_state.toggle_editing();
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            ProjectField::Name => ProjectField::Description,
            ProjectField::Description => ProjectField::DueDate,
            ProjectField::DueDate => ProjectField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            ProjectField::Name => ProjectField::DueDate,
            ProjectField::Description => ProjectField::Name,
            ProjectField::DueDate => ProjectField::Description,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let text = match self.current_field {
            ProjectField::Name => &mut self.name,
            ProjectField::Description => &mut self.description,
            ProjectField::DueDate => {
                self.due_date_state.handle_input(key);
                return;
            }
        };
        match key {
            KeyCode::Char(c) => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            _ => {}
        }
    }

    /// Build the project to save, or list every field that is still empty.
    pub fn validate(&self) -> Result<Project, ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(ProjectField::Name);
        }
        if self.description.trim().is_empty() {
            missing.push(ProjectField::Description);
        }
        let Some(due_date) = self.due_date_state.date else {
            missing.push(ProjectField::DueDate);
            return Err(ValidationError { missing });
        };
        if !missing.is_empty() {
            return Err(ValidationError { missing });
        }

        Ok(Project {
            id: self.project_id,
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            due_date,
        })
    }

    fn field_value(&self, field: ProjectField) -> String {
        match field {
            ProjectField::Name => self.name.clone(),
            ProjectField::Description => self.description.clone(),
            ProjectField::DueDate => self.due_date_state.get_display_string(),
        }
    }
}

pub fn render_project_dialog<B: Backend>(f: &mut Frame<B>, state: &ProjectDialogState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(7),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.is_new() {
        "New Project"
    } else {
        "Edit Project"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let (message, style) = match &state.validation {
        Some(err) => (err.to_string(), Style::default().fg(Color::Red)),
        None if state.saving => ("Saving...".to_string(), Style::default().fg(Color::Gray)),
        None => (String::new(), Style::default()),
    };
    let validation = Paragraph::new(message)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(validation, chunks[2]);

    let help_text = if state.editing {
        match state.current_field {
            ProjectField::Name | ProjectField::Description => "Enter - Save field | Esc - Stop editing",
            ProjectField::DueDate => {
                "Enter - Save field | Left/Right - Switch date part | Del - Clear | Esc - Stop editing"
            }
        }
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save project | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ProjectDialogState, area: Rect) {
    let items: Vec<ListItem> = ProjectField::ALL
        .iter()
        .map(|&field| {
            let selected = field == state.current_field;
            let label_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let mut value = state.field_value(field);
            let value_style = if selected && state.editing {
                if field != ProjectField::DueDate {
                    value.push('|');
                }
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                Span::styled(value, value_style),
            ]))
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Project Details"));

    f.render_widget(form_list, area);
}

pub fn handle_key(state: &mut ProjectDialogState, key: KeyCode) -> Option<ProjectDialogAction> {
    if state.saving {
        return None;
    }

    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ProjectDialogAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') | KeyCode::Char('S') if !state.editing => match state.validate() {
            Ok(project) => {
                state.validation = None;
                return Some(ProjectDialogAction::Save {
                    project,
                    slot: state.slot,
                });
            }
            Err(err) => state.validation = Some(err),
        },
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }

    None
}
