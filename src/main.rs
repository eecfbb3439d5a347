mod cli;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod paging;
mod ui;
mod worker;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc;
use tracing::{error, info};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::cli::Cli;
use crate::config::Config;
use crate::paging::PageSize;
use crate::ui::{
    popup,
    project_dialog::{
        handle_key as handle_project_dialog_key, render_project_dialog, ProjectDialogAction,
        ProjectDialogState,
    },
    projects::{handle_key as handle_projects_key, render_projects, ProjectAction, ProjectsState},
};
use crate::worker::{PageWorker, WorkerCommand, WorkerEvent};

/// How long the UI waits for a key before checking the worker again.
const TICK: Duration = Duration::from_millis(100);

// Represents the current screen in the app
enum AppScreen {
    Projects,
    ProjectDialog,
}

// Main application state
struct AppState {
    screen: AppScreen,
    projects_state: ProjectsState,
    project_dialog_state: Option<ProjectDialogState>,
    worker: PageWorker,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl AppState {
    fn new(page_size: PageSize, worker: PageWorker, events: mpsc::UnboundedReceiver<WorkerEvent>) -> Self {
        Self {
            screen: AppScreen::Projects,
            projects_state: ProjectsState::new(page_size),
            project_dialog_state: None,
            worker,
            events,
        }
    }

    fn apply(&mut self, event: WorkerEvent) -> Result<()> {
        match &event {
            WorkerEvent::Saved { .. } => self.close_dialog(),
            WorkerEvent::SaveFailed { .. } => {
                // keep the form so the user can retry
                if let Some(state) = &mut self.project_dialog_state {
                    state.saving = false;
                }
            }
            _ => {}
        }
        match self.projects_state.apply(event) {
            Some(command) => self.worker.submit(command),
            None => Ok(()),
        }
    }

    fn open_dialog(&mut self, state: ProjectDialogState) {
        self.project_dialog_state = Some(state);
        self.screen = AppScreen::ProjectDialog;
    }

    fn close_dialog(&mut self) {
        self.project_dialog_state = None;
        self.screen = AppScreen::Projects;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;
    logging::init(&config)?;
    info!("starting project manager");

    // Initialize database connection
    let db = db::init(&config).await?;

    match cli.command {
        Some(command) => {
            let mut stdout = io::stdout().lock();
            cli::run(command, &db, &mut stdout).await
        }
        None => run_interactive(&config, db).await,
    }
}

async fn run_interactive(config: &Config, db: db::Database) -> Result<()> {
    let page_size = config.page_size()?;
    let (event_tx, events) = mpsc::unbounded_channel();
    let worker = PageWorker::spawn(Arc::new(db), event_tx);

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(page_size, worker, events);

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // The receiver stays alive until the worker is done so queued writes still finish.
    let AppState { worker, events, .. } = app_state;
    if !worker.shutdown(config.shutdown_grace()).await {
        println!("Some pending work was cancelled on exit.");
    }
    drop(events);

    // Show any error message
    if let Err(err) = result {
        error!(error = %err, "interactive session failed");
        println!("Error: {}", err);
    }

    println!("Thanks for using Project Manager!");

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    let initial = app_state.projects_state.load();
    app_state.worker.submit(initial)?;

    loop {
        // Worker results are applied on this task only
        while let Ok(event) = app_state.events.try_recv() {
            app_state.apply(event)?;
        }
        app_state.worker.flush()?;

        // Render current screen
        terminal.draw(|f| match app_state.screen {
            AppScreen::Projects => render_projects(f, &mut app_state.projects_state),
            AppScreen::ProjectDialog => {
                if let Some(state) = &app_state.project_dialog_state {
                    render_project_dialog(f, state);
                }
                if let Some(report) = app_state.projects_state.error() {
                    popup::render_error(f, report);
                }
            }
        })?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Projects => handle_projects_screen(app_state, key.code)?,
            AppScreen::ProjectDialog => handle_project_dialog_screen(app_state, key.code)?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_projects_screen(app_state: &mut AppState, key: KeyCode) -> Result<bool> {
    match handle_projects_key(&mut app_state.projects_state, key) {
        Some(ProjectAction::Quit) => return Ok(true),
        Some(ProjectAction::Submit(command)) => app_state.worker.submit(command)?,
        Some(ProjectAction::NewProject) => {
            app_state.open_dialog(ProjectDialogState::new(Local::now().date_naive()));
        }
        Some(ProjectAction::EditProject(slot)) => {
            if let Some(project) = app_state.projects_state.projects().get(slot) {
                let state = ProjectDialogState::from_existing(project, slot);
                app_state.open_dialog(state);
            }
        }
        None => {}
    }
    Ok(false)
}

fn handle_project_dialog_screen(app_state: &mut AppState, key: KeyCode) -> Result<bool> {
    // An open error popup takes the key
    if app_state.projects_state.dismiss_error() {
        return Ok(false);
    }

    let Some(state) = &mut app_state.project_dialog_state else {
        app_state.screen = AppScreen::Projects;
        return Ok(false);
    };

    match handle_project_dialog_key(state, key) {
        Some(ProjectDialogAction::Cancel) => app_state.close_dialog(),
        Some(ProjectDialogAction::Save { project, slot }) => {
            state.saving = true;
            app_state.worker.submit(WorkerCommand::Save { project, slot })?;
        }
        None => {}
    }
    Ok(false)
}
