//! Background task that runs every database operation for the UI.
//!
//! Commands are processed one at a time in the order they were submitted,
//! except that a page load is skipped when a newer load is already queued
//! behind it. Results go back over an event channel that only the UI loop
//! reads, so the project list is never touched from this task.
//!
//! Submitting never waits: commands the queue cannot take yet are held on the
//! UI side and pushed on the next [`PageWorker::flush`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::ProjectGateway;
use crate::error::{ErrorReport, PersistenceError};
use crate::models::Project;
use crate::paging::{self, Page, PageQuery};

/// Commands beyond this are held by [`PageWorker`] until the queue drains.
pub const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Load { generation: u64, query: PageQuery },
    /// `slot` is the list row an edit was opened from; `None` for a new project.
    Save { project: Project, slot: Option<usize> },
    Delete { id: i32, slot: usize },
}

impl WorkerCommand {
    fn is_load(&self) -> bool {
        matches!(self, WorkerCommand::Load { .. })
    }
}

/// Keep only the last load in `queue`; writes and their order are untouched.
fn drop_superseded_loads(queue: &mut VecDeque<WorkerCommand>) {
    let Some(latest) = queue.iter().rposition(WorkerCommand::is_load) else {
        return;
    };
    let mut index = 0;
    queue.retain(|command| {
        let keep = index == latest || !command.is_load();
        index += 1;
        keep
    });
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Loaded { generation: u64, page: Page },
    LoadFailed { generation: u64, report: ErrorReport },
    Saved { project: Project, slot: Option<usize> },
    SaveFailed { report: ErrorReport },
    Deleted { id: i32, slot: usize },
    DeleteFailed { report: ErrorReport },
}

pub struct PageWorker {
    commands: mpsc::Sender<WorkerCommand>,
    /// Submitted but not yet accepted by the queue.
    pending: VecDeque<WorkerCommand>,
    handle: JoinHandle<()>,
}

impl PageWorker {
    pub fn spawn<G>(gateway: Arc<G>, events: mpsc::UnboundedSender<WorkerEvent>) -> Self
    where
        G: ProjectGateway + 'static,
    {
        let (commands, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run(gateway, receiver, events));
        Self {
            commands,
            pending: VecDeque::new(),
            handle,
        }
    }

    /// Queue `command` without waiting. If the queue is full it is held
    /// here instead, and only the newest held load is kept.
    pub fn submit(&mut self, command: WorkerCommand) -> Result<()> {
        self.pending.push_back(command);
        drop_superseded_loads(&mut self.pending);
        self.flush()
    }

    /// Move held commands into the queue until it is full again.
    pub fn flush(&mut self) -> Result<()> {
        while let Some(command) = self.pending.pop_front() {
            match self.commands.try_send(command) {
                Ok(()) => {}
                Err(TrySendError::Full(command)) => {
                    self.pending.push_front(command);
                    debug!(held = self.pending.len(), "page worker queue full");
                    break;
                }
                Err(TrySendError::Closed(_)) => return Err(anyhow!("page worker has stopped")),
            }
        }
        Ok(())
    }

    /// Number of commands still waiting for room in the queue.
    pub fn backlog(&self) -> usize {
        self.pending.len()
    }

    /// Hand over any held commands, close the queue and wait up to `grace`
    /// for the work to finish, aborting the task after that. Returns whether
    /// it stopped on its own.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let Self {
            commands,
            pending,
            mut handle,
        } = self;

        let finished = tokio::time::timeout(grace, async {
            for command in pending {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            drop(commands);
            (&mut handle).await
        })
        .await;

        match finished {
            Ok(Ok(())) => {
                info!("page worker stopped");
                true
            }
            Ok(Err(err)) => {
                warn!(error = %err, "page worker ended abnormally");
                true
            }
            Err(_) => {
                warn!(?grace, "page worker still busy, aborting");
                handle.abort();
                false
            }
        }
    }
}

async fn run<G: ProjectGateway>(
    gateway: Arc<G>,
    mut commands: mpsc::Receiver<WorkerCommand>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut queue = VecDeque::new();
    loop {
        if queue.is_empty() {
            match commands.recv().await {
                Some(command) => queue.push_back(command),
                None => break,
            }
        }
        while let Ok(command) = commands.try_recv() {
            queue.push_back(command);
        }
        let before = queue.len();
        drop_superseded_loads(&mut queue);
        if queue.len() < before {
            debug!(skipped = before - queue.len(), "skipping superseded page loads");
        }

        let Some(command) = queue.pop_front() else {
            continue;
        };
        let event = execute(gateway.as_ref(), command).await;
        if events.send(event).is_err() {
            debug!("event receiver dropped, stopping page worker");
            break;
        }
    }
}

/// Run one command against the gateway and describe the outcome.
pub async fn execute<G: ProjectGateway>(gateway: &G, command: WorkerCommand) -> WorkerEvent {
    match command {
        WorkerCommand::Load { generation, query } => match paging::reload(gateway, &query).await {
            Ok(page) => {
                debug!(generation, rows = page.projects.len(), total = page.total, "page loaded");
                WorkerEvent::Loaded { generation, page }
            }
            Err(err) => WorkerEvent::LoadFailed {
                generation,
                report: report(ErrorReport::LOAD_FAILED, &err),
            },
        },
        WorkerCommand::Save { mut project, slot } => match gateway.save(&mut project).await {
            Ok(()) => {
                info!(id = ?project.id, "project saved");
                WorkerEvent::Saved { project, slot }
            }
            Err(err) => WorkerEvent::SaveFailed {
                report: report(ErrorReport::SAVE_FAILED, &err),
            },
        },
        WorkerCommand::Delete { id, slot } => match gateway.delete_by_id(id).await {
            Ok(removed) => {
                info!(id, removed, "project deleted");
                WorkerEvent::Deleted { id, slot }
            }
            Err(err) => WorkerEvent::DeleteFailed {
                report: report(ErrorReport::DELETE_FAILED, &err),
            },
        },
    }
}

fn report(header: &str, err: &PersistenceError) -> ErrorReport {
    warn!(operation = err.operation(), "{}", header);
    ErrorReport::from_persistence(header, err)
}
