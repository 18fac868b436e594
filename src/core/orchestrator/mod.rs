//! # Orchestrator Module
//!
//! Runs catalog loading, detection and assembly as background tasks, one
//! at a time.
//!
//! ## Task Protocol
//! 1. [`TaskOrchestrator::dispatch`] rejects the request with
//!    [`TaskError::Busy`] while another task is active
//! 2. Otherwise it claims the busy slot and starts a worker thread, which
//!    emits `TaskEvent::Started`
//! 3. The component streams its own per-item events
//! 4. The worker frees the slot, then sends exactly one
//!    `TaskEvent::Completed` or `TaskEvent::Failed`, even when the task
//!    panics
//!
//! No event is sent while the slot lock is held, so a full bounded
//! channel never stalls [`TaskOrchestrator::is_busy`] or
//! [`TaskOrchestrator::cancel`]. Events of different tasks can interleave
//! around a terminal event; route them by task id.
//!
//! The orchestrator never touches selection state; consumers apply the
//! `TaskOutcome` they receive.

mod cancel;
mod config;
mod request;

pub use cancel::CancellationToken;
pub use config::{CuratorConfig, CuratorConfigBuilder};
pub use request::{
    DetectionRequest, DetectionResult, TaskKind, TaskOutcome, TaskRequest, WatermarkScope,
};

use crate::core::assembler::DocumentAssembler;
use crate::core::catalog::CatalogLoader;
use crate::core::dedup::FrameDeduplicator;
use crate::core::watermark::{WatermarkConfig, WatermarkDetector};
use crate::error::{CuratorError, TaskError};
use crate::events::{Event, EventSender, TaskEvent};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct ActiveTask {
    id: Uuid,
    kind: TaskKind,
    token: CancellationToken,
}

type ActiveSlot = Arc<Mutex<Option<ActiveTask>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-flight background task runner for one curation session
pub struct TaskOrchestrator {
    config: CuratorConfig,
    events: EventSender,
    active: ActiveSlot,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskOrchestrator {
    pub fn new(config: CuratorConfig, events: EventSender) -> Self {
        Self {
            config,
            events,
            active: Arc::new(Mutex::new(None)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Whether a task is currently running
    pub fn is_busy(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Kind of the running task, if any
    pub fn active_kind(&self) -> Option<TaskKind> {
        lock(&self.active).as_ref().map(|task| task.kind)
    }

    /// Start `request` in the background and return its task id.
    pub fn dispatch(&self, request: TaskRequest) -> Result<Uuid, TaskError> {
        let kind = request.kind();
        let id = Uuid::new_v4();
        let token = CancellationToken::new();

        {
            let mut active = lock(&self.active);
            if let Some(task) = active.as_ref() {
                info!(requested = %kind, active = %task.kind, "Rejecting request while busy");
                return Err(TaskError::Busy {
                    active: task.kind.to_string(),
                });
            }
            *active = Some(ActiveTask {
                id,
                kind,
                token: token.clone(),
            });
        }

        self.reap_finished_workers();

        info!(%id, %kind, "Task dispatched");

        let config = self.config.clone();
        let events = self.events.clone();
        let active = Arc::clone(&self.active);

        let spawned = thread::Builder::new()
            .name(format!("curator-{}", kind))
            .spawn(move || {
                events.send(Event::Task(TaskEvent::Started { id, kind }));
                run_guarded(&events, &active, id, kind, || {
                    execute(&config, request, &events, &token)
                })
            });

        match spawned {
            Ok(handle) => {
                lock(&self.workers).push(handle);
                Ok(id)
            }
            Err(e) => {
                let message = format!("could not start worker thread: {}", e);
                let fault = TaskError::InternalFault {
                    task: kind.to_string(),
                    message,
                };
                self.events.send(Event::Task(TaskEvent::Started { id, kind }));
                let result = Err(CuratorError::Task(fault.clone()));
                finish(&self.events, &self.active, id, kind, result);
                Err(fault)
            }
        }
    }

    /// Ask the running task to stop at its next checkpoint
    pub fn cancel(&self) {
        if let Some(task) = lock(&self.active).as_ref() {
            info!(id = %task.id, kind = %task.kind, "Stop requested");
            task.token.cancel();
        }
    }

    /// Block until every started worker has finished. With a bounded
    /// channel the caller must keep draining events from another thread.
    pub fn wait(&self) {
        self.join_workers();
    }

    /// Stop the running task and wait for its worker to exit.
    pub fn shutdown(&self) {
        self.cancel();
        self.join_workers();
    }

    fn join_workers(&self) {
        let handles = std::mem::take(&mut *lock(&self.workers));
        for handle in handles {
            // Panics are caught inside the worker, so join only fails if
            // the terminal send itself panicked.
            if handle.join().is_err() {
                error!("Worker thread ended abnormally");
            }
        }
    }

    /// Join workers that already exited. A worker that freed the slot may
    /// still be blocked sending its terminal event, so it is left alone.
    fn reap_finished_workers(&self) {
        let mut workers = lock(&self.workers);
        let (done, running): (Vec<_>, Vec<_>) =
            workers.drain(..).partition(|handle| handle.is_finished());
        *workers = running;
        drop(workers);

        for handle in done {
            if handle.join().is_err() {
                error!("Worker thread ended abnormally");
            }
        }
    }
}

impl Drop for TaskOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn execute(
    config: &CuratorConfig,
    request: TaskRequest,
    events: &EventSender,
    token: &CancellationToken,
) -> Result<TaskOutcome, CuratorError> {
    match request {
        TaskRequest::LoadFolder { folder } => {
            let summary = CatalogLoader::new(config.thumbnail).load(&folder, events, token)?;
            Ok(TaskOutcome::Loaded(summary))
        }
        TaskRequest::Detect(DetectionRequest::Watermark {
            template,
            threshold,
            invert,
            candidates,
            ..
        }) => {
            let detector = WatermarkDetector::new(
                WatermarkConfig::default().threshold(threshold).invert(invert),
            )?;
            let result = detector.detect_with_file(&template, &candidates, events)?;
            Ok(TaskOutcome::Detected {
                kind: TaskKind::DetectWatermark,
                result,
            })
        }
        TaskRequest::Detect(DetectionRequest::Deduplicate {
            threshold,
            candidates,
        }) => {
            let deduplicator = FrameDeduplicator::new(config.dedup().threshold(threshold))?;
            let result = deduplicator.deduplicate(&candidates, events);
            Ok(TaskOutcome::Detected {
                kind: TaskKind::Deduplicate,
                result,
            })
        }
        TaskRequest::Assemble(job) => {
            let report = DocumentAssembler::new(config.assembly()).assemble(&job, events)?;
            Ok(TaskOutcome::Assembled(report))
        }
    }
}

/// Run `body`, turning a panic into a fault, then emit the terminal event.
fn run_guarded<F>(events: &EventSender, active: &ActiveSlot, id: Uuid, kind: TaskKind, body: F)
where
    F: FnOnce() -> Result<TaskOutcome, CuratorError>,
{
    let result = match catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(CuratorError::Task(TaskError::InternalFault {
            task: kind.to_string(),
            message: panic_message(payload.as_ref()),
        })),
    };
    finish(events, active, id, kind, result);
}

/// Free the slot, then emit the terminal event. The lock is released
/// before sending so a blocked send cannot stall foreground queries.
fn finish(
    events: &EventSender,
    active: &ActiveSlot,
    id: Uuid,
    kind: TaskKind,
    result: Result<TaskOutcome, CuratorError>,
) {
    let event = match result {
        Ok(outcome) => {
            info!(%id, %kind, "Task completed");
            TaskEvent::Completed { id, outcome }
        }
        Err(e) => {
            error!(%id, %kind, error = %e, "Task failed");
            TaskEvent::Failed {
                id,
                kind,
                error: e.kind(),
                message: e.to_string(),
            }
        }
    };

    {
        let mut slot = lock(active);
        if slot.as_ref().is_some_and(|task| task.id == id) {
            *slot = None;
        }
    }

    events.send(Event::Task(event));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::AssemblyJob;
    use crate::error::ErrorKind;
    use crate::events::{EventChannel, EventReceiver};
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn next_terminal(receiver: &EventReceiver, id: Uuid) -> TaskEvent {
        loop {
            match receiver.recv_timeout(Duration::from_secs(30)) {
                Some(Event::Task(event)) if event.id() == id && event.is_terminal() => {
                    return event
                }
                Some(_) => continue,
                None => panic!("no terminal event for task {}", id),
            }
        }
    }

    #[test]
    fn load_folder_completes_with_summary() {
        let dir = TempDir::new().unwrap();
        for name in ["slide10.png", "slide2.png", "slide1.png"] {
            RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]))
                .save(dir.path().join(name))
                .unwrap();
        }

        let (sender, receiver) = EventChannel::new();
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);
        let id = orchestrator
            .dispatch(TaskRequest::LoadFolder {
                folder: dir.path().to_path_buf(),
            })
            .unwrap();

        match next_terminal(&receiver, id) {
            TaskEvent::Completed {
                outcome: TaskOutcome::Loaded(summary),
                ..
            } => {
                let names: Vec<_> = summary
                    .items
                    .iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect();
                assert_eq!(names, vec!["slide1.png", "slide2.png", "slide10.png"]);
                assert_eq!(summary.decoded, 3);
            }
            other => panic!("unexpected terminal event: {:?}", other),
        }

        orchestrator.wait();
        assert!(!orchestrator.is_busy());
    }

    #[test]
    fn missing_folder_fails_with_file_system_kind() {
        let (sender, receiver) = EventChannel::new();
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);
        let id = orchestrator
            .dispatch(TaskRequest::LoadFolder {
                folder: PathBuf::from("/definitely/not/a/folder"),
            })
            .unwrap();

        match next_terminal(&receiver, id) {
            TaskEvent::Failed { error, kind, .. } => {
                assert_eq!(error, ErrorKind::FileSystemError);
                assert_eq!(kind, TaskKind::LoadFolder);
            }
            other => panic!("unexpected terminal event: {:?}", other),
        }
    }

    #[test]
    fn empty_assembly_fails_with_empty_selection() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.pdf");
        let (sender, receiver) = EventChannel::new();
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);

        let id = orchestrator
            .dispatch(TaskRequest::Assemble(AssemblyJob {
                pages: vec![],
                output: output.clone(),
            }))
            .unwrap();

        match next_terminal(&receiver, id) {
            TaskEvent::Failed { error, .. } => assert_eq!(error, ErrorKind::EmptySelection),
            other => panic!("unexpected terminal event: {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn busy_orchestrator_rejects_new_requests() {
        // Nothing drains the single-slot channel, so the first task stays
        // blocked mid-run and keeps the slot.
        let (sender, receiver) = EventChannel::bounded(1);
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);
        let first = orchestrator
            .dispatch(TaskRequest::Detect(DetectionRequest::Deduplicate {
                threshold: 10,
                candidates: vec![PathBuf::from("only.png")],
            }))
            .unwrap();

        let error = orchestrator
            .dispatch(TaskRequest::LoadFolder {
                folder: PathBuf::from("/tmp"),
            })
            .unwrap_err();
        assert!(matches!(error, TaskError::Busy { ref active } if active == "deduplicate"));
        assert_eq!(orchestrator.active_kind(), Some(TaskKind::Deduplicate));

        assert!(matches!(next_terminal(&receiver, first), TaskEvent::Completed { .. }));
    }

    #[test]
    fn full_channel_does_not_stall_foreground_queries() {
        let (sender, receiver) = EventChannel::bounded(2);
        let orchestrator = Arc::new(TaskOrchestrator::new(CuratorConfig::default(), sender));
        let id = orchestrator
            .dispatch(TaskRequest::Detect(DetectionRequest::Deduplicate {
                threshold: 10,
                candidates: vec![PathBuf::from("only.png")],
            }))
            .unwrap();

        // Let the worker fill the channel and block on its next send.
        thread::sleep(Duration::from_millis(300));

        let (answer_tx, answer_rx) = crossbeam_channel::bounded(1);
        let foreground = Arc::clone(&orchestrator);
        let querier = thread::spawn(move || {
            let busy = foreground.is_busy();
            let kind = foreground.active_kind();
            foreground.cancel();
            let _ = answer_tx.send((busy, kind));
        });

        let answer = answer_rx.recv_timeout(Duration::from_secs(5));
        assert!(answer.is_ok(), "foreground queries blocked on a full channel");

        assert!(matches!(next_terminal(&receiver, id), TaskEvent::Completed { .. }));
        querier.join().unwrap();
        orchestrator.wait();
        assert!(!orchestrator.is_busy());
    }

    #[test]
    fn dispatch_from_terminal_handler_is_accepted() {
        let (sender, receiver) = EventChannel::bounded(1);
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);
        let request = || {
            TaskRequest::Detect(DetectionRequest::Deduplicate {
                threshold: 10,
                candidates: vec![],
            })
        };

        let first = orchestrator.dispatch(request()).unwrap();
        next_terminal(&receiver, first);

        let second = orchestrator.dispatch(request()).unwrap();
        assert!(matches!(next_terminal(&receiver, second), TaskEvent::Completed { .. }));
    }

    #[test]
    fn panicking_task_still_emits_terminal_failure() {
        let (sender, receiver) = EventChannel::new();
        let active: ActiveSlot = Arc::new(Mutex::new(Some(ActiveTask {
            id: Uuid::nil(),
            kind: TaskKind::Deduplicate,
            token: CancellationToken::new(),
        })));

        run_guarded(&sender, &active, Uuid::nil(), TaskKind::Deduplicate, || {
            panic!("hash table exploded")
        });

        match next_terminal(&receiver, Uuid::nil()) {
            TaskEvent::Failed { error, message, .. } => {
                assert_eq!(error, ErrorKind::InternalTaskFault);
                assert!(message.contains("hash table exploded"));
            }
            other => panic!("unexpected terminal event: {:?}", other),
        }
        assert!(lock(&active).is_none());
    }

    #[test]
    fn terminal_event_comes_after_component_events() {
        let (sender, receiver) = EventChannel::new();
        let orchestrator = TaskOrchestrator::new(CuratorConfig::default(), sender);
        let id = orchestrator
            .dispatch(TaskRequest::Detect(DetectionRequest::Deduplicate {
                threshold: 10,
                candidates: vec![PathBuf::from("only.png")],
            }))
            .unwrap();
        orchestrator.wait();

        let events: Vec<Event> = std::iter::from_fn(|| receiver.try_recv()).collect();
        let last_task_event = events
            .iter()
            .rposition(|e| matches!(e, Event::Task(_)))
            .unwrap();
        assert_eq!(last_task_event, events.len() - 1);
        match &events[last_task_event] {
            Event::Task(TaskEvent::Completed {
                id: done,
                outcome: TaskOutcome::Detected { result, .. },
            }) => {
                assert_eq!(*done, id);
                assert!(result.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
