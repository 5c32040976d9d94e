//! In-order command queue and completion events
//!
//! Every executor owns one queue served by a dedicated worker thread. Commands
//! run strictly in submission order; each submission returns an [`Event`] right
//! away. A failing command (an `Err` or a panic inside a kernel) marks its own
//! event failed and the queue keeps going.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// State of a submitted operation
#[derive(Clone, Debug, PartialEq)]
pub enum EventStatus {
    /// Queued or running
    Pending,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed(Error),
}

#[derive(Debug)]
struct EventState {
    status: Mutex<EventStatus>,
    cond: Condvar,
}

/// Completion handle for a submitted operation
///
/// Clones observe the same operation.
#[derive(Clone, Debug)]
pub struct Event {
    state: Arc<EventState>,
}

impl Event {
    fn with_status(status: EventStatus) -> Self {
        Self {
            state: Arc::new(EventState {
                status: Mutex::new(status),
                cond: Condvar::new(),
            }),
        }
    }

    pub(crate) fn pending() -> Self {
        Self::with_status(EventStatus::Pending)
    }

    /// An event that is already complete (used for no-op submissions)
    pub fn completed() -> Self {
        Self::with_status(EventStatus::Complete)
    }

    pub(crate) fn finish(&self, result: Result<()>) {
        let mut status = self.state.status.lock();
        *status = match result {
            Ok(()) => EventStatus::Complete,
            Err(e) => EventStatus::Failed(e),
        };
        self.state.cond.notify_all();
    }

    /// Current status without blocking
    pub fn status(&self) -> EventStatus {
        self.state.status.lock().clone()
    }

    /// True once the operation has finished, successfully or not
    pub fn is_complete(&self) -> bool {
        !matches!(*self.state.status.lock(), EventStatus::Pending)
    }

    /// Block until the operation finishes and return its outcome
    pub fn wait(&self) -> Result<()> {
        let mut status = self.state.status.lock();
        while matches!(*status, EventStatus::Pending) {
            self.state.cond.wait(&mut status);
        }
        match &*status {
            EventStatus::Failed(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /// Wait on every event; returns the first failure in the given order
    pub fn wait_all(events: &[Event]) -> Result<()> {
        let mut first_err = None;
        for event in events {
            if let Err(e) = event.wait() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

type Command = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct Job {
    name: &'static str,
    command: Command,
    event: Event,
}

/// FIFO queue executing commands on its own thread
pub(crate) struct CommandQueue {
    sender: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandQueue {
    pub(crate) fn new(label: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name(format!("numblas-queue-{label}"))
            .spawn(move || run_worker(receiver))
            .map_err(|e| Error::device("queue", format!("failed to start worker: {e}")))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Enqueue a command; returns its completion handle immediately
    pub(crate) fn submit<F>(&self, name: &'static str, command: F) -> Result<Event>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let event = Event::pending();
        let job = Job {
            name,
            command: Box::new(command),
            event: event.clone(),
        };
        self.sender
            .as_ref()
            .ok_or(Error::QueueClosed)?
            .send(job)
            .map_err(|_| Error::QueueClosed)?;
        Ok(event)
    }

    /// Block until everything submitted so far has run
    pub(crate) fn finish(&self) -> Result<()> {
        self.submit("finish", || Ok(()))?.wait()
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("numblas queue worker terminated abnormally");
            }
        }
    }
}

fn run_worker(receiver: mpsc::Receiver<Job>) {
    for job in receiver {
        let Job {
            name,
            command,
            event,
        } = job;
        let result = panic::catch_unwind(AssertUnwindSafe(command))
            .unwrap_or_else(|payload| Err(Error::device(name, panic_message(payload.as_ref()))));
        if let Err(e) = &result {
            log::error!("command '{name}' failed: {e}");
        }
        event.finish(result);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "kernel panicked".to_string()
    }
}
