//! Cooperative FIFO scheduler for visual state changes.
//!
//! A single worker task owns the [`StimulusSurface`] and runs queued tasks one
//! at a time, strictly in submission order. A task is only started once every
//! task submitted before it has finished. Timed waits are *not* queued: the
//! session sleeps on its own timeline and only routes the surface mutations
//! on either side of a wait through here.

use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::SchedulerError;
use crate::surface::StimulusSurface;

type Job = Box<dyn FnOnce(&mut dyn StimulusSurface) + Send>;

/// Completion handle for a submitted task.
#[must_use = "a ticket does nothing unless waited on"]
pub struct Ticket<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Ticket<T> {
    /// Resolve once the task has run, with its return value.
    pub async fn wait(self) -> Result<T, SchedulerError> {
        self.rx.await.map_err(|_| SchedulerError::Closed)
    }
}

pub struct CooperativeScheduler {
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CooperativeScheduler {
    /// Spawn the worker that owns `surface`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(surface: Box<dyn StimulusSurface>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(surface, rx));
        Self {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue `task` now and return a ticket for its result.
    ///
    /// The queue position is fixed by this call, not by when the ticket is
    /// awaited.
    pub fn submit<T, F>(&self, task: F) -> Result<Ticket<T>, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn StimulusSurface) -> T + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move |surface| {
            // The submitter may have stopped waiting; the task still ran.
            let _ = reply.send(task(surface));
        });
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue
            .as_ref()
            .ok_or(SchedulerError::Closed)?
            .send(job)
            .map_err(|_| SchedulerError::Closed)?;
        Ok(Ticket { rx })
    }

    /// Queue `task` and wait until it has run.
    pub async fn enqueue<T, F>(&self, task: F) -> Result<T, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn StimulusSurface) -> T + Send + 'static,
    {
        self.submit(task)?.wait().await
    }

    /// Stop accepting tasks, let the queued ones drain, and join the worker.
    pub async fn shutdown(&self) {
        drop(
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!("scheduler worker ended abnormally: {e}");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }
}

async fn run(mut surface: Box<dyn StimulusSurface>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        job(surface.as_mut());
    }
    tracing::debug!("scheduler queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingSurface, SurfaceOp};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let surface = RecordingSurface::new();
        let scheduler = CooperativeScheduler::start(Box::new(surface.clone()));

        let tickets: Vec<_> = (0..50)
            .map(|i| scheduler.submit(move |s| s.focus(i).is_ok()).unwrap())
            .collect();
        // Await in reverse; execution order must not depend on it.
        for ticket in tickets.into_iter().rev() {
            assert!(ticket.wait().await.unwrap());
        }

        let expected: Vec<_> = (0..50).map(SurfaceOp::Focus).collect();
        assert_eq!(surface.ops(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submitters_interleave_by_submission_time() {
        let surface = RecordingSurface::new();
        let scheduler = Arc::new(CooperativeScheduler::start(Box::new(surface.clone())));

        let a = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move {
                for i in [0, 2, 4] {
                    scheduler.enqueue(move |s| s.focus(i)).await.unwrap().unwrap();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
        };
        let b = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                for i in [1, 3, 5] {
                    scheduler.enqueue(move |s| s.focus(i)).await.unwrap().unwrap();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        let expected: Vec<_> = (0..6).map(SurfaceOp::Focus).collect();
        assert_eq!(surface.ops(), expected);
    }

    #[tokio::test]
    async fn task_errors_are_returned_to_the_submitter() {
        let surface = RecordingSurface::failing_after(0);
        let scheduler = CooperativeScheduler::start(Box::new(surface));
        let result = scheduler.enqueue(|s| s.focus(0)).await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shutdown_drains_then_closes() {
        let surface = RecordingSurface::new();
        let scheduler = CooperativeScheduler::start(Box::new(surface.clone()));
        let ticket = scheduler.submit(|s| s.focus(7)).unwrap();
        scheduler.shutdown().await;

        assert!(ticket.wait().await.unwrap().is_ok());
        assert_eq!(surface.ops(), vec![SurfaceOp::Focus(7)]);
        assert!(scheduler.is_closed());
        assert_eq!(
            scheduler.enqueue(|s| s.focus(8)).await.err(),
            Some(SchedulerError::Closed)
        );
    }
}
