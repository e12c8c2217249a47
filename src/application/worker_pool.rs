//! Bounded worker pool executing queued async tasks

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::shared::errors::PoolError;
use crate::shared::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
use crate::shared::utils::{generate_id, short_id};

/// Unit of work: runs once on exactly one worker
pub type Task = BoxFuture<'static, ()>;

/// Pool lifecycle: `Created -> Running -> Draining -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Draining,
    Stopped,
}

struct QueuedTask {
    id: String,
    task: Task,
}

struct Inner {
    state: PoolState,
    sender: Option<mpsc::UnboundedSender<QueuedTask>>,
    workers: Vec<JoinHandle<()>>,
}

/// Fixed-size pool of workers pulling from one shared FIFO queue.
///
/// Tasks submitted before [`WorkerPool::start`] are queued and run once the
/// workers are up. Once [`WorkerPool::stop`] has begun, submissions are
/// rejected with [`PoolError::QueueClosed`].
pub struct WorkerPool {
    size: usize,
    inner: Mutex<Inner>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedTask>>>,
    shutdown: ShutdownTrigger,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidConfig(size));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = shutdown_channel();

        Ok(Self {
            size,
            inner: Mutex::new(Inner {
                state: PoolState::Created,
                sender: Some(sender),
                workers: Vec::new(),
            }),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            shutdown,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self) -> PoolState {
        self.lock().state
    }

    /// Signal observed by long-running tasks; fires when `stop` begins
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            PoolState::Created => {
                self.spawn_workers(&mut inner);
                Ok(())
            }
            PoolState::Running => {
                warn!("Worker pool already running");
                Ok(())
            }
            PoolState::Draining | PoolState::Stopped => Err(PoolError::QueueClosed),
        }
    }

    /// Enqueue a task for execution by the next free worker
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = self.lock();
        match (inner.state, inner.sender.as_ref()) {
            (PoolState::Created | PoolState::Running, Some(sender)) => {
                let id = generate_id();
                debug!("Queued task {}", short_id(&id));
                sender
                    .send(QueuedTask {
                        id,
                        task: task.boxed(),
                    })
                    .map_err(|_| PoolError::QueueClosed)
            }
            _ => Err(PoolError::QueueClosed),
        }
    }

    /// Stop accepting tasks, let queued ones finish, then join every worker.
    ///
    /// In-flight work is not interrupted; long-running tasks are expected to
    /// watch [`WorkerPool::shutdown_signal`].
    pub async fn stop(&self) {
        let workers = {
            let mut inner = self.lock();
            let state = inner.state;
            match state {
                PoolState::Draining | PoolState::Stopped => {
                    debug!("Worker pool already stopping");
                    return;
                }
                PoolState::Created => {
                    info!("Worker pool stopped before start, draining queued tasks");
                    self.spawn_workers(&mut inner);
                }
                PoolState::Running => {}
            }

            inner.state = PoolState::Draining;
            // Closing the sender ends each worker loop once the queue is empty.
            inner.sender = None;
            std::mem::take(&mut inner.workers)
        };

        info!("Draining worker pool ({} workers)", workers.len());
        self.shutdown.trigger();

        for result in join_all(workers).await {
            if let Err(e) = result {
                error!("Worker terminated abnormally: {}", e);
            }
        }

        self.lock().state = PoolState::Stopped;
        info!("Worker pool stopped");
    }

    fn spawn_workers(&self, inner: &mut Inner) {
        info!("Starting worker pool with {} workers", self.size);
        inner.workers = (0..self.size)
            .map(|index| tokio::spawn(run_worker(index, Arc::clone(&self.receiver))))
            .collect();
        inner.state = PoolState::Running;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_worker(index: usize, receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedTask>>>) {
    debug!("Worker {} started", index);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(QueuedTask { id, task }) = next else {
            break;
        };

        debug!("Worker {} running task {}", index, short_id(&id));
        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            error!("Task {} panicked on worker {}", short_id(&id), index);
        }
    }

    debug!("Worker {} exiting", index);
}
