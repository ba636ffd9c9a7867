//! Outstanding-task tracking for client operations.
//!
//! [`TrackedClient`] decorates a [`MessageBusClient`]: each operation is
//! started on the Tokio runtime immediately, recorded in a [`TaskRegistry`],
//! and removed from it the moment it settles. Because the work runs on its own
//! task, a caller may drop the returned [`PendingTask`] and still rely on
//! [`TrackedClient::wait_for_outstanding_tasks`] to wait for it at shutdown.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{ready, Context, Poll};

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::client::{ClientError, ClientResult, MessageBusClient, SendRequest, TaskFuture};

/// Identifier of a tracked task, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Settled = Shared<BoxFuture<'static, ()>>;

/// Set of operations that have started but not yet settled.
///
/// Entries are inserted by [`register`](Self::register) and removed by
/// [`settle`](Self::settle). Neither operation can fail.
#[derive(Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, Settled>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a task whose settlement is signalled by `settled` completing.
    pub fn register<F>(&self, settled: F) -> TaskId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task_id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(task_id, settled.boxed().shared());
        task_id
    }

    /// Removes a task. Returns `false` if it was already gone.
    pub fn settle(&self, task_id: TaskId) -> bool {
        self.lock().remove(&task_id).is_some()
    }

    /// Number of tasks still in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waits for every task registered at the time of this call.
    ///
    /// The set is captured when `wait_all` is called, not when the returned
    /// future is first polled. Tasks registered afterwards are not waited for.
    pub fn wait_all(&self) -> impl Future<Output = ()> + Send + 'static {
        let snapshot: Vec<Settled> = self.lock().values().cloned().collect();
        async move {
            join_all(snapshot).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Settled>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes its task from the registry when dropped.
///
/// Lives inside the spawned task, so it runs on success, on error, on panic
/// and when the runtime drops the task.
struct SettleGuard {
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
    settled: Option<oneshot::Sender<()>>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.registry.settle(self.task_id);
        if let Some(settled) = self.settled.take() {
            let _ = settled.send(());
        }
    }
}

/// Handle to a tracked operation that is already running.
///
/// Awaiting it yields the operation's own result. Dropping it does not cancel
/// the operation.
#[must_use = "dropping a PendingTask detaches it; await it or drain the client"]
pub struct PendingTask<T> {
    task_id: TaskId,
    handle: JoinHandle<ClientResult<T>>,
}

impl<T> PendingTask<T> {
    /// Registry identifier of this task.
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }
}

impl<T> Future for PendingTask<T> {
    type Output = ClientResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.handle).poll(cx)) {
            Ok(outcome) => Poll::Ready(outcome),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {
                tracing::warn!("Tracked task {} was aborted", self.task_id);
                Poll::Ready(Err(ClientError::TaskAborted {
                    task_id: self.task_id,
                }))
            }
        }
    }
}

/// Decorator that records every operation of the wrapped client.
pub struct TrackedClient<C> {
    inner: C,
    registry: Arc<TaskRegistry>,
}

impl<C: MessageBusClient> TrackedClient<C> {
    /// Wraps `inner` with an empty registry.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Number of operations still in flight.
    pub fn outstanding_tasks(&self) -> usize {
        self.registry.len()
    }

    /// Waits for every operation started before this call to settle.
    ///
    /// Completes immediately when nothing is in flight. Operations started
    /// while waiting are not included; call again to drain those.
    pub fn wait_for_outstanding_tasks(&self) -> impl Future<Output = ()> + Send + 'static {
        self.registry.wait_all()
    }

    /// Starts `operation` as a tracked task.
    ///
    /// The task is registered before this returns and deregistered when it
    /// settles. Its outcome is passed through untouched.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn track<T, F>(&self, operation: F) -> PendingTask<T>
    where
        T: Send + 'static,
        F: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let (settled_tx, settled_rx) = oneshot::channel::<()>();
        let task_id = self.registry.register(settled_rx.map(|_| ()));
        let guard = SettleGuard {
            registry: Arc::clone(&self.registry),
            task_id,
            settled: Some(settled_tx),
        };
        tracing::trace!("Tracking task {}", task_id);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            operation.await
        });
        PendingTask { task_id, handle }
    }
}

impl<C: MessageBusClient> MessageBusClient for TrackedClient<C> {
    fn send_and_await(&self, request: SendRequest) -> TaskFuture<()> {
        Box::pin(self.track(self.inner.send_and_await(request)))
    }

    fn request(&self, request: SendRequest) -> TaskFuture<Option<Value>> {
        Box::pin(self.track(self.inner.request(request)))
    }
}
