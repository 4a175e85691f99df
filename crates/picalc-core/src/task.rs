//! Composable asynchronous tasks on a rayon thread pool.
//!
//! A [`Task`] is a handle to a value that will be produced on the pool.
//! Downstream work is attached with [`Task::map`] and [`Task::combine`];
//! continuations never block a pool thread, they are scheduled once the
//! upstream outcome is known. [`Task::wait`] is the only blocking call.
//!
//! [`Task::cancel`] finishes one task as cancelled; only its downstream
//! tasks observe the cancellation. All tasks created through one
//! [`TaskScope`] share its [`CancellationToken`], and [`Task::cancel_graph`]
//! trips it to stop every queued task of the scope from starting.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use tracing::debug;

use crate::calculator::SeriesError;
use crate::progress::CancellationToken;

/// Terminal outcome of a task.
pub type Outcome<T> = Result<T, SeriesError>;

type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

/// Thread pool that runs task bodies.
#[derive(Clone)]
pub struct Executor {
    pool: Arc<ThreadPool>,
}

impl Executor {
    /// Build a dedicated pool. `0` threads selects rayon's default.
    pub fn new(num_threads: usize) -> Result<Self, SeriesError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("picalc-worker-{i}"))
            .build()
            .map_err(|e| SeriesError::Config(format!("failed to build thread pool: {e}")))?;
        debug!(threads = pool.current_num_threads(), "executor created");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool, fire and forget.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("threads", &self.num_threads())
            .finish()
    }
}

/// Executor plus the cancellation token shared by one task graph.
#[derive(Debug, Clone)]
pub struct TaskScope {
    executor: Executor,
    cancel: CancellationToken,
}

impl TaskScope {
    /// Fresh scope with its own token.
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        Self::with_token(executor, CancellationToken::new())
    }

    /// Scope bound to an existing token.
    #[must_use]
    pub fn with_token(executor: Executor, cancel: CancellationToken) -> Self {
        Self { executor, cancel }
    }

    /// Executor of this scope.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Token shared by every task of this scope.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop every task of this scope that has not started yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `work` on the pool.
    pub fn submit<T, F>(&self, work: F) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_submit(move || Ok(work()))
    }

    /// Run fallible `work` on the pool.
    pub fn try_submit<T, F>(&self, work: F) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let task = Task::pending(self.clone());
        task.schedule(work);
        task
    }

    /// Task already completed with `value`.
    pub fn completed<T>(&self, value: T) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Task::resolved(self.clone(), Ok(value))
    }

    /// Task already failed with `error`.
    pub fn failed<T>(&self, error: SeriesError) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Task::resolved(self.clone(), Err(error))
    }
}

/// Observable state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not yet started.
    Pending,
    /// Body is executing.
    Running,
    /// Produced a value.
    Completed,
    /// Produced an error.
    Failed,
    /// Cancelled before producing a value.
    Cancelled,
}

struct State<T> {
    outcome: Option<Arc<Outcome<T>>>,
    running: bool,
    continuations: Vec<Continuation<T>>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

/// Handle to an asynchronously produced value.
///
/// Cloning the handle is cheap; all clones observe the same outcome.
///
/// # Example
/// ```
/// use picalc_core::task::{Executor, TaskScope};
///
/// let scope = TaskScope::new(Executor::new(2).unwrap());
/// let a = scope.submit(|| 20u64);
/// let b = a.map(|x| x + 1);
/// let sum = a.combine(&b, |x, y| x + y);
/// assert_eq!(sum.wait().unwrap(), 41);
/// ```
pub struct Task<T> {
    inner: Arc<Inner<T>>,
    scope: TaskScope,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            scope: self.scope.clone(),
        }
    }
}

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn pending(scope: TaskScope) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    outcome: None,
                    running: false,
                    continuations: Vec::new(),
                }),
                ready: Condvar::new(),
            }),
            scope,
        }
    }

    fn resolved(scope: TaskScope, outcome: Outcome<T>) -> Self {
        let task = Self::pending(scope);
        task.finish(outcome);
        task
    }

    /// Task already completed with `value`, bound to `scope`.
    pub fn completed(scope: &TaskScope, value: T) -> Self {
        scope.completed(value)
    }

    fn schedule<F>(&self, work: F)
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let handle = self.clone();
        self.scope.executor.spawn(move || handle.run(work));
    }

    fn run<F>(&self, work: F)
    where
        F: FnOnce() -> Outcome<T>,
    {
        if let Err(e) = self.scope.cancel.check_cancelled() {
            self.finish(Err(e));
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return;
            }
            state.running = true;
        }
        let outcome = match catch_unwind(AssertUnwindSafe(work)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(SeriesError::ComputationFailed(panic_message(
                payload.as_ref(),
            ))),
        };
        self.finish(outcome);
    }

    /// Record the terminal outcome. Returns `false` if one was already set.
    fn finish(&self, outcome: Outcome<T>) -> bool {
        let (outcome, continuations) = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            let outcome = Arc::new(outcome);
            state.outcome = Some(Arc::clone(&outcome));
            state.running = false;
            self.inner.ready.notify_all();
            (outcome, std::mem::take(&mut state.continuations))
        };
        for continuation in continuations {
            continuation(&outcome);
        }
        true
    }

    /// Scope this task belongs to.
    #[must_use]
    pub fn scope(&self) -> &TaskScope {
        &self.scope
    }

    /// Invoke `callback` with the outcome once it is known.
    ///
    /// Runs immediately on the calling thread if the task already finished,
    /// otherwise on the thread that finishes it.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(outcome) => Arc::clone(outcome),
                None => {
                    state.continuations.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(&outcome);
    }

    /// Downstream task applying `f` to this task's value.
    pub fn map<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Downstream task applying fallible `f` to this task's value.
    pub fn try_map<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        let downstream = Task::pending(self.scope.clone());
        let handle = downstream.clone();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                let value = value.clone();
                handle.schedule(move || f(value));
            }
            Err(err) => {
                handle.finish(Err(err.clone()));
            }
        });
        downstream
    }

    /// Downstream task applying `f` to the values of `self` and `other`.
    pub fn combine<U, V, F>(&self, other: &Task<U>, f: F) -> Task<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: FnOnce(T, U) -> V + Send + 'static,
    {
        self.try_combine(other, move |a, b| Ok(f(a, b)))
    }

    /// Downstream task applying fallible `f` to the values of `self` and `other`.
    ///
    /// Fails with the first error observed; `self` is inspected first.
    pub fn try_combine<U, V, F>(&self, other: &Task<U>, f: F) -> Task<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: FnOnce(T, U) -> Outcome<V> + Send + 'static,
    {
        let downstream = Task::pending(self.scope.clone());
        let handle = downstream.clone();
        let other = other.clone();
        self.on_complete(move |first| match first {
            Ok(a) => {
                let a = a.clone();
                other.on_complete(move |second| match second {
                    Ok(b) => {
                        let b = b.clone();
                        handle.schedule(move || f(a, b));
                    }
                    Err(err) => {
                        handle.finish(Err(err.clone()));
                    }
                });
            }
            Err(err) => {
                handle.finish(Err(err.clone()));
            }
        });
        downstream
    }

    /// Block until the task finishes and return its outcome.
    ///
    /// Must not be called from a pool thread of the same executor.
    pub fn wait(&self) -> Outcome<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.as_ref().clone();
            }
            self.inner.ready.wait(&mut state);
        }
    }

    /// Block for at most `timeout`; `None` if the task is still unfinished.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return Some(outcome.as_ref().clone());
            }
            if self.inner.ready.wait_until(&mut state, deadline).timed_out() {
                return state.outcome.as_ref().map(|o| o.as_ref().clone());
            }
        }
    }

    /// Cancel this task. Its body is skipped if not yet started and its
    /// downstream tasks finish cancelled; upstream and sibling tasks are
    /// unaffected.
    ///
    /// Work already running is not interrupted. Returns `false` if the task
    /// had already finished.
    pub fn cancel(&self) -> bool {
        let cancelled = self.finish(Err(SeriesError::Cancelled));
        if cancelled {
            debug!("task cancelled");
        }
        cancelled
    }

    /// Cancel this task and every task of its scope that has not started.
    ///
    /// Meant for the final task of a graph. Returns `false` if this task had
    /// already finished, in which case the scope is left untouched.
    pub fn cancel_graph(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.scope.cancel();
        self.cancel()
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        let state = self.inner.state.lock();
        match state.outcome.as_deref() {
            None if state.running => TaskStatus::Running,
            None => TaskStatus::Pending,
            Some(Ok(_)) => TaskStatus::Completed,
            Some(Err(SeriesError::Cancelled)) => TaskStatus::Cancelled,
            Some(Err(_)) => TaskStatus::Failed,
        }
    }

    /// Whether a terminal outcome is recorded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }
}

impl<T> fmt::Debug for Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("task panicked: {detail}")
}
