//! The task queue a [`Deferred`](crate::Deferred) dispatches its handlers
//! through.
//!
//! Everything runs on the thread that owns the queue. Tasks run strictly in
//! submission order and never inline with [`Schedule::schedule`]; the host
//! decides when to drain.
use crate::Error;
use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// The host seam: accept a task now, run it later, in FIFO order, on the
/// current thread.
pub trait Schedule {
    fn schedule(&self, task: Task);
}

/// Settings for a [`TaskQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of tasks a single [`TaskQueue::run_until_idle`] call may
    /// run. `None` drains without limit.
    pub drain_budget: Option<usize>,
    /// Capacity reserved up front for pending tasks.
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            drain_budget: None,
            initial_capacity: 16,
        }
    }
}

/// A FIFO task queue. Clones share the same queue.
///
/// # Examples
///
/// ```
/// use self_promise::{Schedule, TaskQueue};
/// use std::{cell::Cell, rc::Rc};
/// let queue = TaskQueue::default();
/// let ran = Rc::new(Cell::new(false));
/// let flag = ran.clone();
/// queue.schedule(Box::new(move || flag.set(true)));
/// assert!(!ran.get());
/// assert_eq!(queue.run_until_idle().unwrap(), 1);
/// assert!(ran.get());
/// ```
#[derive(Clone)]
pub struct TaskQueue {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    tasks: VecDeque<Task>,
    config: QueueConfig,
}

thread_local! {
    static CURRENT: TaskQueue = TaskQueue::default();
}

impl TaskQueue {
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                tasks: VecDeque::with_capacity(config.initial_capacity),
                config,
            })),
        }
    }

    /// The queue owned by the current thread. [`Deferred::new`](crate::Deferred::new)
    /// schedules onto it.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().tasks.is_empty()
    }

    /// Run the oldest task, if any. Returns whether a task ran.
    pub fn run_next(&self) -> bool {
        // The borrow must end before the task runs: tasks schedule more tasks.
        let task = self.inner.borrow_mut().tasks.pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled while
    /// draining. Returns how many tasks ran.
    ///
    /// Fails with [`Error::DrainBudgetExceeded`] when the configured budget is
    /// used up while work remains; the remaining tasks stay queued.
    pub fn run_until_idle(&self) -> Result<usize, Error> {
        let budget = self.inner.borrow().config.drain_budget;
        let mut ran = 0;
        loop {
            if let Some(budget) = budget {
                if ran == budget && !self.is_empty() {
                    tracing::warn!(budget, remaining = self.len(), "task queue drain budget exceeded");
                    return Err(Error::DrainBudgetExceeded { budget });
                }
            }
            if !self.run_next() {
                break;
            }
            ran += 1;
        }
        tracing::trace!(ran, "task queue idle");
        Ok(ran)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::with_config(QueueConfig::default())
    }
}

impl Schedule for TaskQueue {
    fn schedule(&self, task: Task) {
        self.inner.borrow_mut().tasks.push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TaskQueue")
            .field("pending", &inner.tasks.len())
            .field("config", &inner.config)
            .finish()
    }
}
