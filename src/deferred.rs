use crate::{Callback, Error, Handler, Schedule, Task, TaskQueue};
use std::{cell::RefCell, fmt, rc::Rc};

/// A single-assignment value that settles once, as fulfilled or rejected, and
/// then notifies its observers through the task queue.
///
/// Cloning a `Deferred` clones the handle, not the value: both handles
/// observe the same settlement.
///
/// # Examples
///
/// ```
/// use self_promise::{Deferred, Error, TaskQueue};
/// use std::{cell::Cell, rc::Rc};
/// let seen = Rc::new(Cell::new(0));
/// let out = seen.clone();
/// Deferred::<i32, Error>::new(|resolve, _reject| {
///     resolve.resolve(20);
///     Ok(())
/// })
/// .and_then(|v| Ok(v + 1))
/// .and_then(move |v| {
///     out.set(v * 2);
///     Ok(v)
/// });
/// // Nothing runs until the host drains the queue.
/// assert_eq!(seen.get(), 0);
/// TaskQueue::current().run_until_idle().unwrap();
/// assert_eq!(seen.get(), 42);
/// ```
pub struct Deferred<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

/// The success capability of one [`Deferred`].
pub struct Resolve<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

/// The failure capability of one [`Deferred`].
pub struct Reject<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

struct Inner<T, E> {
    state: State<T, E>,
    observers: Vec<Observer<T, E>>,
    scheduler: Rc<dyn Schedule>,
}

#[derive(Clone)]
enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn label(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        }
    }
}

/// What dispatch does with one side of a registration. The non-callable
/// error is converted into `E` when the registration is made and only
/// surfaces if that side is selected.
enum Reaction<A, T, E> {
    PassThrough,
    Invoke(Box<dyn FnOnce(A) -> Result<T, E>>),
    Fail(E),
}

impl<A, T, E: From<Error>> From<Handler<A, T, E>> for Reaction<A, T, E> {
    fn from(handler: Handler<A, T, E>) -> Self {
        match handler {
            Callback::Absent => Reaction::PassThrough,
            Callback::Callable(f) => Reaction::Invoke(f),
            Callback::NotCallable(what) => Reaction::Fail(Error::HandlerNotCallable(what).into()),
        }
    }
}

struct Observer<T, E> {
    on_fulfilled: Reaction<T, T, E>,
    on_rejected: Reaction<E, T, E>,
    resolve: Resolve<T, E>,
    reject: Reject<T, E>,
}

impl<T, E> Drop for Inner<T, E> {
    /// Unlinks a pending chain iteratively. Dropping it link by link would
    /// recurse once per `then`.
    fn drop(&mut self) {
        let mut unlinked = std::mem::take(&mut self.observers);
        while let Some(observer) = unlinked.pop() {
            // The observer's own `resolve` and `reject` are the last owners of
            // the child: it goes away with this observer.
            if Rc::strong_count(&observer.resolve.inner) <= 2 {
                if let Ok(mut child) = observer.resolve.inner.try_borrow_mut() {
                    unlinked.append(&mut child.observers);
                }
            }
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Create a value and run `setup` on it immediately, scheduling through
    /// [`TaskQueue::current`].
    ///
    /// `setup` returning `Err` rejects the value with that reason, unless
    /// `setup` already settled it.
    pub fn new<F>(setup: F) -> Self
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        Self::new_in(TaskQueue::current(), setup)
    }

    pub fn new_in<S, F>(scheduler: S, setup: F) -> Self
    where
        S: Schedule + 'static,
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        Self::with_scheduler(Rc::new(scheduler), setup)
    }

    /// Like [`Deferred::new`], for a setup that may not be callable at all.
    pub fn try_new<F>(setup: Callback<F>) -> Result<Self, Error>
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        match setup {
            Callback::Callable(setup) => Ok(Self::new(setup)),
            other => Err(Error::SetupNotCallable(other.describe())),
        }
    }

    pub(crate) fn with_scheduler<F>(scheduler: Rc<dyn Schedule>, setup: F) -> Self
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        let deferred = Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                observers: vec![],
                scheduler,
            })),
        };
        let reject = deferred.reject_handle();
        if let Err(reason) = setup(deferred.resolve_handle(), reject.clone()) {
            reject.reject(reason);
        }
        deferred
    }

    /// Register handlers for the eventual outcome. Returns a new value that
    /// settles with the handler's result.
    ///
    /// An absent handler passes the value or reason through unchanged. A
    /// handler that is supplied but not callable rejects the returned value
    /// with [`Error::HandlerNotCallable`] once its side is dispatched. Never
    /// fails synchronously.
    pub fn then(&self, on_fulfilled: Handler<T, T, E>, on_rejected: Handler<E, T, E>) -> Self
    where
        E: From<Error>,
    {
        let on_fulfilled: Reaction<T, T, E> = on_fulfilled.into();
        let on_rejected: Reaction<E, T, E> = on_rejected.into();
        let scheduler = self.scheduler();
        Self::with_scheduler(scheduler, |resolve, reject| {
            let observer = Observer {
                on_fulfilled,
                on_rejected,
                resolve,
                reject,
            };
            let mut inner = self.inner.borrow_mut();
            if let State::Pending = inner.state {
                tracing::trace!(queued = inner.observers.len() + 1, "observer registered on pending value");
                inner.observers.push(observer);
                return Ok(());
            }
            let settled = inner.state.clone();
            let scheduler = Rc::clone(&inner.scheduler);
            drop(inner);
            dispatch(observer, &settled, scheduler.as_ref());
            Ok(())
        })
    }

    /// `then` with only a fulfilment handler.
    pub fn and_then<F>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(T) -> Result<T, E> + 'static,
        E: From<Error>,
    {
        self.then(Callback::from_fn(on_fulfilled), Callback::Absent)
    }

    /// `then` with only a rejection handler.
    pub fn or_else<F>(&self, on_rejected: F) -> Self
    where
        F: FnOnce(E) -> Result<T, E> + 'static,
        E: From<Error>,
    {
        self.then(Callback::Absent, Callback::from_fn(on_rejected))
    }

    pub(crate) fn scheduler(&self) -> Rc<dyn Schedule> {
        Rc::clone(&self.inner.borrow().scheduler)
    }

    fn resolve_handle(&self) -> Resolve<T, E> {
        Resolve {
            inner: Rc::clone(&self.inner),
        }
    }

    fn reject_handle(&self) -> Reject<T, E> {
        Reject {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> Deferred<T, E> {
    /// Whether both handles refer to the same value.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Resolve<T, E> {
    /// Fulfil with `value`, unless already settled.
    pub fn resolve(&self, value: T) {
        settle(&self.inner, State::Fulfilled(value));
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Reject<T, E> {
    /// Reject with `reason`, unless already settled.
    pub fn reject(&self, reason: E) {
        settle(&self.inner, State::Rejected(reason));
    }
}

fn settle<T: Clone + 'static, E: Clone + 'static>(inner: &RefCell<Inner<T, E>>, outcome: State<T, E>) {
    let mut guard = inner.borrow_mut();
    if !matches!(guard.state, State::Pending) {
        tracing::trace!(
            current = guard.state.label(),
            ignored = outcome.label(),
            "ignoring settlement of an already settled value"
        );
        return;
    }
    guard.state = outcome.clone();
    let observers = std::mem::take(&mut guard.observers);
    let scheduler = Rc::clone(&guard.scheduler);
    drop(guard);

    tracing::trace!(state = outcome.label(), observers = observers.len(), "value settled");
    for observer in observers {
        dispatch(observer, &outcome, scheduler.as_ref());
    }
}

fn dispatch<T: Clone + 'static, E: Clone + 'static>(
    observer: Observer<T, E>,
    settled: &State<T, E>,
    scheduler: &dyn Schedule,
) {
    let Observer {
        on_fulfilled,
        on_rejected,
        resolve,
        reject,
    } = observer;
    let task: Task = match settled {
        State::Pending => unreachable!("observer dispatched while its value is still pending"),
        State::Fulfilled(value) => {
            let value = value.clone();
            match on_fulfilled {
                Reaction::PassThrough => Box::new(move || resolve.resolve(value)),
                Reaction::Invoke(f) => Box::new(move || complete(f(value), &resolve, &reject)),
                Reaction::Fail(error) => {
                    tracing::debug!("fulfilment handler is not callable, rejecting the chained value");
                    reject.reject(error);
                    return;
                }
            }
        }
        State::Rejected(reason) => {
            let reason = reason.clone();
            match on_rejected {
                Reaction::PassThrough => Box::new(move || reject.reject(reason)),
                Reaction::Invoke(f) => Box::new(move || complete(f(reason), &resolve, &reject)),
                Reaction::Fail(error) => {
                    tracing::debug!("rejection handler is not callable, rejecting the chained value");
                    reject.reject(error);
                    return;
                }
            }
        }
    };
    scheduler.schedule(task);
}

fn complete<T: Clone + 'static, E: Clone + 'static>(
    outcome: Result<T, E>,
    resolve: &Resolve<T, E>,
    reject: &Reject<T, E>,
) {
    match outcome {
        Ok(value) => resolve.resolve(value),
        Err(reason) => reject.reject(reason),
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> Clone for Resolve<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> Clone for Reject<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Resolve<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolve").finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Reject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reject").finish_non_exhaustive()
    }
}
