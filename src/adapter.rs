//! Helpers for driving a [`Deferred`] from outside its setup routine.
use crate::{Deferred, Reject, Resolve, Schedule, TaskQueue};
use std::rc::Rc;

/// A pending [`Deferred`] together with its two capabilities.
///
/// # Examples
///
/// ```
/// use self_promise::{deferred, Error, TaskQueue};
/// use std::{cell::Cell, rc::Rc};
/// let handle = deferred::<&str, Error>();
/// let seen = Rc::new(Cell::new(""));
/// let out = seen.clone();
/// handle.promise.and_then(move |v| {
///     out.set(v);
///     Ok(v)
/// });
/// handle.resolve.resolve("🍓");
/// TaskQueue::current().run_until_idle().unwrap();
/// assert_eq!(seen.get(), "🍓");
/// ```
#[derive(Debug, Clone)]
pub struct Handle<T, E> {
    pub promise: Deferred<T, E>,
    pub resolve: Resolve<T, E>,
    pub reject: Reject<T, E>,
}

/// A pending value on the current thread's queue, settled through the
/// returned handle.
pub fn deferred<T: Clone + 'static, E: Clone + 'static>() -> Handle<T, E> {
    deferred_in(TaskQueue::current())
}

pub fn deferred_in<T, E, S>(scheduler: S) -> Handle<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    S: Schedule + 'static,
{
    let mut capabilities = None;
    let promise = Deferred::with_scheduler(Rc::new(scheduler), |resolve, reject| {
        capabilities = Some((resolve, reject));
        Ok(())
    });
    match capabilities {
        Some((resolve, reject)) => Handle {
            promise,
            resolve,
            reject,
        },
        None => unreachable!("setup runs during construction"),
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// An already fulfilled value.
    pub fn resolved(value: T) -> Self {
        Self::new(|resolve, _| {
            resolve.resolve(value);
            Ok(())
        })
    }

    /// An already rejected value.
    pub fn rejected(reason: E) -> Self {
        Self::new(|_, reject| {
            reject.reject(reason);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{deferred, deferred_in};
    use crate::{Deferred, Error, TaskQueue};
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_resolved_is_observed_late() {
        let seen = Rc::new(RefCell::new(None));
        let out = seen.clone();
        Deferred::<i32, Error>::resolved(42).and_then(move |v| {
            *out.borrow_mut() = Some(v);
            Ok(v)
        });
        assert_eq!(*seen.borrow(), None);
        TaskQueue::current().run_until_idle().unwrap();
        assert_eq!(*seen.borrow(), Some(42));
    }

    #[test]
    fn test_rejected() {
        let seen = Rc::new(RefCell::new(None));
        let out = seen.clone();
        Deferred::<i32, Error>::rejected(Error::HandlerNotCallable("x".into())).or_else(move |e| {
            *out.borrow_mut() = Some(e);
            Ok(0)
        });
        TaskQueue::current().run_until_idle().unwrap();
        assert_eq!(*seen.borrow(), Some(Error::HandlerNotCallable("x".into())));
    }

    #[test]
    fn test_handle_settles_once() {
        let queue = TaskQueue::default();
        let handle = deferred_in::<i32, Error, _>(queue.clone());
        let seen = Rc::new(RefCell::new(vec![]));
        let out = seen.clone();
        handle.promise.and_then(move |v| {
            out.borrow_mut().push(v);
            Ok(v)
        });
        handle.resolve.resolve(1);
        handle.resolve.resolve(2);
        handle.reject.reject(Error::SetupNotCallable("3".into()));
        queue.run_until_idle().unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_handle_uses_current_queue() {
        let handle = deferred::<i32, Error>();
        handle.promise.and_then(Ok);
        handle.resolve.resolve(7);
        assert_eq!(TaskQueue::current().len(), 1);
        TaskQueue::current().run_until_idle().unwrap();
    }
}
