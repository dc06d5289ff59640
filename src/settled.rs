use crate::{Callback, Deferred, Error};
use std::cell::RefCell;
use std::rc::Rc;
use std::{future::Future, task::{Poll, Waker}};

/// A future for the outcome of a [`Deferred`]. It can be cloned; every
/// clone resolves to the same outcome.
///
/// The future becomes ready once an observer task runs, so something must
/// drain the task queue.
///
/// # Examples
///
/// ```
/// use self_promise::{Deferred, Error, TaskQueue};
/// use futures::executor::block_on;
/// let settled = Deferred::<&str, Error>::resolved("Hi").settled();
/// TaskQueue::current().run_until_idle().unwrap();
/// assert_eq!(block_on(settled), Ok("Hi"));
/// ```
#[derive(Clone)]
pub struct Settled<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

struct Slot<T, E> {
    value: Option<Result<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Slot<T, E> {
    /// Store the outcome, then wake. A waker may poll the future inline, so
    /// the slot is not borrowed while waking.
    fn fill(slot: &RefCell<Self>, value: Result<T, E>) {
        let wakers = {
            let mut slot = slot.borrow_mut();
            slot.value = Some(value);
            std::mem::take(&mut slot.wakers)
        };
        for waker in wakers {
            waker.wake()
        }
    }
}

impl<T: Clone + 'static, E: Clone + From<Error> + 'static> Deferred<T, E> {
    /// Observe this value as a [`Future`].
    pub fn settled(&self) -> Settled<T, E> {
        let slot = Rc::new(RefCell::new(Slot {
            value: None,
            wakers: vec![],
        }));
        let (on_ok, on_err) = (slot.clone(), slot.clone());
        self.then(
            Callback::from_fn(move |value: T| {
                Slot::fill(&on_ok, Ok(value.clone()));
                Ok(value)
            }),
            Callback::from_fn(move |reason: E| {
                Slot::fill(&on_err, Err(reason.clone()));
                Err(reason)
            }),
        );
        Settled { slot }
    }
}

impl<T: Clone, E: Clone> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        match slot.value {
            Some(ref value) => Poll::Ready(value.clone()),
            None => {
                if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    slot.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T, E> std::fmt::Debug for Settled<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settled")
            .field("ready", &self.slot.borrow().value.is_some())
            .finish()
    }
}
