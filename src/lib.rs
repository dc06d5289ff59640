//! A single-threaded promise: a value that settles once, as fulfilled or
//! rejected, and notifies its observers through a FIFO task queue.
//!
//! - [`Deferred`] is the promise. [`Deferred::then`] chains a new one.
//! - [`Resolve`] and [`Reject`] are its settlement capabilities.
//! - [`TaskQueue`] runs the handlers. Nothing is dispatched until the host
//!   drains it.
//!
//! A handler throws by returning `Err`, which rejects the next link. The
//! reason type only needs to absorb the crate's own [`Error`]:
//!
//! ```
//! use self_promise::{Callback, Deferred, Error, TaskQueue};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Reason {
//!     Overflow,
//!     Promise(Error),
//! }
//!
//! impl From<Error> for Reason {
//!     fn from(err: Error) -> Self {
//!         Reason::Promise(err)
//!     }
//! }
//!
//! let chained = Deferred::<u8, Reason>::new(|resolve, _| {
//!     resolve.resolve(255);
//!     Ok(())
//! })
//! .then(
//!     Callback::from_fn(|v: u8| v.checked_add(1).ok_or(Reason::Overflow)),
//!     Callback::Absent,
//! )
//! .or_else(|reason| match reason {
//!     Reason::Overflow => Ok(0),
//!     other => Err(other),
//! });
//! let settled = chained.settled();
//! TaskQueue::current().run_until_idle().unwrap();
//! assert_eq!(futures::executor::block_on(settled), Ok(0));
//! ```
pub mod adapter;
pub mod callback;
pub mod deferred;
pub mod queue;
pub mod settled;

pub use adapter::{deferred, deferred_in, Handle};
pub use callback::{Callback, Handler};
pub use deferred::{Deferred, Reject, Resolve};
pub use queue::{QueueConfig, Schedule, Task, TaskQueue};
pub use settled::Settled;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("setup must be callable, got {0}")]
    SetupNotCallable(String),
    #[error("handler must be callable, got {0}")]
    HandlerNotCallable(String),
    #[error("task queue drain budget of {budget} tasks exceeded")]
    DrainBudgetExceeded { budget: usize },
}
