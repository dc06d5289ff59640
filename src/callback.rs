/// An optional callable argument, as handed to [`Deferred::try_new`] and
/// [`Deferred::then`].
///
/// Absent and supplied-but-not-callable are different cases: an absent
/// handler passes the settled value through, a non-callable one fails the
/// chain with [`Error::HandlerNotCallable`].
///
/// [`Deferred::try_new`]: crate::Deferred::try_new
/// [`Deferred::then`]: crate::Deferred::then
/// [`Error::HandlerNotCallable`]: crate::Error::HandlerNotCallable
pub enum Callback<F> {
    Absent,
    Callable(F),
    /// Something was supplied that cannot be called. Holds a description of
    /// it for the error message.
    NotCallable(String),
}

/// A `then` handler taking `A` and producing the next link's outcome.
/// Returning `Err` is how a handler throws.
pub type Handler<A, T, E> = Callback<Box<dyn FnOnce(A) -> Result<T, E>>>;

impl<F> Callback<F> {
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    pub fn not_callable(what: impl Into<String>) -> Self {
        Self::NotCallable(what.into())
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Absent => "nothing".to_owned(),
            Self::Callable(_) => "a function".to_owned(),
            Self::NotCallable(what) => what.clone(),
        }
    }
}

impl<A, T, E> Callback<Box<dyn FnOnce(A) -> Result<T, E>>> {
    /// Box `f` as a callable handler.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(A) -> Result<T, E> + 'static,
    {
        Self::Callable(Box::new(f))
    }
}

impl<F> Default for Callback<F> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<F> std::fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::NotCallable(what) => f.debug_tuple("NotCallable").field(what).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Callback, Handler};

    #[test]
    fn test_describe() {
        let absent: Handler<i32, i32, ()> = Callback::Absent;
        let callable: Handler<i32, i32, ()> = Callback::from_fn(|v| Ok(v + 1));
        let literal: Handler<i32, i32, ()> = Callback::not_callable("the string \"test\"");
        assert_eq!(absent.describe(), "nothing");
        assert!(callable.is_callable());
        assert!(!literal.is_callable());
        assert_eq!(literal.describe(), "the string \"test\"");
        assert_eq!(format!("{literal:?}"), "NotCallable(\"the string \\\"test\\\"\")");
    }
}
