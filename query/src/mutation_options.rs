use std::rc::Rc;

use crate::{Error, FunctionReference};

type OnSuccess<A, R> = Rc<dyn Fn(&R, &A)>;
type OnError<A> = Rc<dyn Fn(&Error, &A)>;
type OnSettled<A, R> = Rc<dyn Fn(Option<&R>, Option<&Error>, &A)>;

/**
 * Callbacks for a mutation [`use_mutation()`](crate::use_mutation())
 *
 * Each callback receives the arguments of the invocation it reports on.
 * `on_success`/`on_error` run first, then `on_settled`.
 */
pub struct MutationOptions<A, R> {
    /// Called with the result of a successful invocation.
    pub on_success: Option<OnSuccess<A, R>>,
    /// Called with the error of a failed invocation.
    pub on_error: Option<OnError<A>>,
    /// Called after every invocation, with either its result or its error.
    pub on_settled: Option<OnSettled<A, R>>,
}

impl<A, R> MutationOptions<A, R> {
    /// Options without callbacks.
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_settled: None,
        }
    }

    /// Options without callbacks, typed after `function`.
    ///
    /// Lets callback parameters be inferred when the options are built before
    /// being handed to [`use_mutation`](crate::use_mutation()).
    pub fn for_function(_function: FunctionReference<A, R>) -> Self {
        Self::new()
    }

    /// Set the success callback.
    pub fn set_on_success(self, on_success: impl Fn(&R, &A) + 'static) -> Self {
        MutationOptions {
            on_success: Some(Rc::new(on_success)),
            ..self
        }
    }

    /// Set the error callback.
    pub fn set_on_error(self, on_error: impl Fn(&Error, &A) + 'static) -> Self {
        MutationOptions {
            on_error: Some(Rc::new(on_error)),
            ..self
        }
    }

    /// Set the settled callback.
    pub fn set_on_settled(
        self,
        on_settled: impl Fn(Option<&R>, Option<&Error>, &A) + 'static,
    ) -> Self {
        MutationOptions {
            on_settled: Some(Rc::new(on_settled)),
            ..self
        }
    }
}

impl<A, R> Default for MutationOptions<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for MutationOptions<A, R> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_settled: self.on_settled.clone(),
        }
    }
}

impl<A, R> std::fmt::Debug for MutationOptions<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_settled", &self.on_settled.is_some())
            .finish()
    }
}
