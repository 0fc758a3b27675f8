use std::marker::PhantomData;

/// What kind of remote function a [`FunctionReference`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Read-only function that can be subscribed to.
    Query,
    /// Transactional write.
    Mutation,
    /// Non-transactional function, may have side effects.
    Action,
}

/// Typed handle to a remote function.
///
/// The `Args` and `Output` parameters carry the function's signature so that
/// [`use_query`](crate::use_query()) and [`use_mutation`](crate::use_mutation()) can infer
/// the argument and result types from the reference alone.
///
/// ```
/// use leptos_sync_query::*;
///
/// #[derive(Debug, Clone, serde::Serialize)]
/// struct ListArgs {
///     channel: String,
/// }
///
/// const LIST_MESSAGES: FunctionReference<ListArgs, Vec<String>> =
///     FunctionReference::query("messages:list");
///
/// assert_eq!(LIST_MESSAGES.path(), "messages:list");
/// assert_eq!(LIST_MESSAGES.kind(), FunctionKind::Query);
/// ```
pub struct FunctionReference<Args, Output> {
    path: &'static str,
    kind: FunctionKind,
    _marker: PhantomData<fn(Args) -> Output>,
}

impl<Args, Output> FunctionReference<Args, Output> {
    /// Reference to a query function.
    pub const fn query(path: &'static str) -> Self {
        Self::new(path, FunctionKind::Query)
    }

    /// Reference to a mutation function.
    pub const fn mutation(path: &'static str) -> Self {
        Self::new(path, FunctionKind::Mutation)
    }

    /// Reference to an action function.
    pub const fn action(path: &'static str) -> Self {
        Self::new(path, FunctionKind::Action)
    }

    const fn new(path: &'static str, kind: FunctionKind) -> Self {
        Self {
            path,
            kind,
            _marker: PhantomData,
        }
    }

    /// The function's path, e.g. `"messages:list"`.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The function's kind.
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }
}

// Manual impls: the phantom types should not need to be Clone/Eq/etc.
impl<Args, Output> Clone for FunctionReference<Args, Output> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args, Output> Copy for FunctionReference<Args, Output> {}

impl<Args, Output> PartialEq for FunctionReference<Args, Output> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.kind == other.kind
    }
}

impl<Args, Output> Eq for FunctionReference<Args, Output> {}

impl<Args, Output> std::hash::Hash for FunctionReference<Args, Output> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.kind.hash(state);
    }
}

impl<Args, Output> std::fmt::Debug for FunctionReference<Args, Output> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionReference")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}
