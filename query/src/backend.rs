use async_trait::async_trait;
use serde_json::Value;

use crate::{Error, QueryRequest, QuerySnapshot, ServerError};

slotmap::new_key_type! {
    /// Identifies a single watch registered with a [`SubscriptionRegistry`].
    pub struct WatchId;
}

/// Receives every new snapshot for a watched binding.
pub type SnapshotListener = Box<dyn Fn(&QuerySnapshot<Value>)>;

/// The reactive side of the backing sync engine.
///
/// Implementations own caching, transport and retries. The adapter only
/// registers interest in bindings and reads the latest snapshot.
pub trait SubscriptionRegistry {
    /// Starts watching a binding. The listener must not be called from inside `watch`.
    fn watch(&self, request: &QueryRequest, listener: SnapshotListener) -> WatchId;

    /// Stops a watch. Returns false if the id was unknown.
    fn unwatch(&self, id: WatchId) -> bool;

    /// The latest snapshot for a binding.
    fn current(&self, request: &QueryRequest) -> QuerySnapshot<Value>;
}

/// The imperative side of the backing sync engine: one-shot remote calls.
#[async_trait(?Send)]
pub trait FunctionInvoker {
    /// Calls the function at `path` once with `args`.
    async fn invoke(&self, path: &str, args: Value) -> Result<Value, Rejection>;
}

/// Why a remote call failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The function raised a proper error object.
    Error(ServerError),
    /// The function failed with some other value.
    Thrown(Value),
}

impl From<ServerError> for Rejection {
    fn from(error: ServerError) -> Self {
        Rejection::Error(error)
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Error(error) => Error::Server(error),
            Rejection::Thrown(_) => Error::Unknown,
        }
    }
}
