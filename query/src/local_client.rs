use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use async_trait::async_trait;
use leptos::logging;
use serde::Serialize;
use serde_json::Value;
use slotmap::SlotMap;

use crate::{
    BindingKey, Error, FunctionInvoker, FunctionReference, QueryRequest, QuerySnapshot, Rejection,
    ServerError, SnapshotListener, SubscriptionRegistry, WatchId,
};

type MutationHandler = Rc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, Rejection>>>>>;

/// In-memory backend for tests, demos and prototyping.
///
/// Results are pushed by hand with [`set_result`](Self::set_result) and friends; every
/// watcher of the affected binding is notified. Mutations are served by handlers
/// installed with [`register_mutation`](Self::register_mutation).
///
/// Only the latest snapshot per binding is stored.
#[derive(Clone, Default)]
pub struct LocalClient {
    results: Rc<RefCell<HashMap<BindingKey, QuerySnapshot<Value>>>>,
    watchers: Rc<RefCell<SlotMap<WatchId, Watcher>>>,
    mutations: Rc<RefCell<HashMap<&'static str, MutationHandler>>>,
    invocations: Rc<RefCell<HashMap<String, usize>>>,
}

struct Watcher {
    key: BindingKey,
    listener: Rc<dyn Fn(&QuerySnapshot<Value>)>,
}

impl std::fmt::Debug for LocalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalClient")
            .field("results", &self.results.try_borrow().map(|r| r.len()))
            .field("watchers", &self.watchers.try_borrow().map(|w| w.len()))
            .field("mutations", &"...")
            .finish()
    }
}

impl LocalClient {
    /// Creates an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot for a binding and notifies its watchers.
    pub fn set_result<A, R>(
        &self,
        function: FunctionReference<A, R>,
        args: &A,
        snapshot: QuerySnapshot<Value>,
    ) -> Result<(), Error>
    where
        A: Serialize,
    {
        let request = QueryRequest::new(function.path(), args)?;
        self.publish(request.key().clone(), snapshot);
        Ok(())
    }

    /// Stores a value for a binding and notifies its watchers.
    pub fn set_value<A, R>(
        &self,
        function: FunctionReference<A, R>,
        args: &A,
        value: &R,
    ) -> Result<(), Error>
    where
        A: Serialize,
        R: Serialize,
    {
        let value = serde_json::to_value(value).map_err(Error::encode)?;
        self.set_result(function, args, QuerySnapshot::Value(value))
    }

    /// Stores an error for a binding and notifies its watchers.
    pub fn set_error<A, R>(
        &self,
        function: FunctionReference<A, R>,
        args: &A,
        error: ServerError,
    ) -> Result<(), Error>
    where
        A: Serialize,
    {
        self.set_result(function, args, QuerySnapshot::Error(error.into()))
    }

    /// Forgets the result for a binding. Watchers see [`QuerySnapshot::Absent`].
    pub fn clear_result<A, R>(&self, function: FunctionReference<A, R>, args: &A) -> Result<(), Error>
    where
        A: Serialize,
    {
        self.set_result(function, args, QuerySnapshot::Absent)
    }

    /// Installs the handler that serves calls to `function`.
    /// Replaces any previous handler for the same path.
    pub fn register_mutation<A, R, F, Fu>(&self, function: FunctionReference<A, R>, handler: F)
    where
        F: Fn(Value) -> Fu + 'static,
        Fu: Future<Output = Result<Value, Rejection>> + 'static,
    {
        let handler: MutationHandler = Rc::new(move |args| {
            Box::pin(handler(args)) as Pin<Box<dyn Future<Output = Result<Value, Rejection>>>>
        });
        self.mutations
            .try_borrow_mut()
            .expect("register_mutation borrow_mut")
            .insert(function.path(), handler);
    }

    /// Number of live watches across all bindings.
    pub fn watch_count(&self) -> usize {
        self.watchers.try_borrow().expect("watch_count borrow").len()
    }

    /// Number of live watches for one binding.
    pub fn watchers_of<A, R>(&self, function: FunctionReference<A, R>, args: &A) -> usize
    where
        A: Serialize,
    {
        let Ok(request) = QueryRequest::new(function.path(), args) else {
            return 0;
        };
        self.watchers
            .try_borrow()
            .expect("watchers_of borrow")
            .values()
            .filter(|watcher| &watcher.key == request.key())
            .count()
    }

    /// Number of times a function has been invoked.
    pub fn invocation_count(&self, path: &str) -> usize {
        self.invocations
            .try_borrow()
            .expect("invocation_count borrow")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    fn publish(&self, key: BindingKey, snapshot: QuerySnapshot<Value>) {
        self.results
            .try_borrow_mut()
            .expect("publish borrow_mut")
            .insert(key.clone(), snapshot.clone());

        // Collect first: listeners may watch or unwatch while being notified.
        let listeners: Vec<_> = self
            .watchers
            .try_borrow()
            .expect("publish borrow")
            .values()
            .filter(|watcher| watcher.key == key)
            .map(|watcher| watcher.listener.clone())
            .collect();

        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl SubscriptionRegistry for LocalClient {
    fn watch(&self, request: &QueryRequest, listener: SnapshotListener) -> WatchId {
        let watcher = Watcher {
            key: request.key().clone(),
            listener: Rc::from(listener),
        };
        self.watchers
            .try_borrow_mut()
            .expect("watch borrow_mut")
            .insert(watcher)
    }

    fn unwatch(&self, id: WatchId) -> bool {
        self.watchers
            .try_borrow_mut()
            .expect("unwatch borrow_mut")
            .remove(id)
            .is_some()
    }

    fn current(&self, request: &QueryRequest) -> QuerySnapshot<Value> {
        self.results
            .try_borrow()
            .expect("current borrow")
            .get(request.key())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl FunctionInvoker for LocalClient {
    async fn invoke(&self, path: &str, args: Value) -> Result<Value, Rejection> {
        *self
            .invocations
            .try_borrow_mut()
            .expect("invoke borrow_mut")
            .entry(path.to_string())
            .or_default() += 1;

        let handler = self
            .mutations
            .try_borrow()
            .expect("invoke borrow")
            .get(path)
            .cloned();

        match handler {
            Some(handler) => handler(args).await,
            None => {
                logging::error!("No handler registered for {path}");
                Err(ServerError::new(format!("Could not find function for '{path}'")).into())
            }
        }
    }
}
