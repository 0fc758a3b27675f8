use crate::{
    DefaultQueryOptions, Error, FunctionInvoker, FunctionReference, QueryRequest, QuerySnapshot,
    SubscriptionRegistry,
};
use leptos::{provide_context, use_context};
use serde::Serialize;
use std::rc::Rc;

/// Provides a Query Client to the current scope.
pub fn provide_query_client(client: QueryClient) {
    provide_context(client);
}

/// Retrieves a Query Client from the current scope.
pub fn use_query_client() -> QueryClient {
    use_context::<QueryClient>().expect("Query Client Missing.")
}

/// Handle to the backing sync engine, shared through context.
///
/// Holds the [`SubscriptionRegistry`] used by [`use_query`](crate::use_query()) and the
/// [`FunctionInvoker`] used by [`use_mutation`](crate::use_mutation()), along with
/// client-wide query defaults.
#[derive(Clone)]
pub struct QueryClient {
    pub(crate) registry: Rc<dyn SubscriptionRegistry>,
    pub(crate) invoker: Rc<dyn FunctionInvoker>,
    pub(crate) default_options: DefaultQueryOptions,
}

impl QueryClient {
    /// Creates a client from separate registry and invoker halves.
    pub fn new(registry: Rc<dyn SubscriptionRegistry>, invoker: Rc<dyn FunctionInvoker>) -> Self {
        Self {
            registry,
            invoker,
            default_options: DefaultQueryOptions::default(),
        }
    }

    /// Creates a client from a backend that implements both halves.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: SubscriptionRegistry + FunctionInvoker + 'static,
    {
        let backend = Rc::new(backend);
        Self::new(backend.clone(), backend)
    }

    /// Overrides the client-wide query defaults.
    pub fn with_default_options(self, default_options: DefaultQueryOptions) -> Self {
        Self {
            default_options,
            ..self
        }
    }

    /// The client-wide query defaults.
    pub fn default_options(&self) -> DefaultQueryOptions {
        self.default_options
    }

    /// Retrieve the latest snapshot for a binding without subscribing to it.
    pub fn peek_query<A, R>(&self, function: FunctionReference<A, R>, args: &A) -> QuerySnapshot<R>
    where
        A: Serialize,
        R: serde::de::DeserializeOwned,
    {
        match QueryRequest::new(function.path(), args) {
            Ok(request) => self.registry.current(&request).decode(),
            Err(error) => QuerySnapshot::Error(error),
        }
    }

    /// Calls a remote function once, without any lifecycle tracking.
    ///
    /// Thrown values that are not error objects become [`Error::Unknown`].
    pub async fn call<A, R>(&self, function: FunctionReference<A, R>, args: &A) -> Result<R, Error>
    where
        A: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let args = serde_json::to_value(args).map_err(Error::encode)?;
        let value = self.invoker.invoke(function.path(), args).await?;
        serde_json::from_value(value).map_err(Error::decode)
    }
}
