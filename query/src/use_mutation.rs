use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use leptos::*;

use crate::{
    use_query_client, Error, FunctionKind, FunctionReference, MutationOptions, MutationState,
    MutationStatus, QueryClient,
};

/// Wraps a remote mutation in a Tanstack Query style lifecycle.
///
/// Each call to [`mutate_async`](Mutation::mutate_async) moves the status to
/// `Pending` and dispatches the function once before returning. Awaiting the
/// returned future moves the status to `Success` or `Error` and
/// runs the matching callbacks from `options` before `on_settled`. The outcome is
/// always returned to the caller as well, errors included.
///
/// Overlapping calls are allowed. Every call resolves with its own outcome and
/// runs its own callbacks, but only the most recently invoked call writes the
/// shared state.
///
/// Once the reactive scope that created the mutation is cleaned up, late outcomes
/// no longer touch state or run callbacks.
///
/// Example
/// ```
/// use leptos::*;
/// use leptos_sync_query::*;
/// use serde::*;
///
/// #[derive(Debug, Clone, Serialize)]
/// struct SendArgs {
///     body: String,
/// }
///
/// const SEND_MESSAGE: FunctionReference<SendArgs, ()> = FunctionReference::mutation("messages:send");
///
/// fn use_send_message(draft: RwSignal<String>) -> Mutation<SendArgs, ()> {
///     use_mutation(
///         SEND_MESSAGE,
///         MutationOptions::for_function(SEND_MESSAGE)
///             .set_on_success(move |_, _| draft.set(String::new()))
///             .set_on_error(|error, args| logging::warn!("Failed to send {:?}: {error}", args.body)),
///     )
/// }
/// ```
pub fn use_mutation<A, R>(
    function: FunctionReference<A, R>,
    options: MutationOptions<A, R>,
) -> Mutation<A, R>
where
    A: crate::FunctionArgs,
    R: crate::QueryValue,
{
    if function.kind() == FunctionKind::Query {
        logging::debug_warn!(
            "use_mutation called with query function {}. Queries should be read with use_query.",
            function.path()
        );
    }

    let state = RwSignal::new(MutationState::<R>::default());

    let alive = Rc::new(Cell::new(true));
    on_cleanup({
        let alive = alive.clone();
        move || alive.set(false)
    });

    let inner = Rc::new(MutationInner {
        client: use_query_client(),
        function,
        options,
        state,
        generation: Cell::new(0),
        alive,
    });

    Mutation {
        state: state.into(),
        status: create_memo(move |_| state.with(|s| s.status)).into(),
        is_idle: create_memo(move |_| state.with(|s| s.status == MutationStatus::Idle)).into(),
        is_pending: create_memo(move |_| state.with(|s| s.is_pending())).into(),
        is_success: create_memo(move |_| state.with(|s| s.status == MutationStatus::Success))
            .into(),
        is_error: create_memo(move |_| state.with(|s| s.status == MutationStatus::Error)).into(),
        error: create_memo(move |_| state.with(|s| s.error.clone())).into(),
        data: create_memo(move |_| state.with(|s| s.data.clone())).into(),
        inner,
    }
}

/// Reactive mutation handle returned by [`use_mutation`].
pub struct Mutation<A, R>
where
    A: 'static,
    R: 'static,
{
    /// The full state.
    pub state: Signal<MutationState<R>>,
    /// Current status.
    pub status: Signal<MutationStatus>,
    /// Nothing invoked since creation or the last reset.
    pub is_idle: Signal<bool>,
    /// An invocation is in flight.
    pub is_pending: Signal<bool>,
    /// The latest invocation succeeded.
    pub is_success: Signal<bool>,
    /// The latest invocation failed.
    pub is_error: Signal<bool>,
    /// Error of the latest failed invocation.
    pub error: Signal<Option<Error>>,
    /// Result of the latest successful invocation.
    pub data: Signal<Option<R>>,

    inner: Rc<MutationInner<A, R>>,
}

impl<A: 'static, R: 'static> Clone for Mutation<A, R> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            status: self.status,
            is_idle: self.is_idle,
            is_pending: self.is_pending,
            is_success: self.is_success,
            is_error: self.is_error,
            error: self.error,
            data: self.data,
            inner: self.inner.clone(),
        }
    }
}

impl<A, R> Mutation<A, R>
where
    A: crate::FunctionArgs,
    R: crate::QueryValue,
{
    /// Invokes the mutation and resolves with its outcome.
    ///
    /// The status is `Pending` and the function has been dispatched by the time
    /// this returns. The returned future owns everything it needs and can be
    /// handed to [`spawn_local`](leptos::spawn_local) or awaited directly; it must
    /// be driven for the outcome to reach the state and callbacks.
    pub fn mutate_async(&self, args: A) -> impl Future<Output = Result<R, Error>> + 'static {
        let generation = self.inner.begin();
        let mut settle = Box::pin(self.inner.clone().settle(generation, args));

        // Polled once here so the call goes out now, not on first await.
        let settled = settle.as_mut().now_or_never();

        async move {
            match settled {
                Some(outcome) => outcome,
                None => settle.await,
            }
        }
    }

    /// Same as [`mutate_async`](Self::mutate_async).
    pub fn mutate(&self, args: A) -> impl Future<Output = Result<R, Error>> + 'static {
        self.mutate_async(args)
    }

    /// Returns to `Idle` and clears the stored error and data.
    /// An invocation already in flight is not cancelled.
    pub fn reset(&self) {
        self.inner.update_state(|state| state.reset());
    }
}

struct MutationInner<A, R>
where
    A: 'static,
    R: 'static,
{
    client: QueryClient,
    function: FunctionReference<A, R>,
    options: MutationOptions<A, R>,
    state: RwSignal<MutationState<R>>,
    // Bumped on every invocation; only the latest one writes state.
    generation: Cell<u64>,
    alive: Rc<Cell<bool>>,
}

impl<A, R> MutationInner<A, R>
where
    A: crate::FunctionArgs,
    R: crate::QueryValue,
{
    fn begin(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.update_state(|state| state.start());
        generation
    }

    async fn settle(self: Rc<Self>, generation: u64, args: A) -> Result<R, Error> {
        let outcome = self.client.call(self.function, &args).await;

        if !self.alive.get() {
            logging::debug_warn!(
                "Mutation {} settled after its scope was cleaned up.",
                self.function.path()
            );
            return outcome;
        }

        let is_latest = generation == self.generation.get();
        let options = &self.options;
        match &outcome {
            Ok(data) => {
                if is_latest {
                    self.update_state(|state| state.succeed(data.clone()));
                }
                if let Some(on_success) = &options.on_success {
                    on_success(data, &args);
                }
                if let Some(on_settled) = &options.on_settled {
                    on_settled(Some(data), None, &args);
                }
            }
            Err(error) => {
                if is_latest {
                    self.update_state(|state| state.fail(error.clone()));
                }
                if let Some(on_error) = &options.on_error {
                    on_error(error, &args);
                }
                if let Some(on_settled) = &options.on_settled {
                    on_settled(None, Some(error), &args);
                }
            }
        }

        outcome
    }

    fn update_state(&self, update: impl FnOnce(&mut MutationState<R>)) {
        if !self.alive.get() {
            return;
        }
        if self.state.try_update(update).is_none() {
            logging::debug_warn!("Mutation {} state was already disposed.", self.function.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{provide_query_client, LocalClient, Rejection, ServerError};
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use futures_channel::oneshot;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const UPDATE: FunctionReference<Value, Value> = FunctionReference::mutation("items:update");

    type Reply = Result<Value, Rejection>;

    /// Handler whose calls resolve only when the test sends a reply, in call order.
    fn controlled(backend: &LocalClient, calls: usize) -> Vec<oneshot::Sender<Reply>> {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..calls).map(|_| oneshot::channel::<Reply>()).unzip();
        let receivers = Rc::new(RefCell::new(receivers));
        backend.register_mutation(UPDATE, move |_| {
            let receiver = receivers.borrow_mut().pop_front();
            async move {
                match receiver {
                    Some(receiver) => receiver
                        .await
                        .unwrap_or_else(|_| Err(Rejection::Thrown(Value::Null))),
                    None => Err(Rejection::Thrown(json!("unexpected call"))),
                }
            }
        });
        senders
    }

    fn setup() -> LocalClient {
        let backend = LocalClient::new();
        provide_query_client(QueryClient::from_backend(backend.clone()));
        backend
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Success(Value, Value),
        Error(Error, Value),
        Settled(Option<Value>, Option<Error>, Value),
    }

    fn recording_options(events: &Rc<RefCell<Vec<Event>>>) -> MutationOptions<Value, Value> {
        let on_success = events.clone();
        let on_error = events.clone();
        let on_settled = events.clone();
        MutationOptions::for_function(UPDATE)
            .set_on_success(move |data, args| {
                on_success
                    .borrow_mut()
                    .push(Event::Success(data.clone(), args.clone()))
            })
            .set_on_error(move |error, args| {
                on_error
                    .borrow_mut()
                    .push(Event::Error(error.clone(), args.clone()))
            })
            .set_on_settled(move |data, error, args| {
                on_settled.borrow_mut().push(Event::Settled(
                    data.cloned(),
                    error.cloned(),
                    args.clone(),
                ))
            })
    }

    #[test]
    fn success_lifecycle() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 1);
        let events = Rc::new(RefCell::new(Vec::new()));
        let mutation = use_mutation(UPDATE, recording_options(&events));
        let mut pool = LocalPool::new();
        let outcome = Rc::new(RefCell::new(None));

        assert_eq!(mutation.status.get_untracked(), MutationStatus::Idle);

        let fut = mutation.mutate(json!({"id": 1}));
        pool.spawner()
            .spawn_local({
                let outcome = outcome.clone();
                async move { *outcome.borrow_mut() = Some(fut.await) }
            })
            .unwrap();
        pool.run_until_stalled();

        assert_eq!(mutation.status.get_untracked(), MutationStatus::Pending);
        assert!(mutation.is_pending.get_untracked());
        assert!(events.borrow().is_empty());

        senders.remove(0).send(Ok(json!({"ok": true}))).unwrap();
        pool.run_until_stalled();

        assert_eq!(mutation.status.get_untracked(), MutationStatus::Success);
        assert_eq!(mutation.error.get_untracked(), None);
        assert_eq!(mutation.data.get_untracked(), Some(json!({"ok": true})));
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Success(json!({"ok": true}), json!({"id": 1})),
                Event::Settled(Some(json!({"ok": true})), None, json!({"id": 1})),
            ]
        );
        assert_eq!(*outcome.borrow(), Some(Ok(json!({"ok": true}))));
        assert_eq!(backend.invocation_count(UPDATE.path()), 1);
    }

    #[test]
    fn thrown_value_becomes_unknown_error() {
        let _ = create_runtime();
        let backend = setup();
        backend.register_mutation(UPDATE, |_| async move {
            Err::<Value, _>(Rejection::Thrown(json!("boom")))
        });
        let events = Rc::new(RefCell::new(Vec::new()));
        let mutation = use_mutation(UPDATE, recording_options(&events));

        let outcome = block_on(mutation.mutate_async(json!({"id": 2})));

        assert_eq!(outcome, Err(Error::Unknown));
        assert_eq!(mutation.status.get_untracked(), MutationStatus::Error);
        let error = mutation.error.get_untracked();
        assert_eq!(error.map(|e| e.to_string()), Some("Unknown error".to_string()));
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Error(Error::Unknown, json!({"id": 2})),
                Event::Settled(None, Some(Error::Unknown), json!({"id": 2})),
            ]
        );
    }

    #[test]
    fn server_error_is_kept() {
        let _ = create_runtime();
        let backend = setup();
        backend.register_mutation(UPDATE, |_| async move {
            Err::<Value, _>(Rejection::from(ServerError::new("conflict")))
        });
        let mutation = use_mutation(UPDATE, MutationOptions::new());

        let outcome = block_on(mutation.mutate_async(json!({})));

        let expected = Error::Server(ServerError::new("conflict"));
        assert_eq!(outcome, Err(expected.clone()));
        assert_eq!(mutation.error.get_untracked(), Some(expected));
        assert!(mutation.is_error.get_untracked());
    }

    #[test]
    fn reset_after_error() {
        let _ = create_runtime();
        let backend = setup();
        backend.register_mutation(UPDATE, |_| async move {
            Err::<Value, _>(Rejection::Thrown(json!(1)))
        });
        let mutation = use_mutation(UPDATE, MutationOptions::new());

        let _ = block_on(mutation.mutate_async(json!({})));
        assert!(mutation.is_error.get_untracked());

        mutation.reset();

        assert_eq!(mutation.status.get_untracked(), MutationStatus::Idle);
        assert!(mutation.is_idle.get_untracked());
        assert!(!mutation.is_pending.get_untracked());
        assert_eq!(mutation.error.get_untracked(), None);
        assert_eq!(mutation.state.get_untracked(), MutationState::default());
    }

    #[test]
    fn next_mutate_clears_error() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 2);
        let mutation = use_mutation(UPDATE, MutationOptions::new());
        let mut pool = LocalPool::new();

        senders.remove(0).send(Err(Rejection::Thrown(json!(0)))).unwrap();
        let _ = pool.run_until(mutation.mutate_async(json!({})));
        assert!(mutation.is_error.get_untracked());

        let fut = mutation.mutate_async(json!({}));
        pool.spawner()
            .spawn_local(async move {
                let _ = fut.await;
            })
            .unwrap();
        pool.run_until_stalled();

        assert!(mutation.is_pending.get_untracked());
        assert_eq!(mutation.error.get_untracked(), None);

        senders.remove(0).send(Ok(json!(1))).unwrap();
        pool.run_until_stalled();
        assert!(mutation.is_success.get_untracked());
    }

    #[test]
    fn latest_invocation_owns_the_state() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 2);
        let events = Rc::new(RefCell::new(Vec::new()));
        let mutation = use_mutation(UPDATE, recording_options(&events));
        let mut pool = LocalPool::new();
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        for id in [1, 2] {
            let fut = mutation.mutate_async(json!({ "id": id }));
            let outcomes = outcomes.clone();
            pool.spawner()
                .spawn_local(async move {
                    let outcome = fut.await;
                    outcomes.borrow_mut().push((id, outcome));
                })
                .unwrap();
        }
        pool.run_until_stalled();
        let first = senders.remove(0);
        let second = senders.remove(0);

        // Second call resolves first.
        second.send(Ok(json!("second"))).unwrap();
        pool.run_until_stalled();
        assert_eq!(mutation.data.get_untracked(), Some(json!("second")));

        first.send(Err(Rejection::Thrown(json!("late")))).unwrap();
        pool.run_until_stalled();

        // The superseded call does not overwrite the state...
        assert_eq!(mutation.status.get_untracked(), MutationStatus::Success);
        assert_eq!(mutation.data.get_untracked(), Some(json!("second")));
        // ...but still reports its own outcome.
        assert_eq!(
            *outcomes.borrow(),
            vec![(2, Ok(json!("second"))), (1, Err(Error::Unknown))]
        );
        assert_eq!(events.borrow().len(), 4);
    }

    #[test]
    fn reset_does_not_cancel_in_flight_call() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 1);
        let mutation = use_mutation(UPDATE, MutationOptions::new());
        let mut pool = LocalPool::new();

        let fut = mutation.mutate_async(json!({}));
        pool.spawner()
            .spawn_local(async move {
                let _ = fut.await;
            })
            .unwrap();
        pool.run_until_stalled();

        mutation.reset();
        assert!(mutation.is_idle.get_untracked());

        senders.remove(0).send(Ok(json!("landed"))).unwrap();
        pool.run_until_stalled();

        assert!(mutation.is_success.get_untracked());
        assert_eq!(mutation.data.get_untracked(), Some(json!("landed")));
    }

    #[test]
    fn mutate_dispatches_before_it_is_awaited() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 2);
        let mutation = use_mutation(UPDATE, MutationOptions::new());

        let first = mutation.mutate(json!({"id": 1}));

        assert_eq!(mutation.status.get_untracked(), MutationStatus::Pending);
        assert_eq!(backend.invocation_count(UPDATE.path()), 1);

        // Call order decides which invocation owns the state, not poll order.
        let second = mutation.mutate(json!({"id": 2}));
        assert_eq!(backend.invocation_count(UPDATE.path()), 2);

        senders.remove(0).send(Ok(json!("first"))).unwrap();
        senders.remove(0).send(Ok(json!("second"))).unwrap();
        assert_eq!(block_on(second), Ok(json!("second")));
        assert_eq!(block_on(first), Ok(json!("first")));

        assert_eq!(mutation.data.get_untracked(), Some(json!("second")));
    }

    #[test]
    fn immediate_outcome_settles_without_polling() {
        let _ = create_runtime();
        let backend = setup();
        backend.register_mutation(UPDATE, |args| async move { Ok::<_, Rejection>(args) });
        let mutation = use_mutation(UPDATE, MutationOptions::new());

        let outcome = mutation.mutate(json!({"id": 3}));

        assert!(mutation.is_success.get_untracked());
        assert_eq!(mutation.data.get_untracked(), Some(json!({"id": 3})));
        assert_eq!(block_on(outcome), Ok(json!({"id": 3})));
    }

    #[test]
    fn outcome_after_cleanup_is_dropped() {
        let _ = create_runtime();
        let backend = setup();
        let mut senders = controlled(&backend, 1);
        let events = Rc::new(RefCell::new(Vec::new()));
        let scoped = as_child_of_current_owner(|options: MutationOptions<Value, Value>| {
            use_mutation(UPDATE, options)
        });
        let (mutation, disposer) = scoped(recording_options(&events));
        let mut pool = LocalPool::new();
        let outcome = Rc::new(RefCell::new(None));

        let fut = mutation.mutate_async(json!({}));
        assert!(mutation.is_pending.get_untracked());
        pool.spawner()
            .spawn_local({
                let outcome = outcome.clone();
                async move { *outcome.borrow_mut() = Some(fut.await) }
            })
            .unwrap();
        pool.run_until_stalled();

        drop(disposer);
        senders.remove(0).send(Ok(json!(1))).unwrap();
        pool.run_until_stalled();

        assert!(events.borrow().is_empty());
        assert_eq!(*outcome.borrow(), Some(Ok(json!(1))));
        assert_eq!(backend.invocation_count(UPDATE.path()), 1);
    }
}
