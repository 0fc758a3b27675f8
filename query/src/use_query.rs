use crate::query_observer::QueryObserver;
use crate::query_result::QueryResult;
use crate::{
    derive_query_state, use_query_client, BindingKey, Error, FunctionKind, FunctionReference,
    QueryArgs, QueryOptions, QueryRequest, QueryResultState, QuerySnapshot, RefetchFn, ViewState,
};
use leptos::*;
use serde_json::Value;

/// Subscribes to a remote query and derives Tanstack Query style status flags from it.
///
/// The backing system owns caching, refresh and retries. This hook:
/// - Watches the binding `(function, args())` and nothing else. A change in the
///   canonical binding key swaps the watch; a skipped or disabled query registers none.
/// - Decodes each snapshot into `R`. A mismatch is reported as [`Error::Decode`].
/// - Remembers the last successful value so that, with
///   [`keep_previous_data`](QueryOptions::keep_previous_data), it can be shown while
///   the next binding loads.
///
/// Errors never panic or propagate out of the hook; they show up in
/// [`error`](QueryResult::error) and [`status`](QueryResult::status).
///
/// Example
/// ```
/// use leptos::*;
/// use leptos_sync_query::*;
/// use serde::*;
///
/// #[derive(Debug, Clone, Serialize)]
/// struct PageArgs {
///     page: u32,
/// }
///
/// #[derive(Debug, Clone, PartialEq, Deserialize)]
/// struct Message {
///     body: String,
/// }
///
/// const LIST_MESSAGES: FunctionReference<PageArgs, Vec<Message>> =
///     FunctionReference::query("messages:list");
///
/// fn use_messages(page: Signal<Option<u32>>) -> QueryResult<Vec<Message>, impl RefetchFn> {
///     use_query(
///         LIST_MESSAGES,
///         move || page.get().map(|page| PageArgs { page }).into(),
///         QueryOptions::default().set_keep_previous_data(true),
///     )
/// }
/// ```
pub fn use_query<A, R>(
    function: FunctionReference<A, R>,
    args: impl Fn() -> QueryArgs<A> + 'static,
    options: QueryOptions,
) -> QueryResult<R, impl RefetchFn>
where
    A: crate::FunctionArgs,
    R: crate::QueryValue,
{
    if function.kind() != FunctionKind::Query {
        logging::debug_warn!(
            "use_query called with {:?} function {}. Only queries can be subscribed to.",
            function.kind(),
            function.path()
        );
    }

    let client = use_query_client();

    // Re-encoded on every change of `args`, but only propagates when the key changes.
    let binding: Memo<Option<Result<QueryRequest, Error>>> = create_memo(move |_| {
        if !options.enabled.get() {
            return None;
        }
        match args() {
            QueryArgs::Skip => None,
            QueryArgs::Some(args) => Some(QueryRequest::new(function.path(), &args)),
        }
    });

    // Latest raw snapshot, tagged with the binding that produced it.
    let raw_snapshot = RwSignal::new(None::<(BindingKey, QuerySnapshot<Value>)>);

    let observer = QueryObserver::new(client.registry.clone(), move |key, snapshot| {
        if raw_snapshot
            .try_set(Some((key.clone(), snapshot.clone())))
            .is_some()
        {
            logging::debug_warn!("Snapshot for {key} arrived after the query was disposed.");
        }
    });

    create_isomorphic_effect({
        let observer = observer.clone();
        move |_| {
            let request = binding.with(|binding| binding.as_ref().and_then(|b| b.clone().ok()));
            observer.update_request(request.as_ref());
        }
    });

    on_cleanup(move || observer.cleanup());

    let snapshot: Memo<QuerySnapshot<R>> = create_memo(move |_| {
        binding.with(|binding| match binding {
            None => QuerySnapshot::Absent,
            Some(Err(error)) => QuerySnapshot::Error(error.clone()),
            Some(Ok(request)) => raw_snapshot.with(|raw| match raw {
                // A snapshot from a previous binding says nothing about this one.
                Some((key, snapshot)) if key == request.key() => snapshot.decode(),
                _ => QuerySnapshot::Absent,
            }),
        })
    });

    let view_state = RwSignal::new(ViewState::<R>::default());

    // View state is only written here, after the snapshot is observed.
    create_isomorphic_effect(move |_| {
        let key = binding.with(|binding| match binding {
            Some(Ok(request)) => Some(request.key().clone()),
            _ => None,
        });
        let Some(key) = key else {
            return;
        };
        let needs_record =
            snapshot.with(|snapshot| view_state.with_untracked(|vs| vs.needs_record(&key, snapshot)));
        if needs_record {
            let snapshot = snapshot.get_untracked();
            view_state.update(|vs| {
                vs.record(&key, &snapshot);
            });
        }
    });

    let state = create_memo(move |_| {
        binding.with(|binding| {
            snapshot.with(|snapshot| match binding {
                None => QueryResultState::skipped(),
                Some(Err(error)) => QueryResultState::error(error.clone()),
                Some(Ok(request)) => view_state.with(|view_state| {
                    derive_query_state(Some(request.key()), snapshot, &options, view_state)
                }),
            })
        })
    });

    let path = function.path();
    let refetch = move || {
        logging::debug_warn!(
            "refetch() has no effect on {path}: it is kept up to date by its subscription."
        );
    };

    QueryResult::new(state, refetch)
}
