use crate::{Error, QueryResultState, QueryStatus};
use leptos::*;

/// Reactive query result.
///
/// Every field is derived from [`state`](Self::state); reading a single field only
/// tracks that field's changes.
#[derive(Clone)]
pub struct QueryResult<V, R>
where
    V: 'static,
    R: RefetchFn,
{
    /// The full result record.
    pub state: Signal<QueryResultState<V>>,
    /// Current data. Placeholder data from a previous binding if `is_placeholder_data`.
    pub data: Signal<Option<V>>,
    /// The error raised by the query, if any.
    pub error: Signal<Option<Error>>,
    /// Overall status.
    pub status: Signal<QueryStatus>,
    /// First load of an active binding.
    pub is_loading: Signal<bool>,
    /// Waiting for the current binding's first result.
    pub is_fetching: Signal<bool>,
    /// No data and no error yet. Also true for skipped or disabled queries.
    pub is_pending: Signal<bool>,
    /// Data is available.
    pub is_success: Signal<bool>,
    /// The query raised an error.
    pub is_error: Signal<bool>,
    /// `data` belongs to a previous binding.
    pub is_placeholder_data: Signal<bool>,

    /// Refetch the query.
    /// Subscriptions are kept up to date by the backing system, so this only logs a notice.
    pub refetch: R,
}

impl<V, R> QueryResult<V, R>
where
    V: Clone + PartialEq + 'static,
    R: RefetchFn,
{
    pub(crate) fn new(state: Memo<QueryResultState<V>>, refetch: R) -> Self {
        QueryResult {
            state: state.into(),
            data: create_memo(move |_| state.with(|s| s.data.clone())).into(),
            error: create_memo(move |_| state.with(|s| s.error.clone())).into(),
            status: create_memo(move |_| state.with(|s| s.status)).into(),
            is_loading: create_memo(move |_| state.with(|s| s.is_loading)).into(),
            is_fetching: create_memo(move |_| state.with(|s| s.is_fetching)).into(),
            is_pending: create_memo(move |_| state.with(|s| s.is_pending)).into(),
            is_success: create_memo(move |_| state.with(|s| s.is_success)).into(),
            is_error: create_memo(move |_| state.with(|s| s.is_error)).into(),
            is_placeholder_data: create_memo(move |_| state.with(|s| s.is_placeholder_data))
                .into(),
            refetch,
        }
    }

    /// The current result as `Ok(data)`, or `Err` if the query raised an error.
    /// Tracks the state like any other read.
    pub fn get_result(&self) -> Result<Option<V>, Error> {
        self.state.get().into_result()
    }
}

/// Convenience Trait alias for a Query Result's refetch function.
pub trait RefetchFn: Fn() + Clone {}
impl<R: Fn() + Clone> RefetchFn for R {}
