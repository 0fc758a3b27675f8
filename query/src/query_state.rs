use leptos::SignalGetUntracked;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{BindingKey, Error, QueryOptions};

/// The latest result the backing system holds for a binding.
#[derive(Clone, PartialEq)]
pub enum QuerySnapshot<V> {
    /// No result has arrived yet.
    Absent,
    /// The query returned a value.
    Value(V),
    /// The query raised an error.
    Error(Error),
}

impl<V> Default for QuerySnapshot<V> {
    fn default() -> Self {
        QuerySnapshot::Absent
    }
}

impl<V> QuerySnapshot<V> {
    /// Returns the value, if present.
    pub fn value(&self) -> Option<&V> {
        match self {
            QuerySnapshot::Value(value) => Some(value),
            QuerySnapshot::Absent | QuerySnapshot::Error(_) => None,
        }
    }

    /// Returns the error, if present.
    pub fn error(&self) -> Option<&Error> {
        match self {
            QuerySnapshot::Error(error) => Some(error),
            QuerySnapshot::Absent | QuerySnapshot::Value(_) => None,
        }
    }

    /// Whether no result has arrived yet.
    pub fn is_absent(&self) -> bool {
        matches!(self, QuerySnapshot::Absent)
    }
}

impl QuerySnapshot<Value> {
    /// Decodes a raw snapshot into the query's result type.
    /// A value that does not match `V` becomes [`Error::Decode`].
    pub fn decode<V: DeserializeOwned>(&self) -> QuerySnapshot<V> {
        match self {
            QuerySnapshot::Absent => QuerySnapshot::Absent,
            QuerySnapshot::Error(error) => QuerySnapshot::Error(error.clone()),
            QuerySnapshot::Value(value) => match serde_json::from_value(value.clone()) {
                Ok(value) => QuerySnapshot::Value(value),
                Err(error) => QuerySnapshot::Error(Error::decode(error)),
            },
        }
    }
}

impl<V> std::fmt::Debug for QuerySnapshot<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
        }
    }
}

/// Status of a query binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// No data yet. Also reported for skipped and disabled queries.
    Loading,
    /// The latest snapshot is an error.
    Error,
    /// Data is available, possibly placeholder data.
    Success,
}

impl QueryStatus {
    /// Lowercase name, matching Tanstack Query's status strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Loading => "loading",
            QueryStatus::Error => "error",
            QueryStatus::Success => "success",
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per call site memory of the last successful result.
///
/// Only used to show previous data while a new binding is loading.
#[derive(Clone, PartialEq)]
pub struct ViewState<V> {
    previous: Option<(BindingKey, V)>,
}

impl<V> Default for ViewState<V> {
    fn default() -> Self {
        Self { previous: None }
    }
}

impl<V> ViewState<V> {
    /// The binding that produced the remembered value.
    pub fn key(&self) -> Option<&BindingKey> {
        self.previous.as_ref().map(|(key, _)| key)
    }

    /// The remembered value.
    pub fn value(&self) -> Option<&V> {
        self.previous.as_ref().map(|(_, value)| value)
    }
}

impl<V: PartialEq + Clone> ViewState<V> {
    /// Whether recording this snapshot would change anything.
    pub fn needs_record(&self, key: &BindingKey, snapshot: &QuerySnapshot<V>) -> bool {
        match snapshot {
            QuerySnapshot::Value(value) => !matches!(
                &self.previous,
                Some((previous_key, previous)) if previous_key == key && previous == value
            ),
            QuerySnapshot::Absent | QuerySnapshot::Error(_) => false,
        }
    }

    /// Remembers a successful snapshot. Absent and error snapshots are ignored.
    ///
    /// Returns true if the state changed.
    pub fn record(&mut self, key: &BindingKey, snapshot: &QuerySnapshot<V>) -> bool {
        if !self.needs_record(key, snapshot) {
            return false;
        }
        if let QuerySnapshot::Value(value) = snapshot {
            self.previous = Some((key.clone(), value.clone()));
        }
        true
    }
}

impl<V> std::fmt::Debug for ViewState<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("previous", &self.previous)
            .finish()
    }
}

/// Everything a view needs to render a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultState<V> {
    /// Current data, or placeholder data from a previous binding.
    pub data: Option<V>,
    /// The error, if the latest snapshot is one.
    pub error: Option<Error>,
    /// Overall status.
    pub status: QueryStatus,
    /// First load of an active binding.
    pub is_loading: bool,
    /// Waiting for the current binding's first result.
    pub is_fetching: bool,
    /// No data and no error. True for skipped queries.
    pub is_pending: bool,
    /// `status == Success`.
    pub is_success: bool,
    /// `status == Error`.
    pub is_error: bool,
    /// `data` belongs to a previous binding.
    pub is_placeholder_data: bool,
}

impl<V> QueryResultState<V> {
    fn blank(status: QueryStatus) -> Self {
        Self {
            data: None,
            error: None,
            status,
            is_loading: false,
            is_fetching: false,
            is_pending: false,
            is_success: false,
            is_error: false,
            is_placeholder_data: false,
        }
    }

    /// Skipped or disabled.
    pub fn skipped() -> Self {
        Self {
            is_pending: true,
            ..Self::blank(QueryStatus::Loading)
        }
    }

    /// Active binding, no result yet.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            is_fetching: true,
            is_pending: true,
            ..Self::blank(QueryStatus::Loading)
        }
    }

    /// The latest snapshot is an error.
    pub fn error(error: Error) -> Self {
        Self {
            error: Some(error),
            is_error: true,
            ..Self::blank(QueryStatus::Error)
        }
    }

    /// The latest snapshot holds a value.
    pub fn success(data: V) -> Self {
        Self {
            data: Some(data),
            is_success: true,
            ..Self::blank(QueryStatus::Success)
        }
    }

    /// A previous binding's value, shown while the current one loads.
    pub fn placeholder(data: V) -> Self {
        Self {
            data: Some(data),
            is_success: true,
            is_fetching: true,
            is_placeholder_data: true,
            ..Self::blank(QueryStatus::Success)
        }
    }

    /// Turns the error status into an `Err`, for callers that prefer `?` over
    /// checking `is_error`.
    pub fn into_result(self) -> Result<Option<V>, Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

/// Derives the result record for one evaluation.
///
/// `binding` is `None` when the arguments are [`QueryArgs::Skip`](crate::QueryArgs::Skip).
/// Pure: recording a successful value into the view state is left to the caller.
pub fn derive_query_state<V: Clone>(
    binding: Option<&BindingKey>,
    snapshot: &QuerySnapshot<V>,
    options: &QueryOptions,
    view_state: &ViewState<V>,
) -> QueryResultState<V> {
    let key = match binding {
        Some(key) if options.enabled.get_untracked() => key,
        _ => return QueryResultState::skipped(),
    };

    match snapshot {
        QuerySnapshot::Error(error) => QueryResultState::error(error.clone()),
        QuerySnapshot::Value(value) => QueryResultState::success(value.clone()),
        QuerySnapshot::Absent => match &view_state.previous {
            Some((previous_key, previous))
                if options.keep_previous_data && previous_key != key =>
            {
                QueryResultState::placeholder(previous.clone())
            }
            _ => QueryResultState::loading(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerError;
    use serde_json::json;

    fn key(page: u32) -> BindingKey {
        BindingKey::new("items:page", &json!({ "page": page }))
    }

    fn keep_previous() -> QueryOptions {
        QueryOptions::new().set_keep_previous_data(true)
    }

    fn remembered(page: u32, value: &str) -> ViewState<String> {
        let mut view_state = ViewState::default();
        view_state.record(&key(page), &QuerySnapshot::Value(value.to_string()));
        view_state
    }

    #[test]
    fn skipped_reports_pending_only() {
        let snapshot = QuerySnapshot::Value("ignored".to_string());
        let state = derive_query_state(None, &snapshot, &QueryOptions::new(), &remembered(1, "a"));
        assert_eq!(state, QueryResultState::skipped());
        assert_eq!(state.status, QueryStatus::Loading);
        assert!(state.is_pending);
        assert!(!state.is_loading && !state.is_fetching && !state.is_success);
        assert_eq!(state.data, None);
    }

    #[test]
    fn disabled_reports_pending_only() {
        let options = keep_previous().set_enabled(false);
        let state = derive_query_state(
            Some(&key(2)),
            &QuerySnapshot::Error(Error::Unknown),
            &options,
            &remembered(1, "a"),
        );
        assert_eq!(state, QueryResultState::skipped());
    }

    #[test]
    fn error_wins_over_previous_data() {
        let error = Error::Server(ServerError::new("nope"));
        let state = derive_query_state(
            Some(&key(2)),
            &QuerySnapshot::Error(error.clone()),
            &keep_previous(),
            &remembered(1, "a"),
        );
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.error, Some(error));
        assert_eq!(state.data, None);
        assert!(state.is_error);
        assert!(!state.is_loading && !state.is_fetching && !state.is_pending);
        assert!(!state.is_success && !state.is_placeholder_data);
    }

    #[test]
    fn absent_without_keep_previous_data_is_loading() {
        let state = derive_query_state(
            Some(&key(2)),
            &QuerySnapshot::<String>::Absent,
            &QueryOptions::new(),
            &remembered(1, "a"),
        );
        assert_eq!(state, QueryResultState::loading());
        assert!(state.is_loading && state.is_fetching && state.is_pending);
        assert_eq!(state.data, None);
    }

    #[test]
    fn absent_with_changed_key_shows_placeholder() {
        let state = derive_query_state(
            Some(&key(2)),
            &QuerySnapshot::Absent,
            &keep_previous(),
            &remembered(1, "a"),
        );
        assert_eq!(state.data.as_deref(), Some("a"));
        assert_eq!(state.status, QueryStatus::Success);
        assert!(state.is_success && state.is_fetching && state.is_placeholder_data);
        assert!(!state.is_loading && !state.is_pending && !state.is_error);
    }

    #[test]
    fn absent_with_same_key_is_loading() {
        let state = derive_query_state(
            Some(&key(1)),
            &QuerySnapshot::Absent,
            &keep_previous(),
            &remembered(1, "a"),
        );
        assert_eq!(state, QueryResultState::loading());
    }

    #[test]
    fn absent_without_previous_value_is_loading() {
        let state = derive_query_state(
            Some(&key(1)),
            &QuerySnapshot::<String>::Absent,
            &keep_previous(),
            &ViewState::default(),
        );
        assert_eq!(state, QueryResultState::loading());
    }

    #[test]
    fn value_is_success() {
        let state = derive_query_state(
            Some(&key(2)),
            &QuerySnapshot::Value("b".to_string()),
            &keep_previous(),
            &remembered(1, "a"),
        );
        assert_eq!(state, QueryResultState::success("b".to_string()));
        assert!(!state.is_fetching && !state.is_placeholder_data);
    }

    #[test]
    fn derivation_is_idempotent() {
        let snapshot = QuerySnapshot::Value("b".to_string());
        let mut view_state = remembered(1, "a");

        let first = derive_query_state(Some(&key(2)), &snapshot, &keep_previous(), &view_state);
        assert!(view_state.record(&key(2), &snapshot));
        let second = derive_query_state(Some(&key(2)), &snapshot, &keep_previous(), &view_state);
        assert!(!view_state.record(&key(2), &snapshot));
        let third = derive_query_state(Some(&key(2)), &snapshot, &keep_previous(), &view_state);

        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn view_state_ignores_errors_and_absence() {
        let mut view_state = remembered(1, "a");
        assert!(!view_state.record(&key(2), &QuerySnapshot::Absent));
        assert!(!view_state.record(&key(2), &QuerySnapshot::Error(Error::Unknown)));
        assert_eq!(view_state.key(), Some(&key(1)));
        assert_eq!(view_state.value().map(String::as_str), Some("a"));
    }

    #[test]
    fn decode_mismatch_is_an_error() {
        let raw = QuerySnapshot::Value(json!({"not": "a number"}));
        assert!(matches!(raw.decode::<u32>(), QuerySnapshot::Error(Error::Decode(_))));

        let raw = QuerySnapshot::Value(json!([1, 2]));
        assert_eq!(raw.decode::<Vec<u32>>(), QuerySnapshot::Value(vec![1, 2]));
    }

    #[test]
    fn into_result() {
        let ok = QueryResultState::success(1).into_result();
        assert_eq!(ok, Ok(Some(1)));
        let loading = QueryResultState::<u32>::loading().into_result();
        assert_eq!(loading, Ok(None));
        let err = QueryResultState::<u32>::error(Error::Unknown).into_result();
        assert_eq!(err, Err(Error::Unknown));
    }
}
