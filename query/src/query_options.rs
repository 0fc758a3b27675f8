use leptos::MaybeSignal;

/// Default options for all queries under this client.
/// Only differs from [`QueryOptions`] in that it can't disable queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultQueryOptions {
    /// Show the previous binding's data while a new binding loads.
    pub keep_previous_data: bool,
}

/**
 * Options for a query [`use_query()`](crate::use_query())
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// If false, the query is treated as skipped: no subscription is registered
    /// and the result reports the pending state.
    /// Accepts a signal, so a query can be paused and resumed without rebuilding it.
    /// Default is true.
    pub enabled: MaybeSignal<bool>,
    /// While the arguments change and the new result has not arrived yet, keep
    /// returning the last successful data, flagged with `is_placeholder_data`.
    /// Useful for pagination.
    /// Default is false, unless overridden by [`DefaultQueryOptions`].
    pub keep_previous_data: bool,
}

impl QueryOptions {
    /// Options that ignore any client-wide defaults.
    pub const fn new() -> Self {
        Self {
            enabled: MaybeSignal::Static(true),
            keep_previous_data: false,
        }
    }

    /// Set enabled. Takes a `bool` or any signal of one.
    pub fn set_enabled(self, enabled: impl Into<MaybeSignal<bool>>) -> Self {
        QueryOptions {
            enabled: enabled.into(),
            ..self
        }
    }

    /// Set keep_previous_data.
    pub fn set_keep_previous_data(self, keep_previous_data: bool) -> Self {
        QueryOptions {
            keep_previous_data,
            ..self
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        // Use client wide defaults if they exist.
        let default_options = leptos::use_context::<crate::QueryClient>()
            .map(|c| c.default_options)
            .unwrap_or_default();
        Self {
            keep_previous_data: default_options.keep_previous_data,
            ..Self::new()
        }
    }
}
