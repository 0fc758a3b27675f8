#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # About Sync Query
//!
//!
//! Leptos Sync Query adapts a reactive backend to [Leptos](https://github.com/leptos-rs/leptos) with a
//! [Tanstack Query](https://tanstack.com/query/latest/) style surface.
//!
//! The backend owns caching, live updates, retries and consistency. It exposes two things:
//! - a [`SubscriptionRegistry`], which pushes the latest snapshot of a `(function, args)` binding
//!   to its watchers.
//! - a [`FunctionInvoker`], which runs a remote function once and returns its result.
//!
//! This crate turns those into familiar reactive state:
//! - [`use_query`][crate::use_query::use_query()] - Watches a query and exposes `data`, `error`,
//!   `status`, and the `is_*` flags. Supports skipping, disabling, and keeping the previous data
//!   while a new binding loads.
//! - [`use_mutation`][crate::use_mutation::use_mutation()] - Invokes a mutation and tracks its
//!   lifecycle, with `on_success`/`on_error`/`on_settled` callbacks.
//!
//! # Feature Flags
//! - `csr` Client-side rendering: Subscribe to queries on the client.
//! - `ssr` Server-side rendering: Queries render their loading state and never subscribe.
//! - `hydrate` Hydration: Subscribe once the client hydrates.
//!
//! # A Simple Example
//!
//! In the root of your App, provide a query client with [provide_query_client].
//! [`LocalClient`] is an in-memory backend, useful for tests and prototyping.
//!
//! ```rust
//! use leptos_sync_query::*;
//! use leptos::*;
//!
//! #[component]
//! pub fn App() -> impl IntoView {
//!     // Provides Query Client for entire app.
//!     provide_query_client(QueryClient::from_backend(LocalClient::new()));
//!
//!     // Rest of App...
//! }
//! ```
//!
//! Then declare references to your backend functions.
//!
//! ```
//! use leptos_sync_query::*;
//!
//! #[derive(Debug, Clone, serde::Serialize)]
//! struct TrackArgs {
//!     id: i32,
//! }
//!
//! #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
//! struct TrackData {
//!    name: String,
//! }
//!
//! const GET_TRACK: FunctionReference<TrackArgs, TrackData> = FunctionReference::query("tracks:get");
//! ```
//!
//! Now you can use the query in any component in your app.
//!
//! ```rust
//! # use serde::*;
//! #
//! # #[derive(Debug, Clone, Serialize)]
//! # struct TrackArgs {
//! #     id: i32,
//! # }
//! #
//! # #[derive(Debug, Clone, PartialEq, Deserialize)]
//! # struct TrackData {
//! #    name: String,
//! # }
//! #
//! # const GET_TRACK: FunctionReference<TrackArgs, TrackData> = FunctionReference::query("tracks:get");
//! #
//! use leptos::*;
//! use leptos_sync_query::*;
//!
//! #[component]
//! fn TrackView(id: Signal<Option<i32>>) -> impl IntoView {
//!     let QueryResult {
//!         data,
//!         is_loading,
//!         error,
//!         ..
//!     } = use_query(
//!         GET_TRACK,
//!         move || id.get().map(|id| TrackArgs { id }).into(),
//!         QueryOptions::default(),
//!     );
//!
//!     view! {
//!        <div>
//!            <Show when=move || !is_loading.get() fallback=|| view! { <h2>"Loading..."</h2> }>
//!                {move || error.get().map(|error| view! { <p>{error.to_string()}</p> })}
//!                {move || data.get().map(|track| view! { <h2>{track.name}</h2> })}
//!            </Show>
//!        </div>
//!     }
//! }
//! ```
//!

mod backend;
mod binding;
mod error;
mod function_ref;
mod local_client;
mod mutation_options;
mod mutation_state;
mod query_client;
mod query_observer;
mod query_options;
mod query_result;
mod query_state;
mod use_mutation;
mod use_query;

pub use backend::*;
pub use binding::*;
pub use error::*;
pub use function_ref::*;
pub use local_client::*;
pub use mutation_options::*;
pub use mutation_state::*;
pub use query_client::*;
pub use query_observer::suppress_subscriptions;
pub use query_options::*;
pub use query_result::*;
pub use query_state::*;
pub use use_mutation::*;
pub use use_query::*;

/// Convenience trait for function argument requirements.
pub trait FunctionArgs: serde::Serialize + Clone + 'static {}
impl<A> FunctionArgs for A where A: serde::Serialize + Clone + 'static {}

/// Convenience trait for query and mutation value requirements.
pub trait QueryValue:
    std::fmt::Debug + Clone + PartialEq + serde::de::DeserializeOwned + 'static
{
}
impl<V> QueryValue for V where
    V: std::fmt::Debug + Clone + PartialEq + serde::de::DeserializeOwned + 'static
{
}
