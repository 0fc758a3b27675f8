use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::logging;
use serde_json::Value;

use crate::{BindingKey, QueryRequest, QuerySnapshot, SubscriptionRegistry, WatchId};

thread_local! {
    static SUPPRESS_SUBSCRIPTIONS: Cell<bool> = const { Cell::new(false) };
}

/// Disable or enable new query subscriptions.
///
/// Useful for disabling subscriptions during App introspection, such as SSR Router integrations for Actix/Axum.
///
/// Example for `generate_route_list`
/// ```
/// fn make_routes() {
///     // Disable subscriptions.
///     leptos_sync_query::suppress_subscriptions(true);
///     // Introspect App Routes here.
///     // Enable subscriptions.
///     leptos_sync_query::suppress_subscriptions(false);
/// }
/// ```
pub fn suppress_subscriptions(suppress: bool) {
    SUPPRESS_SUBSCRIPTIONS.with(|s| s.set(suppress));
}

fn subscriptions_enabled() -> bool {
    cfg_if::cfg_if! {
        // Server-only builds render the loading state; the client subscribes after hydration.
        if #[cfg(all(feature = "ssr", not(any(feature = "hydrate", feature = "csr"))))] {
            false
        } else {
            !SUPPRESS_SUBSCRIPTIONS.with(|s| s.get())
        }
    }
}

type SnapshotSink = Rc<dyn Fn(&BindingKey, &QuerySnapshot<Value>)>;

/// Keeps exactly one watch alive for the binding a call site currently uses.
///
/// Every snapshot is forwarded to the sink together with the key of the binding
/// that produced it.
#[derive(Clone)]
pub(crate) struct QueryObserver {
    registry: Rc<dyn SubscriptionRegistry>,
    current: Rc<RefCell<Option<(BindingKey, WatchId)>>>,
    sink: SnapshotSink,
}

impl std::fmt::Debug for QueryObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryObserver")
            .field("current", &self.current)
            .field("registry", &"...")
            .field("sink", &"...")
            .finish()
    }
}

impl QueryObserver {
    pub fn new(
        registry: Rc<dyn SubscriptionRegistry>,
        sink: impl Fn(&BindingKey, &QuerySnapshot<Value>) + 'static,
    ) -> Self {
        Self {
            registry,
            current: Rc::new(RefCell::new(None)),
            sink: Rc::new(sink),
        }
    }

    /// Switches the watch to `request`. `None` releases the watch without a new one.
    pub fn update_request(&self, request: Option<&QueryRequest>) {
        let unchanged = self
            .current
            .try_borrow()
            .expect("update_request borrow")
            .as_ref()
            .map(|(key, _)| key)
            == request.map(|r| r.key());
        if unchanged {
            return;
        }

        self.release();

        let Some(request) = request else {
            return;
        };

        if !subscriptions_enabled() {
            return;
        }

        let key = request.key().clone();
        let id = {
            let sink = self.sink.clone();
            let key = key.clone();
            self.registry
                .watch(request, Box::new(move |snapshot| sink(&key, snapshot)))
        };
        *self
            .current
            .try_borrow_mut()
            .expect("update_request borrow_mut") = Some((key.clone(), id));

        // Borrow released: the sink may trigger reactive updates.
        (self.sink)(&key, &self.registry.current(request));
    }

    /// Releases the current watch, if any.
    pub fn cleanup(&self) {
        self.release();
    }

    fn release(&self) {
        let previous = self
            .current
            .try_borrow_mut()
            .expect("release borrow_mut")
            .take();
        if let Some((key, id)) = previous {
            if !self.registry.unwatch(id) {
                logging::error!("Failed to unwatch {key}: unknown watch id.");
            }
        }
    }

    #[cfg(test)]
    pub fn watched_key(&self) -> Option<BindingKey> {
        self.current
            .try_borrow()
            .expect("watched_key borrow")
            .as_ref()
            .map(|(key, _)| key.clone())
    }
}
