//! Application state management

use ocrsvc_dispatch::Dispatcher;

/// Shared application state. `Dispatcher` is already a cheap `Arc`-backed
/// clone, so no extra indirection is needed here.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}
