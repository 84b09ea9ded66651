//! Injectable diagnostics for the codec.
//!
//! The assembler, decoder and encoder emit `tracing` events (noise dropped,
//! frame rejected, unknown type passed through). Each of them carries a
//! [`Diagnostics`] handle chosen at construction, and only emits into that
//! handle's dispatcher. The default handle discards everything, so the core
//! stays silent unless the caller hands one in.

use tracing::dispatcher::{self, Dispatch};

/// A `tracing` dispatcher the codec emits into.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    dispatch: Dispatch,
}

impl Diagnostics {
    /// A handle that drops every event.
    pub fn none() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Emit into an explicit dispatcher.
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Emit into whatever subscriber is the default on this thread right now
    /// (usually the global one installed by the application).
    pub fn current() -> Self {
        dispatcher::get_default(|dispatch| Self {
            dispatch: dispatch.clone(),
        })
    }

    /// Run `f` with this handle's dispatcher as the thread default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Dispatch> for Diagnostics {
    fn from(dispatch: Dispatch) -> Self {
        Self::new(dispatch)
    }
}
