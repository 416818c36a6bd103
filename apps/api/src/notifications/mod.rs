// Realtime notification core.
// watcher → reconciler → read_state, composed per connected dashboard by `session`.

pub mod handlers;
pub mod read_state;
pub mod reconciler;
pub mod session;
pub mod watcher;
