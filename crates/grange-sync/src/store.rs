use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use grange_types::models::UnreadMarker;

use crate::unread;

/// Application-wide state shared by every open thread window: the unread
/// marker list and the set of open chat windows. Updated only through
/// dispatched actions, never mutated in place by callers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub unread: Vec<UnreadMarker>,
    pub open_windows: Vec<OpenWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenWindow {
    pub window_id: Uuid,
    pub group_id: u64,
    pub thread_id: u64,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Replace the unread list with a freshly fetched one.
    UnreadLoaded(Vec<UnreadMarker>),

    /// A marker was deleted server-side during read acknowledgement.
    MarkerCleared { marker_id: String },

    WindowOpened { window_id: Uuid, group_id: u64, thread_id: u64 },

    WindowClosed { window_id: Uuid },
}

/// State transition function. All updates flow through here; callers never
/// mutate [`AppState`] directly.
pub fn reduce(state: &mut AppState, action: &Action) {
    match action {
        Action::UnreadLoaded(markers) => {
            state.unread = markers.clone();
        }
        Action::MarkerCleared { marker_id } => {
            state.unread.retain(|m| &m.id != marker_id);
        }
        Action::WindowOpened { window_id, group_id, thread_id } => {
            state.open_windows.push(OpenWindow {
                window_id: *window_id,
                group_id: *group_id,
                thread_id: *thread_id,
            });
        }
        Action::WindowClosed { window_id } => {
            state.open_windows.retain(|w| &w.window_id != window_id);
        }
    }
}

/// Shared handle over the application state. Dispatch applies the reducer
/// under the write lock and then fans the action out to watchers.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: RwLock<AppState>,
    events_tx: broadcast::Sender<Action>,
}

impl Store {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(StoreInner { state: RwLock::new(AppState::default()), events_tx }),
        }
    }

    pub async fn dispatch(&self, action: Action) {
        {
            let mut state = self.inner.state.write().await;
            reduce(&mut state, &action);
        }
        let _ = self.inner.events_tx.send(action);
    }

    /// Watch applied actions, e.g. to re-render unread badges.
    pub fn watch(&self) -> broadcast::Receiver<Action> {
        self.inner.events_tx.subscribe()
    }

    pub async fn snapshot(&self) -> AppState {
        self.inner.state.read().await.clone()
    }

    pub async fn thread_unread(&self, group_id: u64, thread_id: u64) -> usize {
        let state = self.inner.state.read().await;
        unread::thread_unread_count(&state.unread, group_id, thread_id)
    }

    pub async fn group_unread(&self, group_id: u64) -> usize {
        let state = self.inner.state.read().await;
        unread::group_unread_count(&state.unread, group_id)
    }

    pub async fn markers_for_thread(&self, group_id: u64, thread_id: u64) -> Vec<UnreadMarker> {
        let state = self.inner.state.read().await;
        unread::markers_for_thread(&state.unread, group_id, thread_id)
    }

    pub async fn is_window_open(&self, window_id: Uuid) -> bool {
        let state = self.inner.state.read().await;
        state.open_windows.iter().any(|w| w.window_id == window_id)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str, path: &str) -> UnreadMarker {
        UnreadMarker { id: id.to_string(), path: path.to_string() }
    }

    #[test]
    fn clearing_markers_leaves_other_threads_untouched() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            &Action::UnreadLoaded(vec![
                marker("a", "chat-5-9-1"),
                marker("b", "chat-5-9-2"),
                marker("c", "chat-7-1-1"),
            ]),
        );

        reduce(&mut state, &Action::MarkerCleared { marker_id: "a".to_string() });
        reduce(&mut state, &Action::MarkerCleared { marker_id: "b".to_string() });

        let paths: Vec<&str> = state.unread.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["chat-7-1-1"]);
    }

    #[test]
    fn reloading_unread_replaces_the_whole_list() {
        let mut state = AppState::default();
        reduce(&mut state, &Action::UnreadLoaded(vec![marker("a", "chat-5-9-1")]));
        reduce(
            &mut state,
            &Action::UnreadLoaded(vec![marker("b", "chat-5-9-2"), marker("c", "chat-7-1-1")]),
        );
        assert_eq!(state.unread.len(), 2);
        assert_eq!(state.unread[0].id, "b");
    }

    #[test]
    fn window_close_removes_only_that_window() {
        let mut state = AppState::default();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        reduce(&mut state, &Action::WindowOpened { window_id: first, group_id: 5, thread_id: 9 });
        reduce(&mut state, &Action::WindowOpened { window_id: second, group_id: 5, thread_id: 9 });

        reduce(&mut state, &Action::WindowClosed { window_id: first });
        assert_eq!(state.open_windows.len(), 1);
        assert_eq!(state.open_windows[0].window_id, second);
    }

    #[tokio::test]
    async fn dispatch_updates_counts_and_notifies_watchers() {
        let store = Store::new();
        let mut watcher = store.watch();

        store
            .dispatch(Action::UnreadLoaded(vec![
                marker("a", "chat-5-9-1"),
                marker("b", "chat-5-12-1"),
            ]))
            .await;

        assert_eq!(store.thread_unread(5, 9).await, 1);
        assert_eq!(store.group_unread(5).await, 2);
        assert!(matches!(watcher.recv().await.unwrap(), Action::UnreadLoaded(_)));
    }
}
