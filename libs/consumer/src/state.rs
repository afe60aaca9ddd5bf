use std::sync::Arc;

use tokio::sync::watch;

use event_api::ConsumerState;

/// Observable consumer lifecycle. Transitions that [`ConsumerState`]
/// does not allow are ignored, so `Stopped` can be reached only once.
#[derive(Clone)]
pub struct ConsumerStateCell {
    tx: Arc<watch::Sender<ConsumerState>>,
}

impl Default for ConsumerStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerStateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConsumerState::Starting);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ConsumerState {
        *self.tx.borrow()
    }

    /// Move to `next`. Returns `false` and leaves the state untouched if the
    /// transition is not legal from the current state.
    pub fn advance(&self, next: ConsumerState) -> bool {
        let mut from = None;
        let changed = self.tx.send_if_modified(|current| {
            if !current.can_advance_to(next) {
                return false;
            }
            from = Some(*current);
            *current = next;
            true
        });
        if let Some(from) = from {
            tracing::info!(%from, to = %next, "consumer state");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.tx.subscribe()
    }

    pub async fn wait_for_stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is owned by `self`, so this can only fail after stop.
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_api::ConsumerState::*;

    #[test]
    fn walks_the_happy_path() {
        let cell = ConsumerStateCell::new();
        assert_eq!(cell.get(), Starting);
        assert!(cell.advance(Running));
        assert!(cell.advance(Draining));
        assert!(!cell.advance(Draining));
        assert!(cell.advance(Stopped));
        assert_eq!(cell.get(), Stopped);
    }

    #[test]
    fn stopped_cannot_be_left() {
        let cell = ConsumerStateCell::new();
        assert!(cell.advance(Stopped));
        assert!(!cell.advance(Running));
        assert!(!cell.advance(Draining));
        assert!(!cell.advance(Stopped));
        assert_eq!(cell.get(), Stopped);
    }

    #[tokio::test]
    async fn wait_for_stopped_returns_after_stop() {
        let cell = ConsumerStateCell::new();
        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.wait_for_stopped().await })
        };
        cell.advance(Running);
        cell.advance(Stopped);
        waiter.await.unwrap();
        assert!(cell.subscribe().borrow().is_terminal());
    }
}
