//! Long-poll waiter registry.
//!
//! A reader asking for the fact one past a log's end parks here until the
//! writer records it. Registration and delivery both happen under the
//! log's cell lock, so a waiter registered after a fact was delivered can
//! only ever observe later facts.

use tokio::sync::oneshot;

use super::fact::Fact;

/// Parked long-poll readers of one log.
pub struct Waiters {
    parked: Vec<oneshot::Sender<Fact>>,
}

impl Waiters {
    pub fn new() -> Self {
        Self { parked: Vec::new() }
    }

    /// Park a reader. The receiver resolves with the next recorded fact.
    ///
    /// Readers that gave up (dropped receivers) are swept out here, so an
    /// idle log does not accumulate dead slots.
    pub fn register(&mut self) -> oneshot::Receiver<Fact> {
        self.parked.retain(|slot| !slot.is_closed());
        let (tx, rx) = oneshot::channel();
        self.parked.push(tx);
        rx
    }

    /// Deliver `fact` to every parked reader, emptying the registry.
    /// Returns how many readers actually received it.
    pub fn notify(&mut self, fact: &Fact) -> usize {
        let parked = std::mem::take(&mut self.parked);
        let mut delivered = 0;
        for slot in parked {
            if slot.send(fact.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }
}

impl Default for Waiters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    #[tokio::test]
    async fn notify_delivers_to_every_waiter() {
        let mut waiters = Waiters::new();
        let a = waiters.register();
        let b = waiters.register();

        let delivered = waiters.notify(&Fact::new("cool"));
        assert_eq!(delivered, 2);
        assert_eq!(a.await.unwrap().as_str(), "cool");
        assert_eq!(b.await.unwrap().as_str(), "cool");
    }

    #[tokio::test]
    async fn notify_empties_the_registry() {
        let mut waiters = Waiters::new();
        let _rx = waiters.register();

        waiters.notify(&Fact::new("cool"));
        assert!(waiters.is_empty());
        assert_eq!(waiters.notify(&Fact::new("again")), 0);
    }

    #[tokio::test]
    async fn waiter_registered_after_delivery_sees_nothing() {
        let mut waiters = Waiters::new();
        waiters.notify(&Fact::new("earlier"));

        let mut late = waiters.register();
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn gone_readers_are_swept_on_register() {
        let mut waiters = Waiters::new();
        let gone = waiters.register();
        drop(gone);

        let _live = waiters.register();
        assert_eq!(waiters.len(), 1);
    }

    #[tokio::test]
    async fn gone_readers_do_not_count_as_delivered() {
        let mut waiters = Waiters::new();
        let gone = waiters.register();
        let live = waiters.register();
        drop(gone);

        assert_eq!(waiters.notify(&Fact::new("cool")), 1);
        assert_eq!(live.await.unwrap().as_str(), "cool");
    }
}
