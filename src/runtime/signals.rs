use crate::domain::process::ProcessId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// What happened to a signal sent to a process.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SignalDelivery {
    /// Queued in the process inbox; it is consumed when the process next listens.
    Accepted,
    /// The process is no longer listening on that channel, so the signal has no effect.
    Ignored,
}

struct Mailbox {
    sender: mpsc::UnboundedSender<()>,
    receiver: Option<mpsc::UnboundedReceiver<()>>,
}

impl Mailbox {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

/// Named per-process inboxes.
///
/// Signals sent before a process opens the channel are buffered. Once the
/// process drops its [`SignalInbox`], later signals are ignored.
#[derive(Default, Clone)]
pub struct SignalRouter {
    mailboxes: Arc<Mutex<HashMap<(ProcessId, String), Mailbox>>>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliver(&self, process: &ProcessId, channel: &str) -> SignalDelivery {
        let mut mailboxes = self.mailboxes.lock().await;
        let mailbox = mailboxes
            .entry((process.clone(), channel.to_string()))
            .or_insert_with(Mailbox::new);
        match mailbox.sender.send(()) {
            Ok(()) => SignalDelivery::Accepted,
            Err(_) => SignalDelivery::Ignored,
        }
    }

    /// Opens the inbox of `channel` for `process`.
    ///
    /// A channel can be opened once per process run; opening it again after
    /// the inbox was dropped yields an inbox that never receives.
    pub async fn open(&self, process: &ProcessId, channel: &str) -> SignalInbox {
        let mut mailboxes = self.mailboxes.lock().await;
        let mailbox = mailboxes
            .entry((process.clone(), channel.to_string()))
            .or_insert_with(Mailbox::new);
        SignalInbox {
            receiver: mailbox.receiver.take(),
        }
    }

    /// Forgets every channel of a finished process.
    pub async fn close(&self, process: &ProcessId) {
        let mut mailboxes = self.mailboxes.lock().await;
        mailboxes.retain(|(id, _), _| id != process);
    }
}

pub struct SignalInbox {
    receiver: Option<mpsc::UnboundedReceiver<()>>,
}

impl SignalInbox {
    /// Suspends until a signal arrives. Never returns if the channel can no
    /// longer receive.
    pub async fn receive(&mut self) {
        if let Some(receiver) = self.receiver.as_mut()
            && receiver.recv().await.is_some()
        {
            return;
        }
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_sent_before_open_is_buffered() {
        let router = SignalRouter::new();
        let id = ProcessId::new("book-1_payment");

        assert_eq!(router.deliver(&id, "check-in").await, SignalDelivery::Accepted);

        let mut inbox = router.open(&id, "check-in").await;
        tokio::time::timeout(Duration::from_secs(1), inbox.receive())
            .await
            .expect("buffered signal should be received");
    }

    #[tokio::test]
    async fn test_signal_after_inbox_dropped_is_ignored() {
        let router = SignalRouter::new();
        let id = ProcessId::new("book-2_payment");

        let inbox = router.open(&id, "check-in").await;
        drop(inbox);

        assert_eq!(router.deliver(&id, "check-in").await, SignalDelivery::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_are_isolated() {
        let router = SignalRouter::new();
        let a = ProcessId::new("a");
        let b = ProcessId::new("b");

        router.deliver(&a, "check-in").await;

        let mut inbox = router.open(&b, "check-in").await;
        let received = tokio::time::timeout(Duration::from_secs(1), inbox.receive()).await;
        assert!(received.is_err());
    }
}
