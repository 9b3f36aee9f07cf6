use crate::message::EmailMessage;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// FIFO backlog of accepted, not-yet-delivered messages.
///
/// Producers only enqueue; the single drain task is the only consumer.
#[derive(Default)]
pub struct DeliveryQueue {
    backlog: Mutex<VecDeque<EmailMessage>>,
    notify: Notify,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: EmailMessage) {
        if let Ok(mut backlog) = self.backlog.lock() {
            backlog.push_back(message);
        }
        self.notify.notify_one();
    }

    /// Pop the oldest message, waiting if the backlog is empty.
    pub async fn pop(&self) -> EmailMessage {
        loop {
            if let Ok(mut backlog) = self.backlog.lock() {
                if let Some(message) = backlog.pop_front() {
                    return message;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.backlog.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
