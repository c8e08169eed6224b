//! One-way progress/info message sinks.
//!
//! A sink never blocks and never affects control flow; concurrent sends are
//! funneled through synchronized backends so interleaved progress reports
//! cannot corrupt each other.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A progress or informational message from a running filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Periodic progress over a known element count.
    Progress {
        /// Human name of the reporting filter.
        filter: String,
        /// Completed work units.
        current: usize,
        /// Total work units.
        total: usize,
    },
    /// Free-form status text.
    Info {
        /// Human name of the reporting filter.
        filter: String,
        /// The status text.
        text: String,
    },
}

/// One-way message sink; send never blocks.
pub trait MessageSink: Send + Sync {
    /// Deliver a message. Implementations must not block the caller.
    fn send(&self, message: Message);
}

/// Discards every message; the serial-test and benchmarking default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn send(&self, _message: Message) {}
}

/// Bridges messages onto the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn send(&self, message: Message) {
        match message {
            Message::Progress {
                filter,
                current,
                total,
            } => log::info!("[{filter}] {current}/{total}"),
            Message::Info { filter, text } => log::info!("[{filter}] {text}"),
        }
    }
}

/// Accumulates messages behind a mutex; used by tests and interactive
/// front-ends that poll.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<Message>>,
}

impl CollectingSink {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Drain everything received so far.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl MessageSink for CollectingSink {
    fn send(&self, message: Message) {
        self.messages.lock().push(message);
    }
}

/// Forwards messages over an unbounded channel to a consumer thread.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: crossbeam_channel::Sender<Message>,
}

impl ChannelSink {
    /// A sink plus the receiving end for the consumer.
    pub fn new() -> (Self, crossbeam_channel::Receiver<Message>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, message: Message) {
        // Unbounded, so this cannot block; a hung-up receiver just drops
        // the message.
        let _ = self.sender.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_accumulates_in_order() {
        let sink = CollectingSink::new();
        sink.send(Message::Info {
            filter: "F".into(),
            text: "start".into(),
        });
        sink.send(Message::Progress {
            filter: "F".into(),
            current: 1,
            total: 2,
        });
        let messages = sink.take();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], Message::Info { .. }));
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn channel_sink_delivers_across_threads() {
        let (sink, receiver) = ChannelSink::new();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for current in 0..8 {
                        sink.send(Message::Progress {
                            filter: format!("worker-{worker}"),
                            current,
                            total: 8,
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(sink);
        // Every message arrives whole; nothing interleaves mid-message.
        let received: Vec<_> = receiver.iter().collect();
        assert_eq!(received.len(), 32);
    }

    #[test]
    fn sends_after_receiver_drop_are_ignored() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.send(Message::Info {
            filter: "F".into(),
            text: "late".into(),
        });
    }
}
