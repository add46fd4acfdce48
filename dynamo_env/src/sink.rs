//! Event sink abstraction: where engine events go once they leave the core.

use crate::error::EnvError;
use crate::types::WireMessage;

/// Consumer of wire messages produced from engine events.
///
/// # Implementations
///
/// - **Production**: `ChannelSink` - bounded channel towards a transport bridge
/// - **Simulation**: `RecordingSink` - keeps everything in memory
///
/// # Delivery
///
/// Delivery is best-effort. `Ok(())` means the message was accepted, not that
/// anything on the far side received it.
pub trait EventSink: Send {
    /// Hands a message to the sink.
    fn emit(&mut self, msg: WireMessage) -> Result<(), EnvError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, msg: WireMessage) -> Result<(), EnvError> {
        (**self).emit(msg)
    }
}

/// In-memory sink that records every message.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    messages: Vec<WireMessage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    pub fn messages(&self) -> &[WireMessage] {
        &self.messages
    }

    /// Removes and returns all recorded messages.
    pub fn drain(&mut self) -> Vec<WireMessage> {
        std::mem::take(&mut self.messages)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, msg: WireMessage) -> Result<(), EnvError> {
        self.messages.push(msg);
        Ok(())
    }
}

/// Forwards only every n-th message to the inner sink.
///
/// The first forwarded message is the n-th one seen. `every <= 1` forwards
/// everything.
#[derive(Debug)]
pub struct ThrottledSink<S> {
    inner: S,
    every: u64,
    seen: u64,
    forwarded: u64,
}

impl<S: EventSink> ThrottledSink<S> {
    /// Wraps `inner`, forwarding one message out of every `every`.
    pub fn new(inner: S, every: u64) -> Self {
        Self {
            inner,
            every: every.max(1),
            seen: 0,
            forwarded: 0,
        }
    }

    /// Messages offered to this sink.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Messages passed on to the inner sink.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSink> EventSink for ThrottledSink<S> {
    fn emit(&mut self, msg: WireMessage) -> Result<(), EnvError> {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return Ok(());
        }
        self.inner.emit(msg)?;
        self.forwarded += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WireArg, EVENT_ADDRESS};

    fn msg(i: i32) -> WireMessage {
        WireMessage::new(EVENT_ADDRESS, vec![WireArg::Int(i)])
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.emit(msg(1)).unwrap();
        sink.emit(msg(2)).unwrap();
        assert_eq!(sink.messages().len(), 2);

        let drained = sink.drain();
        assert_eq!(drained[1], msg(2));
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_throttle_forwards_every_tenth() {
        let mut sink = ThrottledSink::new(RecordingSink::new(), 10);
        for i in 1..=25 {
            sink.emit(msg(i)).unwrap();
        }

        assert_eq!(sink.seen(), 25);
        assert_eq!(sink.forwarded(), 2);
        assert_eq!(sink.inner().messages(), &[msg(10), msg(20)]);
    }

    #[test]
    fn test_throttle_of_one_forwards_all() {
        let mut sink = ThrottledSink::new(RecordingSink::new(), 0);
        for i in 0..3 {
            sink.emit(msg(i)).unwrap();
        }
        assert_eq!(sink.forwarded(), 3);
    }

    #[test]
    fn test_boxed_sink() {
        let mut sink: Box<dyn EventSink> = Box::new(RecordingSink::new());
        assert!(sink.emit(msg(0)).is_ok());
    }
}
