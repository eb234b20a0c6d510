//! # Bus publishing seam
//!
//! The flight-control core never talks to a transport directly, it publishes through a
//! [`Publisher`]. Executables plug in whatever the lab bus provides; an in-process channel and a
//! recording publisher are provided here.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which messages of type `T` can be published to.
pub trait Publisher<T> {
    /// Publish a single message. Delivery is best effort.
    fn publish(&mut self, msg: &T) -> Result<(), BusError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Publisher which keeps the messages it is given, in order.
///
/// Clones share the same record, so one clone can be handed to a loop and the other kept to
/// inspect what was published. A bounded recorder only keeps the most recent messages.
#[derive(Debug)]
pub struct Recorder<T> {
    msgs: Arc<Mutex<VecDeque<T>>>,
    capacity: Option<usize>,
}

/// Publisher which discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum BusError {
    #[error("The receiving end of the topic has been closed")]
    Disconnected,

    #[error("The topic record is poisoned")]
    Poisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: Clone> Publisher<T> for Sender<T> {
    fn publish(&mut self, msg: &T) -> Result<(), BusError> {
        self.send(msg.clone()).map_err(|_| BusError::Disconnected)
    }
}

impl<T> Publisher<T> for NullPublisher {
    fn publish(&mut self, _msg: &T) -> Result<(), BusError> {
        Ok(())
    }
}

impl<T> Recorder<T> {
    /// A recorder which keeps every message.
    pub fn new() -> Self {
        Self {
            msgs: Arc::new(Mutex::new(VecDeque::new())),
            capacity: None,
        }
    }

    /// A recorder which keeps at most the last `capacity` messages.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            msgs: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: Some(capacity),
        }
    }

    /// Number of messages currently held.
    pub fn len(&self) -> usize {
        self.msgs.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Recorder<T> {
    /// Copy of the messages held, oldest first.
    pub fn msgs(&self) -> Vec<T> {
        self.msgs
            .lock()
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recently published message.
    pub fn last(&self) -> Option<T> {
        self.msgs.lock().ok().and_then(|m| m.back().cloned())
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            msgs: self.msgs.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Publisher<T> for Recorder<T> {
    fn publish(&mut self, msg: &T) -> Result<(), BusError> {
        let mut msgs = self.msgs.lock().map_err(|_| BusError::Poisoned)?;

        if let Some(cap) = self.capacity {
            if cap == 0 {
                return Ok(());
            }
            while msgs.len() >= cap {
                msgs.pop_front();
            }
        }
        msgs.push_back(msg.clone());

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_recorder_clones_share_record() {
        let rec = Recorder::new();
        let mut publisher = rec.clone();
        publisher.publish(&1u16).unwrap();
        publisher.publish(&2u16).unwrap();
        assert_eq!(rec.msgs(), vec![1, 2]);
        assert_eq!(rec.last(), Some(2));
    }

    #[test]
    fn test_bounded_recorder_keeps_latest() {
        let rec = Recorder::bounded(2);
        let mut publisher = rec.clone();
        for i in 1..=5u16 {
            publisher.publish(&i).unwrap();
        }
        assert_eq!(rec.msgs(), vec![4, 5]);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.last(), Some(5));
    }

    #[test]
    fn test_sender_reports_disconnect() {
        let (mut tx, rx) = channel::<u8>();
        tx.publish(&3).unwrap();
        assert_eq!(rx.recv().unwrap(), 3);
        drop(rx);
        assert!(matches!(tx.publish(&4), Err(BusError::Disconnected)));
    }
}
