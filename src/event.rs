//! Decoder events and the queue that carries them
//!
//! The protocol decoder usually runs from an interrupt. It posts events into an
//! [`EventQueue`] and the main loop drains them with
//! [`Decoder::process_pending`](crate::Decoder::process_pending). The queue is
//! a bounded `heapless::Deque` guarded by `critical-section`.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::function::FunctionGroup;

/// State changes posted by the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A function group packet addressed to this decoder
    FunctionGroupChanged { group: FunctionGroup, bits: u8 },
    /// Operations mode CV write
    CvWrite { number: u16, value: u8 },
    /// Reset CVs to their factory defaults
    FactoryReset,
    /// Programming track entered or left
    ServiceMode(bool),
}

/// Error returned when trying to post to a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrySendError(pub DecoderEvent);

/// Bounded, interrupt safe event queue
///
/// SIZE is the number of events that can be pending
pub struct EventQueue<const SIZE: usize> {
    inner: Mutex<RefCell<Deque<DecoderEvent, SIZE>>>,
}

impl<const SIZE: usize> EventQueue<SIZE> {
    /// Create a new empty queue.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Get a sender handle for the protocol side.
    pub const fn sender(&self) -> EventSender<'_, SIZE> {
        EventSender { queue: self }
    }

    /// Get a receiver handle for the decoder side.
    pub const fn receiver(&self) -> EventReceiver<'_, SIZE> {
        EventReceiver { queue: self }
    }

    /// Post an event.
    ///
    /// Returns `Err(TrySendError(event))` if the queue is full.
    pub fn try_send(&self, event: DecoderEvent) -> Result<(), TrySendError> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.push_back(event).map_err(TrySendError)
        })
    }

    /// Take the oldest event, if any.
    pub fn try_receive(&self) -> Option<DecoderEvent> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().pop_front())
    }
}

impl<const SIZE: usize> Default for EventQueue<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting handle for an [`EventQueue`].
#[derive(Clone, Copy)]
pub struct EventSender<'a, const SIZE: usize> {
    queue: &'a EventQueue<SIZE>,
}

impl<const SIZE: usize> EventSender<'_, SIZE> {
    pub fn try_send(&self, event: DecoderEvent) -> Result<(), TrySendError> {
        self.queue.try_send(event)
    }

    pub fn function_group(&self, group: FunctionGroup, bits: u8) -> Result<(), TrySendError> {
        self.try_send(DecoderEvent::FunctionGroupChanged { group, bits })
    }

    pub fn cv_write(&self, number: u16, value: u8) -> Result<(), TrySendError> {
        self.try_send(DecoderEvent::CvWrite { number, value })
    }
}

/// Draining handle for an [`EventQueue`].
#[derive(Clone, Copy)]
pub struct EventReceiver<'a, const SIZE: usize> {
    queue: &'a EventQueue<SIZE>,
}

impl<const SIZE: usize> EventReceiver<'_, SIZE> {
    pub fn try_receive(&self) -> Option<DecoderEvent> {
        self.queue.try_receive()
    }
}
