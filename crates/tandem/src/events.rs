//! # Input Events
//!
//! Host-to-engine input, queued while the engine is parked.
//!
//! ```text
//! ┌─────────────┐   send()    ┌─────────────┐   drain()   ┌─────────────┐
//! │    Host     │────────────>│  bounded    │────────────>│   Engine    │
//! │ (frontend)  │             │  channel    │             │ (on resume) │
//! └─────────────┘             └─────────────┘             └─────────────┘
//! ```
//!
//! The queue never blocks the host: a full queue drops the event and counts
//! it. The engine drains after each resume, so the queue only has to hold
//! one frame's worth of input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Input delivered from the frontend to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A key changed state.
    Key {
        /// Frontend-defined key code.
        code: u32,
        /// `true` on press, `false` on release.
        pressed: bool,
    },
    /// Relative pointer motion.
    PointerMotion {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
    },
    /// A pointer button changed state.
    PointerButton {
        /// Button index, 0 is the primary button.
        button: u8,
        /// `true` on press, `false` on release.
        pressed: bool,
    },
}

/// Creates a connected sender/receiver pair holding at most `capacity` events.
#[must_use]
pub fn input_queue(capacity: usize) -> (InputSender, InputReceiver) {
    let (sender, receiver) = bounded(capacity);
    (
        InputSender {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        InputReceiver { receiver },
    )
}

/// Host side of the input queue.
#[derive(Clone, Debug)]
pub struct InputSender {
    sender: Sender<InputEvent>,
    dropped: Arc<AtomicU64>,
}

impl InputSender {
    /// Queues an event without blocking.
    ///
    /// Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: InputEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // Engine is behind; newer input wins the next frame anyway
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Events dropped because the queue was full.
    #[inline]
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Engine side of the input queue.
#[derive(Clone, Debug)]
pub struct InputReceiver {
    receiver: Receiver<InputEvent>,
}

impl InputReceiver {
    /// Takes every queued event, oldest first.
    #[inline]
    pub fn drain(&self) -> impl Iterator<Item = InputEvent> + '_ {
        self.receiver.try_iter()
    }

    /// Takes the oldest queued event, if any.
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<InputEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of queued events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}
