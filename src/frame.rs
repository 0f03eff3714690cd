//! Frames and the capture-to-inference handoff.
//!
//! - `Frame`: owned RGB24 pixels plus dimensions and a capture sequence number.
//! - `FrameSlot`: single-frame mailbox between the capture and inference
//!   threads. Pushing while a frame is waiting evicts the waiting frame, so
//!   inference always works on the newest capture.

use anyhow::{anyhow, Result};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One captured video frame in packed RGB24.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic capture counter assigned by the source.
    pub sequence: u64,
}

impl Frame {
    /// Wrap RGB24 pixels. Fails when the buffer length does not match the
    /// dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// FrameSlot: bounded (1) drop-oldest handoff
// ----------------------------------------------------------------------------

/// Capacity-one, drop-oldest mailbox for frames.
///
/// The capture side never blocks. The inference side blocks in `take` until a
/// frame arrives or the slot is closed.
pub struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

#[derive(Default)]
struct SlotState {
    frame: Option<Frame>,
    closed: bool,
    pushed: u64,
    dropped: u64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::default()),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Slot state stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer a frame. Returns `true` when a waiting frame was evicted.
    /// Frames pushed after `close` are discarded.
    pub fn push(&self, frame: Frame) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.pushed += 1;
        let evicted = state.frame.replace(frame).is_some();
        if evicted {
            state.dropped += 1;
        }
        drop(state);
        self.ready.notify_one();
        evicted
    }

    /// Wait for the next frame. Returns `None` once the slot is closed and
    /// drained.
    pub fn take(&self) -> Option<Frame> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of `take`.
    pub fn try_take(&self) -> Option<Frame> {
        self.lock().frame.take()
    }

    /// Stop accepting frames and wake the consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    /// Frames accepted so far.
    pub fn pushed(&self) -> u64 {
        self.lock().pushed
    }

    /// Frames evicted before inference picked them up.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn make_frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 4 * 3], 2, 2, sequence).unwrap()
    }

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 5], 2, 2, 0).is_err());
    }

    #[test]
    fn slot_keeps_only_newest_frame() {
        let slot = FrameSlot::new();
        assert!(!slot.push(make_frame(1)));
        assert!(slot.push(make_frame(2)));
        assert!(slot.push(make_frame(3)));

        assert_eq!(slot.try_take().map(|f| f.sequence), Some(3));
        assert!(slot.try_take().is_none());
        assert_eq!(slot.pushed(), 3);
        assert_eq!(slot.dropped(), 2);
    }

    #[test]
    fn close_drains_then_ends() {
        let slot = FrameSlot::new();
        slot.push(make_frame(7));
        slot.close();
        assert!(!slot.push(make_frame(8)));
        assert_eq!(slot.take().map(|f| f.sequence), Some(7));
        assert!(slot.take().is_none());
    }

    #[test]
    fn take_wakes_on_push_from_another_thread() {
        let slot = Arc::new(FrameSlot::new());
        let producer = {
            let slot = slot.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                slot.push(make_frame(42));
            })
        };
        let frame = slot.take().expect("frame");
        assert_eq!(frame.sequence, 42);
        producer.join().unwrap();
    }
}
