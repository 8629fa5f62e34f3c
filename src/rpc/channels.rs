//! Inbound command queue.
//!
//! Uses an `embassy-sync` bounded channel to hand raw payloads from the
//! MQTT event callback (ESP-IDF client task) to the synchronous main loop
//! without heap allocation.
//!
//! ```text
//! ┌───────────────┐  InboundMsg  ┌──────────────┐
//! │ MQTT callback │─────────────▶│  Main loop   │──▶ CommandDispatcher
//! │ (client task) │   INBOX(8)   │  (drain)     │
//! └───────────────┘              └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

/// Largest inbound command payload accepted.
pub const MAX_PAYLOAD: usize = 512;

/// Inbound queue depth.
const INBOX_DEPTH: usize = 8;

/// One raw inbound message from the commands topic.
pub struct InboundMsg {
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

/// Inbound command channel: MQTT callback → main loop.
pub static INBOX: Channel<CriticalSectionRawMutex, InboundMsg, INBOX_DEPTH> = Channel::new();

/// Queue a payload for the main loop.  Oversized payloads and a full
/// queue both drop the message.
pub fn enqueue(payload: &[u8]) -> bool {
    let Ok(payload) = Vec::from_slice(payload) else {
        warn!("Inbox: {} byte payload too large, dropped", payload.len());
        return false;
    };
    if INBOX.try_send(InboundMsg { payload }).is_err() {
        warn!("Inbox: full, payload dropped");
        return false;
    }
    true
}

/// Take the next queued payload, if any.
pub fn dequeue() -> Option<InboundMsg> {
    INBOX.try_receive().ok()
}
