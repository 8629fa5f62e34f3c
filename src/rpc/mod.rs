//! Remote command subsystem.
//!
//! JSON commands in, JSON replies out, over topics namespaced by the
//! client identifier.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RPC Stack                              │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │ MQTT cb   │──▶│  INBOX   │──▶│  Codec   │──▶│  Engine  │  │
//! │  │ (adapter) │   │(channels)│   │(validate)│   │(dispatch)│  │
//! │  └───────────┘   └──────────┘   └──────────┘   └────┬─────┘  │
//! │        ▲                                            │        │
//! │        └──────────── Reply (feedback topic) ◀───────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod command;
pub mod engine;
pub mod reply;
pub mod topics;
