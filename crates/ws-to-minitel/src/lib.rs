//! ws-to-minitel library.
//!
//! Bridges a Minitel terminal attached to a serial line and a remote
//! WebSocket service: keystrokes go up, frames come down and are written to
//! the screen verbatim.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │                     ws-to-minitel binary                      │
//!  │                                                               │
//!  │  ┌────────────────┐    ┌───────────────────────────────────┐  │
//!  │  │ SerialTerminal │◄──►│        SessionOrchestrator        │  │
//!  │  │ (device files) │    │ handshake · supervisor · relay    │  │
//!  │  └────────────────┘    └──────────┬──────────────┬─────────┘  │
//!  │                                   │              │            │
//!  │                      ┌────────────▼───┐   ┌──────▼─────────┐  │
//!  │                      │ Tungstenite-   │   │ FileFrame-     │  │
//!  │                      │ Connector      │   │ Recorder       │  │
//!  │                      └────────────┬───┘   └────────────────┘  │
//!  └───────────────────────────────────┼───────────────────────────┘
//!                                      │ ws:// or wss://
//!                              remote service
//! ```
//!
//! # Module layout
//!
//! - [`domain`]: configuration, frame naming, the frame counter
//! - [`application`]: ports, handshake, relay, reconnect supervisor, orchestrator
//! - [`infrastructure`]: device, WebSocket and capture adapters

pub mod application;
pub mod domain;
pub mod infrastructure;
