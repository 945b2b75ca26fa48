//! Montage Playback Engine
//!
//! Plays a [`Timeline`](montage_timeline::Timeline) as one continuous
//! sequence on a single drawing surface.
//!
//! # Architecture
//!
//! ```text
//!   host events                     host callbacks
//!  (pointer, edits)               (frame, media ready)
//!        │                                 │
//!        ▼                                 ▼
//! ┌──────────────────────────────────────────────┐
//! │                  Sequencer                    │
//! │  clock ─ state machine ─ timeline ─ outbox    │
//! │        │                      │               │
//! │        ▼                      ▼               │
//! │  ┌────────────┐        ┌──────────────┐       │
//! │  │ MediaSource│        │  Compositor  │       │
//! │  └────────────┘        └──────┬───────┘       │
//! └───────────────────────────────┼───────────────┘
//!                                 ▼
//!                              Surface
//! ```
//!
//! The engine is single-threaded. Every host callback runs one transition
//! to completion; stale callbacks are recognised by their [`LoadToken`] or
//! [`FrameHandle`] and dropped.

pub mod compositor;
pub mod headless;
pub mod host;
pub mod sequencer;

pub use compositor::{Compositor, CompositorConfig, ControlHit};
pub use host::*;
pub use sequencer::*;
