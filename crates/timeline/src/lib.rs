//! Montage Timeline Model
//!
//! Defines the core data contracts for a Montage sequence:
//! - **Clips:** Video and image entries with negotiated playable durations
//! - **Duration policy:** How raw and requested lengths become slot lengths
//! - **Overlays:** Time-windowed text annotations and their scheduling rules
//! - **Timeline:** The ordered clip list and its derived global time bounds
//!
//! All times are seconds as `f64`. Times local to a clip start at `0.0`
//! at the clip's first playable frame; global times start at `0.0` at the
//! beginning of the sequence.
//!
//! This crate is pure computation: no I/O, no clocks, no rendering.

pub mod clip;
pub mod duration;
pub mod error;
pub mod overlay;
pub mod timeline;

pub use clip::*;
pub use duration::*;
pub use error::*;
pub use overlay::*;
pub use timeline::*;
