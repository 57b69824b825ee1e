//! Audio graph for the patchcord host runtime.
//!
//! # Architecture
//!
//! - [`AudioContext`] owns every node and edge, the sample clock, and the
//!   cached render order. All mutation goes through it.
//! - Nodes are addressed by [`NodeId`], edges by [`EdgeId`]. Both are plain
//!   indices that are never reused, so a stale ID fails with
//!   [`GraphError::NodeNotFound`] / [`GraphError::EdgeNotFound`] instead of
//!   aliasing a newer node.
//! - Signal is mono. A node's input is the sum of everything connected to it.
//!
//! # Cycles
//!
//! A connection that would close a loop is refused unless the loop passes
//! through a delay node. The renderer reads delays at the start of a frame
//! and writes them at the end, so each lap around a feedback loop takes at
//! least one sample.
//!
//! # Example
//!
//! ```rust
//! use patchcord_core::graph::{AudioContext, GraphError};
//!
//! let mut ctx = AudioContext::new(48000.0);
//! let delay = ctx.create_delay(1.0)?;
//! let feedback = ctx.create_gain(0.4)?;
//!
//! ctx.connect(delay, feedback)?;
//! ctx.connect(feedback, delay)?; // loop through a delay: allowed
//! ctx.connect(delay, ctx.destination())?;
//!
//! let gain = ctx.create_gain(1.0)?;
//! ctx.connect(feedback, gain)?;
//! assert!(matches!(ctx.connect(gain, feedback), Err(GraphError::CycleDetected(_, _))));
//! # Ok::<(), GraphError>(())
//! ```

mod context;
pub mod edge;
pub mod node;
mod render;

pub use context::{AudioContext, GraphError, MAX_DELAY_SECS};
pub use edge::EdgeId;
pub use node::{NodeId, NodeKind};
