//! Native-messaging browser host adapter
//!
//! The companion extension launches the daemon as a Chrome native-messaging
//! host and forwards tab lifecycle events over stdio; the daemon sends tab
//! queries, closes, and notifications back over the same channel. Frames
//! are 4-byte little-endian length-prefixed JSON, per the native messaging
//! convention.

mod adapter;
mod codec;

pub use adapter::*;
pub use codec::*;
