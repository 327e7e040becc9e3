//! Browser host abstraction for tabwardend
//!
//! The daemon never talks to a browser directly; it goes through the
//! [`BrowserHost`] trait. Concrete adapters (the native-messaging bridge in
//! production, [`MockBrowser`] in tests) supply tab lifecycle events and
//! execute tab closures and notifications.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
