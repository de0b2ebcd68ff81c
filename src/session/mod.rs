//! The browsing session: routing, view state, interaction handlers and the
//! driver task that turns data and actions into rendered frames.

pub mod actions;
pub mod catalog;
pub mod driver;
pub mod notices;
pub mod ratings;
pub mod router;
pub mod state;

pub use actions::UiAction;
pub use driver::{spawn, Frame, SessionHandle, SessionSettings};
pub use notices::{Notice, Severity};
pub use ratings::RatingMemory;
pub use router::Route;
pub use state::ViewState;
