//! Surface placement core: find a real-world surface through hit-testing,
//! place one model on it, then drag and rotate it in place.
//!
//! [`session::SessionManager`] is the entry point. Everything it talks to
//! (tracking platform, model loader, scene host, notification sink) is
//! injected as a trait object; [`sim`] provides deterministic versions.

pub mod assets;
pub mod config;
pub mod geometry;
pub mod interaction;
pub mod placement;
pub mod platform;
pub mod scene;
pub mod session;
pub mod sim;
pub mod task;
pub mod tracking;

pub use session::{FrameInfo, Notification, SessionManager, SessionState};
