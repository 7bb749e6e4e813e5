use std::path::Path;

/// Outward events. Failures are reported here instead of being returned
/// from `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SessionStarted,
    SessionStartFailed(String),
    SurfaceFound,
    ModelPlaced { path: String },
    ModelLoadFailed { path: String, reason: String },
    SessionEnded,
    ReadyForReselect,
    /// User-facing status line.
    Status(String),
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

impl<F> Notifier for F
where
    F: FnMut(Notification),
{
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}

pub(crate) mod status {
    use super::display_name;

    pub const SESSION_STARTED: &str = "AR Session Started. Look for a flat surface.";
    pub const SURFACE_FOUND: &str = "Surface detected. Tap to place model.";
    pub const MODEL_PLACED: &str = "Model placed!";
    pub const SESSION_ENDED: &str = "AR Session Ended.";
    pub const RESELECT: &str = "Point at a new surface to place the model.";

    pub fn model_changed(path: &str) -> String {
        format!("Changed model to {}!", display_name(path))
    }

    pub fn model_selected(path: &str) -> String {
        format!("{} selected. Tap surface to place.", display_name(path))
    }
}

/// File stem of a model path, for status lines.
pub fn display_name(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(path)
}
