//! Layer panel: checkboxes, legends and notifications shown next to the map.

use std::time::Duration;

use maybe_sync::{MaybeSend, MaybeSync};

/// User interface the layer manager drives.
pub trait LayerPanel: MaybeSend + MaybeSync {
    /// Sets the state of the layer checkbox.
    fn set_checked(&self, layer_id: &str, checked: bool);
    /// Shows or hides the legend of a layer.
    fn set_legend_visible(&self, layer_id: &str, visible: bool);
    /// Shows a dismissible notification.
    fn notify(&self, notification: Notification);
}

/// Severity of a [`Notification`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// Neutral information.
    Info,
    /// Completed action.
    Success,
    /// Something was not done, nothing is broken.
    Warning,
    /// Something failed.
    Error,
}

/// Message shown to the user for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Message text.
    pub message: String,
    /// Time after which the notification disappears.
    pub duration: Duration,
}

/// Panel that only logs notifications. Used when the manager runs without a user interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPanel;

impl LayerPanel for LogPanel {
    fn set_checked(&self, _layer_id: &str, _checked: bool) {}

    fn set_legend_visible(&self, _layer_id: &str, _visible: bool) {}

    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            NotificationLevel::Info | NotificationLevel::Success => {
                log::info!("{}", notification.message)
            }
        }
    }
}
