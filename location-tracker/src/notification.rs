//! Foreground notification
//!
//! While no UI is attached and tracking is on, the service stays alive by
//! showing an ongoing notification with the latest position. Rendering is
//! up to the [`NotificationPresenter`]; this module only decides content.

use crate::config::NotificationConfig;
use crate::types::{position_text, Position};
use std::fmt;

/// Action buttons carried by the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationAction {
    /// Bring the UI back to the foreground
    Launch,
    /// Stop tracking; routed back into the controller's stop path
    Cancel,
}

impl fmt::Display for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationAction::Launch => write!(f, "Launch"),
            NotificationAction::Cancel => write!(f, "Cancel"),
        }
    }
}

/// Ongoing notification describing the latest position
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u32,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    /// Ongoing notifications cannot be swiped away
    pub ongoing: bool,
    /// Actions in display order, each with its label
    pub actions: Vec<(NotificationAction, String)>,
}

impl Notification {
    /// Build the foreground notification for `position`
    pub fn for_position(position: Option<&Position>, config: &NotificationConfig) -> Self {
        Self {
            id: config.notification_id,
            channel_id: config.channel_id.clone(),
            title: config.title.clone(),
            body: position_text(position),
            ongoing: true,
            actions: vec![
                (NotificationAction::Launch, config.launch_label.clone()),
                (NotificationAction::Cancel, config.cancel_label.clone()),
            ],
        }
    }

    pub fn has_action(&self, action: NotificationAction) -> bool {
        self.actions.iter().any(|(a, _)| *a == action)
    }
}

/// Presentation layer for the foreground notification
///
/// `show` with an id that is already displayed updates it in place; `hide`
/// when nothing is displayed does nothing.
pub trait NotificationPresenter: Send {
    fn show(&mut self, notification: &Notification);

    fn hide(&mut self);
}
