//! Console stand-ins for the notification layer and the permission flow

use location_tracker::{Notification, NotificationPresenter, PermissionGate};

/// Prints the foreground notification to stdout
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    visible: bool,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationPresenter for ConsolePresenter {
    fn show(&mut self, notification: &Notification) {
        let verb = if self.visible { "updated" } else { "shown" };
        let actions: Vec<&str> = notification
            .actions
            .iter()
            .map(|(_, label)| label.as_str())
            .collect();
        println!(
            "  🔔 Notification {} [{}] {} | {}",
            verb,
            notification.title,
            notification.body,
            actions.join(" / ")
        );
        self.visible = true;
    }

    fn hide(&mut self) {
        if self.visible {
            println!("  🔕 Notification removed");
        }
        self.visible = false;
    }
}

/// Permission flow with a configured answer
#[derive(Debug)]
pub struct ConsoleGate {
    granted: bool,
}

impl ConsoleGate {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

impl PermissionGate for ConsoleGate {
    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request_grant(&mut self) {
        println!("  🔐 Requesting while-in-use location permission...");
    }
}
