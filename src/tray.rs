// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Volume status icon using ksni (StatusNotifierItem).

use ksni::{menu::StandardItem, Handle, MenuItem, Orientation, Status, Tray, TrayMethods};
use std::sync::mpsc;
use tracing::{debug, error, info};

/// Messages sent from the tray to the host loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrayMessage {
    /// Move the output slider by this many normalized units.
    StepVolume(f64),
    /// Quit the application.
    Quit,
}

/// Slider step for the raise/lower menu items.
pub const VOLUME_STEP: f64 = 0.1;

/// Slider step for one scroll notch; only vertical scrolling adjusts volume.
fn scroll_step(delta: i32, orientation: Orientation) -> Option<f64> {
    match orientation {
        Orientation::Vertical if delta != 0 => Some(VOLUME_STEP * f64::from(delta.signum())),
        _ => None,
    }
}

/// State shared with the tray icon.
struct VolumeTray {
    tx: mpsc::Sender<TrayMessage>,
    /// Current status icon; `None` hides the indicator.
    icon: Option<String>,
    level: Option<f64>,
    title: &'static str,
}

impl Tray for VolumeTray {
    fn id(&self) -> String {
        "shell-volume".to_string()
    }

    fn title(&self) -> String {
        self.title.to_string()
    }

    fn icon_name(&self) -> String {
        self.icon.clone().unwrap_or_default()
    }

    fn status(&self) -> Status {
        if self.icon.is_some() {
            Status::Active
        } else {
            Status::Passive
        }
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let description = match self.level {
            Some(level) => format!("{} {:.0}%", self.title, level),
            None => "No output device".to_string(),
        };
        ksni::ToolTip {
            title: self.title.to_string(),
            description,
            icon_name: String::new(),
            icon_pixmap: vec![],
        }
    }

    fn scroll(&mut self, delta: i32, orientation: Orientation) {
        if self.icon.is_none() {
            return;
        }
        if let Some(step) = scroll_step(delta, orientation) {
            debug!("Tray: scrolled by {}", delta);
            let _ = self.tx.send(TrayMessage::StepVolume(step));
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        vec![
            MenuItem::Standard(StandardItem {
                label: "Raise Volume".to_string(),
                enabled: self.icon.is_some(),
                activate: Box::new(|tray: &mut Self| {
                    debug!("Tray: Raise clicked");
                    let _ = tray.tx.send(TrayMessage::StepVolume(VOLUME_STEP));
                }),
                ..Default::default()
            }),
            MenuItem::Standard(StandardItem {
                label: "Lower Volume".to_string(),
                enabled: self.icon.is_some(),
                activate: Box::new(|tray: &mut Self| {
                    debug!("Tray: Lower clicked");
                    let _ = tray.tx.send(TrayMessage::StepVolume(-VOLUME_STEP));
                }),
                ..Default::default()
            }),
            MenuItem::Separator,
            MenuItem::Standard(StandardItem {
                label: "Quit".to_string(),
                activate: Box::new(|tray: &mut Self| {
                    debug!("Tray: Quit clicked");
                    let _ = tray.tx.send(TrayMessage::Quit);
                }),
                ..Default::default()
            }),
        ]
    }
}

/// Handle to the running tray service.
pub struct TrayHandle {
    handle: Handle<VolumeTray>,
}

impl TrayHandle {
    /// Show `icon` with `level`, or hide the indicator when `icon` is `None`.
    ///
    /// `title` labels the tooltip, e.g. the output slider's accessible name.
    pub fn set_icon(&self, icon: Option<&'static str>, level: Option<f64>, title: &'static str) {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            handle
                .update(move |tray| {
                    tray.icon = icon.map(str::to_string);
                    tray.level = level;
                    tray.title = title;
                })
                .await;
        });
    }

    /// Shut down the tray icon, removing it from the system tray.
    pub fn shutdown(&self) {
        info!("Shutting down system tray");
        self.handle.shutdown();
    }
}

/// Start the status icon.
///
/// Returns a receiver for tray messages and a handle to update tray state.
/// The tray runs on its own thread with a private tokio runtime.
pub fn start_tray() -> Option<(mpsc::Receiver<TrayMessage>, TrayHandle)> {
    let (tx, rx) = mpsc::channel();

    let tray = VolumeTray {
        tx,
        icon: None,
        level: None,
        title: "Volume",
    };

    let (handle_tx, handle_rx) = mpsc::channel();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime for tray: {}", e);
                let _ = handle_tx.send(None);
                return;
            }
        };

        rt.block_on(async {
            match tray.spawn().await {
                Ok(handle) => {
                    info!("System tray started");
                    let _ = handle_tx.send(Some(handle));
                    // Keep the runtime alive
                    std::future::pending::<()>().await;
                }
                Err(e) => {
                    error!("Failed to start system tray: {}", e);
                    let _ = handle_tx.send(None);
                }
            }
        });
    });

    match handle_rx.recv_timeout(std::time::Duration::from_secs(5)) {
        Ok(Some(handle)) => Some((rx, TrayHandle { handle })),
        Ok(None) => None,
        Err(_) => {
            error!("Timeout waiting for tray to start");
            None
        }
    }
}
