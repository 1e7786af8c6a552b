// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! shell-volume - panel volume indicator backed by PipeWire.

use shell_volume::audio::pipewire::{self, Capture};
use shell_volume::audio::{MixerControl, MixerError, PwMixer};
use shell_volume::config::{amplification_allowed, AppConfig, ConfigManager};
use shell_volume::desktop::DesktopMatcher;
use shell_volume::indicator::Indicator;
use shell_volume::sound::{CanberraSound, FeedbackSound};
use shell_volume::tray::{self, TrayMessage};
use shell_volume::{MenuSettings, VolumeMenuController};
use std::rc::Rc;
use std::sync::mpsc::TryRecvError;
use std::time::Instant;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How often the tray message channel is drained.
const TRAY_POLL_MS: u64 = 50;

fn load_config(manager: Option<&ConfigManager>) -> AppConfig {
    let Some(manager) = manager else {
        return AppConfig::default();
    };
    match manager.load_config() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shell_volume=debug".parse()?),
        )
        .init();

    info!("shell-volume starting...");

    let config_manager = match ConfigManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            warn!("No config directory: {}", e);
            None
        }
    };
    let mut config = load_config(config_manager.as_ref());
    let desktop = DesktopMatcher::from_env();
    let mut amplify = amplification_allowed(&desktop, Some(&config));

    let mixer = Rc::new(PwMixer::new());
    let control: Rc<dyn MixerControl> = mixer.clone();
    let mut menu = VolumeMenuController::new(
        control,
        MenuSettings {
            amplification_allowed: amplify,
            notify_delay: config.sound.notify_delay(),
        },
    );

    let (tray_rx, tray_handle) = match tray::start_tray() {
        Some((rx, handle)) => (Some(rx), Some(handle)),
        None => {
            warn!("Running without a status icon");
            (None, None)
        }
    };
    let sound: Option<Box<dyn FeedbackSound>> = if config.sound.feedback {
        Some(Box::new(CanberraSound::new()))
    } else {
        None
    };
    let mut indicator = Indicator::new(tray_handle, sound);

    let mut refresh = tokio::time::interval(config.backend.poll_interval());
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut capture_task: Option<JoinHandle<Result<Capture, MixerError>>> = None;
    let mut tray_poll = tokio::time::interval(tokio::time::Duration::from_millis(TRAY_POLL_MS));
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    'main: loop {
        let deadline = menu.next_deadline();
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config");
                config = load_config(config_manager.as_ref());
                let allowed = amplification_allowed(&desktop, Some(&config));
                if allowed != amplify {
                    amplify = allowed;
                    menu.set_amplification_allowed(allowed);
                }
            }
            _ = refresh.tick(), if capture_task.is_none() => {
                capture_task = Some(tokio::task::spawn_blocking(pipewire::capture));
            }
            joined = async {
                match capture_task.as_mut() {
                    Some(task) => task.await,
                    None => std::future::pending().await,
                }
            }, if capture_task.is_some() => {
                capture_task = None;
                let capture = joined
                    .map_err(|e| MixerError::OperationFailed(e.to_string()))
                    .and_then(|capture| capture);
                for event in mixer.apply_capture(capture) {
                    debug!("Mixer event: {:?}", event);
                    menu.handle_mixer_event(event);
                }
            }
            _ = tray_poll.tick() => {
                while let Some(rx) = &tray_rx {
                    match rx.try_recv() {
                        Ok(TrayMessage::StepVolume(step)) => menu.scroll(step),
                        Ok(TrayMessage::Quit) => {
                            info!("Quit requested from tray");
                            break 'main;
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            warn!("Tray channel closed");
                            break 'main;
                        }
                    }
                }
            }
            _ = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            } => {}
        }

        menu.poll_timers(Instant::now());
        let events = menu.drain_events();
        indicator.present(&menu, &events);
    }

    indicator.shutdown();
    info!("shell-volume stopped");
    Ok(())
}
