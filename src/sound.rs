// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Feedback sound played when a volume change settles.

use parking_lot::Mutex;
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{debug, trace};

/// Theme sound id for volume changes.
pub const VOLUME_CHANGE_SOUND: &str = "audio-volume-change";

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("Failed to start sound player: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

/// Plays the volume-change feedback sound.
pub trait FeedbackSound {
    fn play_volume_changed(&self) -> Result<(), SoundError>;
}

/// Plays theme sounds through `canberra-gtk-play`.
///
/// A new sound cancels the one still playing.
#[derive(Default)]
pub struct CanberraSound {
    playing: Mutex<Option<Child>>,
}

impl CanberraSound {
    pub fn new() -> Self {
        Self::default()
    }

    fn cancel(&self) {
        if let Some(mut child) = self.playing.lock().take() {
            if let Ok(None) = child.try_wait() {
                trace!("Cancelling previous feedback sound");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl FeedbackSound for CanberraSound {
    fn play_volume_changed(&self) -> Result<(), SoundError> {
        self.cancel();

        debug!("Playing {}", VOLUME_CHANGE_SOUND);
        let child = Command::new("canberra-gtk-play")
            .args(["--id", VOLUME_CHANGE_SOUND, "--description", "Volume changed"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        *self.playing.lock() = Some(child);
        Ok(())
    }
}

impl Drop for CanberraSound {
    fn drop(&mut self) {
        self.cancel();
    }
}
