// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Panel indicator: turns menu events into icon updates and feedback sounds.

use crate::menu::VolumeMenuController;
use crate::message::{MenuEvent, SliderEvent};
use crate::slider::VolumeIcon;
use crate::sound::FeedbackSound;
use crate::tray::TrayHandle;
use tracing::{debug, warn};

/// What the indicator currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorState {
    pub icon: Option<VolumeIcon>,
    pub level: Option<f64>,
}

/// Presents the volume menu on the panel.
pub struct Indicator {
    tray: Option<TrayHandle>,
    sound: Option<Box<dyn FeedbackSound>>,
    shown: IndicatorState,
}

impl Indicator {
    pub fn new(tray: Option<TrayHandle>, sound: Option<Box<dyn FeedbackSound>>) -> Self {
        Self {
            tray,
            sound,
            shown: IndicatorState::default(),
        }
    }

    pub fn shown(&self) -> IndicatorState {
        self.shown
    }

    /// Apply drained menu events.
    pub fn present(&mut self, menu: &VolumeMenuController, events: &[MenuEvent]) {
        let mut icon_dirty = false;
        for event in events {
            match event {
                MenuEvent::IconChanged => icon_dirty = true,
                MenuEvent::Slider {
                    event: SliderEvent::VolumeNotify { level },
                    kind,
                } => {
                    debug!("{} volume settled at {:.0}%", kind.as_str(), level);
                    self.play_feedback();
                }
                _ => {}
            }
        }
        if icon_dirty {
            self.update_icon(menu);
        }
    }

    fn update_icon(&mut self, menu: &VolumeMenuController) {
        let state = IndicatorState {
            icon: menu.current_icon(),
            level: menu.current_level(),
        };
        if state == self.shown {
            return;
        }
        self.shown = state;
        debug!("Indicator icon: {:?}", state.icon);
        if let Some(tray) = &self.tray {
            tray.set_icon(
                state.icon.map(VolumeIcon::icon_name),
                state.level,
                menu.output().accessible_name(),
            );
        }
    }

    fn play_feedback(&self) {
        if let Some(sound) = &self.sound {
            if let Err(e) = sound.play_volume_changed() {
                warn!("Failed to play volume feedback: {}", e);
            }
        }
    }

    pub fn shutdown(&self) {
        if let Some(tray) = &self.tray {
            tray.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory::MemoryMixer;
    use crate::audio::mixer::MixerEndpoint;
    use crate::audio::types::{EndpointKind, MixerState};
    use crate::menu::MenuSettings;
    use crate::slider::VOLUME_NOTIFY_DELAY;
    use crate::sound::SoundError;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;

    struct CountingSound(Rc<Cell<usize>>);

    impl FeedbackSound for CountingSound {
        fn play_volume_changed(&self) -> Result<(), SoundError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_icon_follows_output() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.daemon_set_volume(90);
        mixer.set_default_sink(Some(sink.id()));
        mixer.set_state(MixerState::Ready);

        let mut menu = VolumeMenuController::new(mixer.clone(), MenuSettings::default());
        let mut indicator = Indicator::new(None, None);
        let events = menu.drain_events();
        indicator.present(&menu, &events);
        assert_eq!(
            indicator.shown(),
            IndicatorState {
                icon: Some(VolumeIcon::High),
                level: Some(90.0),
            }
        );

        mixer.set_state(MixerState::Failed);
        for event in mixer.take_events() {
            menu.handle_mixer_event(event);
        }
        let events = menu.drain_events();
        indicator.present(&menu, &events);
        assert_eq!(indicator.shown(), IndicatorState::default());
    }

    #[test]
    fn test_settled_volume_plays_sound_once() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let sink = mixer.add_endpoint(EndpointKind::Output);
        mixer.set_default_sink(Some(sink.id()));
        mixer.set_state(MixerState::Ready);

        let plays = Rc::new(Cell::new(0));
        let mut menu = VolumeMenuController::new(mixer.clone(), MenuSettings::default());
        let mut indicator = Indicator::new(None, Some(Box::new(CountingSound(plays.clone()))));
        let events = menu.drain_events();
        indicator.present(&menu, &events);

        let start = Instant::now();
        for step in 1..=5 {
            menu.output_mut()
                .set_normalized_value_at(step as f64 / 10.0, start);
        }
        let events = menu.drain_events();
        indicator.present(&menu, &events);
        assert_eq!(plays.get(), 0);

        menu.poll_timers(start + VOLUME_NOTIFY_DELAY);
        let events = menu.drain_events();
        indicator.present(&menu, &events);
        assert_eq!(plays.get(), 1);
    }
}
