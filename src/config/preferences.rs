// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Desktop-specific sound preferences.

use crate::config::AppConfig;
use crate::desktop::{DesktopMatcher, EnvSource};

/// A store of user sound preferences.
pub trait PreferenceStore {
    /// The `allow-amplified-volume` setting, or `None` if the store lacks it.
    fn allow_amplified_volume(&self) -> Option<bool>;
}

impl PreferenceStore for AppConfig {
    fn allow_amplified_volume(&self) -> Option<bool> {
        Some(self.sound.allow_amplified_volume)
    }
}

/// Whether the output slider may exceed the nominal maximum.
///
/// Only the Ubuntu desktop honours the preference; elsewhere it is always off.
pub fn amplification_allowed<E: EnvSource>(
    desktop: &DesktopMatcher<E>,
    prefs: Option<&dyn PreferenceStore>,
) -> bool {
    if !desktop.is("ubuntu") {
        return false;
    }
    prefs
        .and_then(|p| p.allow_amplified_volume())
        .unwrap_or(false)
}
