// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Current desktop environment detection.
//!
//! The desktop only changes when the shell restarts, so every answer is
//! cached for the lifetime of the matcher.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

/// Environment variable holding the colon-separated desktop list.
pub const CURRENT_DESKTOP_VAR: &str = "XDG_CURRENT_DESKTOP";

/// Extensions that are part of the system session on the Ubuntu desktop.
pub const UBUNTU_PINNED_EXTENSIONS: &[&str] =
    &["ubuntu-dock@ubuntu.com", "ubuntu-appindicators@ubuntu.com"];

/// Source of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Answers whether the current desktop matches a given name.
pub struct DesktopMatcher<E = ProcessEnv> {
    env: E,
    matches: Mutex<HashMap<String, bool>>,
}

impl DesktopMatcher<ProcessEnv> {
    pub fn from_env() -> Self {
        Self::new(ProcessEnv)
    }
}

impl<E: EnvSource> DesktopMatcher<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            matches: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `name` is one of the entries of `XDG_CURRENT_DESKTOP`.
    ///
    /// Matching is exact and case-sensitive, token by token, so an empty
    /// entry such as the middle of `ubuntu::GNOME` matches `""`. An unset or
    /// empty variable matches nothing.
    pub fn is(&self, name: &str) -> bool {
        let mut matches = self.matches.lock();
        if let Some(&matched) = matches.get(name) {
            return matched;
        }

        let matched = match self.env.var(CURRENT_DESKTOP_VAR) {
            Some(desktops) if !desktops.is_empty() => desktops.split(':').any(|d| d == name),
            _ => false,
        };

        trace!("Desktop '{}' matched: {}", name, matched);
        matches.insert(name.to_string(), matched);
        matched
    }

    /// Check whether an extension is pinned by the system session.
    pub fn is_system_pinned_extension(&self, uuid: &str) -> bool {
        if !self.is("ubuntu") {
            return false;
        }
        UBUNTU_PINNED_EXTENSIONS.contains(&uuid)
    }
}
