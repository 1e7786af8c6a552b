// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-process mixer client.
//!
//! Holds the whole graph in memory and queues notifications like a daemon
//! connection would. Hosts without a sound server and the test suite drive
//! the volume menu through it.

use crate::audio::mixer::{MixerControl, MixerEndpoint, MixerError};
use crate::audio::types::{
    EndpointId, EndpointKind, MixerEvent, MixerState, Port, RecordingStream, VOLUME_NORM,
    VOLUME_UI_MAX,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

/// A write issued against an endpoint, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointWrite {
    Volume(EndpointId, u32),
    Muted(EndpointId, bool),
    Push(EndpointId),
}

#[derive(Default)]
struct MixerLog {
    events: RefCell<VecDeque<MixerEvent>>,
    writes: RefCell<Vec<EndpointWrite>>,
}

impl MixerLog {
    fn emit(&self, event: MixerEvent) {
        trace!("Mixer event: {:?}", event);
        self.events.borrow_mut().push_back(event);
    }

    fn record(&self, write: EndpointWrite) {
        self.writes.borrow_mut().push(write);
    }
}

/// Endpoint of a [`MemoryMixer`].
pub struct MemoryEndpoint {
    id: EndpointId,
    kind: EndpointKind,
    volume: Cell<u32>,
    muted: Cell<bool>,
    /// Last values the "daemon" has seen.
    committed: Cell<(u32, bool)>,
    form_factor: RefCell<Option<String>>,
    ports: RefCell<Vec<Port>>,
    active_port: RefCell<Option<Port>>,
    log: Rc<MixerLog>,
}

impl MemoryEndpoint {
    fn new(id: EndpointId, kind: EndpointKind, log: Rc<MixerLog>) -> Self {
        Self {
            id,
            kind,
            volume: Cell::new(0),
            muted: Cell::new(false),
            committed: Cell::new((0, false)),
            form_factor: RefCell::new(None),
            ports: RefCell::new(Vec::new()),
            active_port: RefCell::new(None),
            log,
        }
    }

    /// Change the volume from the daemon side.
    pub fn daemon_set_volume(&self, volume: u32) {
        self.volume.set(volume);
        self.committed.set((volume, self.muted.get()));
        self.log.emit(MixerEvent::VolumeChanged(self.id));
    }

    /// Change the mute flag from the daemon side.
    pub fn daemon_set_muted(&self, muted: bool) {
        self.muted.set(muted);
        self.committed.set((self.volume.get(), muted));
        self.log.emit(MixerEvent::MutedChanged(self.id));
    }

    pub fn set_form_factor(&self, form_factor: Option<&str>) {
        *self.form_factor.borrow_mut() = form_factor.map(str::to_string);
    }

    pub fn set_ports(&self, ports: Vec<Port>) {
        *self.ports.borrow_mut() = ports;
    }

    /// Switch the active port. Unknown port names are ignored.
    pub fn select_port(&self, port: &str) {
        let found = self.ports.borrow().iter().find(|p| p.port == port).cloned();
        if let Some(found) = found {
            *self.active_port.borrow_mut() = Some(found);
            self.log.emit(MixerEvent::PortChanged(self.id));
        }
    }
}

impl MixerEndpoint for MemoryEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn kind(&self) -> EndpointKind {
        self.kind
    }

    fn volume(&self) -> u32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: u32) {
        self.volume.set(volume);
        self.log.record(EndpointWrite::Volume(self.id, volume));
    }

    fn is_muted(&self) -> bool {
        self.muted.get()
    }

    fn change_is_muted(&self, muted: bool) {
        self.muted.set(muted);
        self.log.record(EndpointWrite::Muted(self.id, muted));
    }

    fn push_volume(&self) -> Result<(), MixerError> {
        self.log.record(EndpointWrite::Push(self.id));

        let (old_volume, old_muted) = self.committed.get();
        let (volume, muted) = (self.volume.get(), self.muted.get());
        self.committed.set((volume, muted));

        if volume != old_volume {
            self.log.emit(MixerEvent::VolumeChanged(self.id));
        }
        if muted != old_muted {
            self.log.emit(MixerEvent::MutedChanged(self.id));
        }
        Ok(())
    }

    fn form_factor(&self) -> Option<String> {
        self.form_factor.borrow().clone()
    }

    fn ports(&self) -> Vec<Port> {
        self.ports.borrow().clone()
    }

    fn active_port(&self) -> Option<Port> {
        self.active_port.borrow().clone()
    }
}

struct MixerInner {
    state: MixerState,
    endpoints: Vec<Rc<MemoryEndpoint>>,
    default_sink: Option<EndpointId>,
    default_source: Option<EndpointId>,
    recording: Vec<RecordingStream>,
    next_id: EndpointId,
}

/// Mixer client backed by in-memory state.
pub struct MemoryMixer {
    inner: RefCell<MixerInner>,
    vol_max_norm: u32,
    vol_max_amplified: u32,
    log: Rc<MixerLog>,
}

impl Default for MemoryMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMixer {
    pub fn new() -> Self {
        Self::with_limits(VOLUME_NORM, VOLUME_UI_MAX)
    }

    /// Create a mixer with custom volume ceilings.
    pub fn with_limits(vol_max_norm: u32, vol_max_amplified: u32) -> Self {
        Self {
            inner: RefCell::new(MixerInner {
                state: MixerState::Closed,
                endpoints: Vec::new(),
                default_sink: None,
                default_source: None,
                recording: Vec::new(),
                next_id: 1,
            }),
            vol_max_norm,
            vol_max_amplified,
            log: Rc::new(MixerLog::default()),
        }
    }

    pub fn set_state(&self, state: MixerState) {
        self.inner.borrow_mut().state = state;
        self.log.emit(MixerEvent::StateChanged);
    }

    fn allocate_id(&self) -> EndpointId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Add a sink or source to the graph.
    pub fn add_endpoint(&self, kind: EndpointKind) -> Rc<MemoryEndpoint> {
        let id = self.allocate_id();
        let endpoint = Rc::new(MemoryEndpoint::new(id, kind, self.log.clone()));
        self.inner.borrow_mut().endpoints.push(endpoint.clone());
        endpoint
    }

    /// Remove an endpoint, dropping the mixer's reference to it.
    pub fn remove_endpoint(&self, id: EndpointId) {
        let mut inner = self.inner.borrow_mut();
        inner.endpoints.retain(|e| e.id != id);
        let sink_gone = inner.default_sink == Some(id);
        let source_gone = inner.default_source == Some(id);
        if sink_gone {
            inner.default_sink = None;
        }
        if source_gone {
            inner.default_source = None;
        }
        drop(inner);

        if sink_gone {
            self.log.emit(MixerEvent::DefaultSinkChanged);
        }
        if source_gone {
            self.log.emit(MixerEvent::DefaultSourceChanged);
        }
    }

    pub fn set_default_sink(&self, id: Option<EndpointId>) {
        self.inner.borrow_mut().default_sink = id;
        self.log.emit(MixerEvent::DefaultSinkChanged);
    }

    pub fn set_default_source(&self, id: Option<EndpointId>) {
        self.inner.borrow_mut().default_source = id;
        self.log.emit(MixerEvent::DefaultSourceChanged);
    }

    /// Start an application recording stream.
    pub fn add_recording_stream(&self, application_id: Option<&str>) -> EndpointId {
        let id = self.allocate_id();
        self.inner
            .borrow_mut()
            .recording
            .push(RecordingStream::new(id, application_id));
        self.log.emit(MixerEvent::StreamAdded(id));
        id
    }

    pub fn remove_recording_stream(&self, id: EndpointId) {
        let mut inner = self.inner.borrow_mut();
        let before = inner.recording.len();
        inner.recording.retain(|s| s.id != id);
        let removed = inner.recording.len() != before;
        drop(inner);

        if removed {
            self.log.emit(MixerEvent::StreamRemoved(id));
        }
    }

    /// Drain queued notifications.
    pub fn take_events(&self) -> Vec<MixerEvent> {
        self.log.events.borrow_mut().drain(..).collect()
    }

    /// Drain the write log.
    pub fn take_writes(&self) -> Vec<EndpointWrite> {
        std::mem::take(&mut *self.log.writes.borrow_mut())
    }

    fn endpoint(&self, id: Option<EndpointId>) -> Option<Rc<dyn MixerEndpoint>> {
        let id = id?;
        self.inner
            .borrow()
            .endpoints
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.clone() as Rc<dyn MixerEndpoint>)
    }
}

impl MixerControl for MemoryMixer {
    fn state(&self) -> MixerState {
        self.inner.borrow().state
    }

    fn default_sink(&self) -> Option<Rc<dyn MixerEndpoint>> {
        let id = self.inner.borrow().default_sink;
        self.endpoint(id)
    }

    fn default_source(&self) -> Option<Rc<dyn MixerEndpoint>> {
        let id = self.inner.borrow().default_source;
        self.endpoint(id)
    }

    fn vol_max_norm(&self) -> u32 {
        self.vol_max_norm
    }

    fn vol_max_amplified(&self) -> u32 {
        self.vol_max_amplified
    }

    fn source_outputs(&self) -> Vec<RecordingStream> {
        self.inner.borrow().recording.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_emits_only_changes() {
        let mixer = MemoryMixer::new();
        let sink = mixer.add_endpoint(EndpointKind::Output);

        sink.set_volume(1000);
        sink.push_volume().unwrap();
        assert_eq!(mixer.take_events(), vec![MixerEvent::VolumeChanged(sink.id())]);

        sink.change_is_muted(true);
        sink.push_volume().unwrap();
        assert_eq!(mixer.take_events(), vec![MixerEvent::MutedChanged(sink.id())]);

        sink.push_volume().unwrap();
        assert!(mixer.take_events().is_empty());
    }

    #[test]
    fn test_default_sink_lookup() {
        let mixer = MemoryMixer::new();
        assert!(mixer.default_sink().is_none());

        let sink = mixer.add_endpoint(EndpointKind::Output);
        mixer.set_default_sink(Some(sink.id()));
        assert_eq!(mixer.default_sink().map(|s| s.id()), Some(sink.id()));

        mixer.remove_endpoint(sink.id());
        assert!(mixer.default_sink().is_none());
        assert_eq!(
            mixer.take_events(),
            vec![MixerEvent::DefaultSinkChanged, MixerEvent::DefaultSinkChanged]
        );
    }

    #[test]
    fn test_select_port() {
        let mixer = MemoryMixer::new();
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.set_ports(vec![
            Port::new("analog-output-speaker", "Speakers"),
            Port::new("analog-output-headphones", "Headphones"),
        ]);

        sink.select_port("does-not-exist");
        assert!(sink.active_port().is_none());

        sink.select_port("analog-output-headphones");
        assert_eq!(
            sink.active_port().map(|p| p.port),
            Some("analog-output-headphones".to_string())
        );
        assert_eq!(mixer.take_events(), vec![MixerEvent::PortChanged(sink.id())]);
    }
}
