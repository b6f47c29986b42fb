/// Sound registry
///
/// Sole owner of playback resources: at most one per sound, created on first
/// use and released exactly once.
use std::collections::HashMap;

use crate::audio_system::{AudioBackend, EndedCallback, SoundResource, SourceBytes};
use crate::error::AudioError;
use crate::state::SoundId;

#[derive(Default)]
pub struct SoundRegistry {
    resources: HashMap<SoundId, Box<dyn SoundResource>>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing resource for `id`, or a new one bound to `source`.
    ///
    /// `on_ended` is registered only when the resource is created.
    pub fn ensure(
        &mut self,
        id: SoundId,
        source: &SourceBytes,
        backend: &dyn AudioBackend,
        on_ended: impl FnOnce() -> EndedCallback,
    ) -> Result<&mut dyn SoundResource, AudioError> {
        if !self.resources.contains_key(&id) {
            let mut resource = backend.create_resource(source)?;
            resource.on_ended(on_ended());
            tracing::debug!("Created playback resource for {}", id);
            self.resources.insert(id, resource);
        }

        match self.resources.get_mut(&id) {
            Some(resource) => Ok(resource.as_mut()),
            None => Err(AudioError::SourceReleased),
        }
    }

    pub fn get_mut(&mut self, id: SoundId) -> Option<&mut dyn SoundResource> {
        match self.resources.get_mut(&id) {
            Some(resource) => Some(resource.as_mut()),
            None => None,
        }
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Ids of every live resource
    pub fn ids(&self) -> Vec<SoundId> {
        self.resources.keys().copied().collect()
    }

    /// Pause, detach and forget the resource. No-op for unknown ids.
    pub fn release(&mut self, id: SoundId) -> bool {
        match self.resources.remove(&id) {
            Some(mut resource) => {
                resource.pause();
                resource.detach();
                tracing::debug!("Released playback resource for {}", id);
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for (_, mut resource) in self.resources.drain() {
            resource.pause();
            resource.detach();
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fake_audio, FakeBackend};
    use std::sync::Arc;

    fn noop() -> EndedCallback {
        Arc::new(|| {})
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let backend = FakeBackend::new();
        let mut registry = SoundRegistry::new();
        let bytes = SourceBytes::new(fake_audio(1.0));
        let id = SoundId::new(1);

        registry.ensure(id, &bytes, &backend, noop).unwrap();
        registry.ensure(id, &bytes, &backend, noop).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_release_detaches_once() {
        let backend = FakeBackend::new();
        let mut registry = SoundRegistry::new();
        let id = SoundId::new(1);
        registry
            .ensure(id, &SourceBytes::new(fake_audio(1.0)), &backend, noop)
            .unwrap();

        assert!(registry.release(id));
        assert!(!registry.release(id));
        assert!(registry.is_empty());

        let probe = backend.resource(0).unwrap();
        assert!(probe.is_detached());
        assert!(!probe.is_playing());
    }

    #[test]
    fn test_release_all() {
        let backend = FakeBackend::new();
        let mut registry = SoundRegistry::new();
        for n in 0..3 {
            registry
                .ensure(SoundId::new(n), &SourceBytes::new(fake_audio(1.0)), &backend, noop)
                .unwrap();
        }

        registry.release_all();
        assert!(registry.is_empty());
        assert!((0..3).all(|n| backend.resource(n).unwrap().is_detached()));
    }

    #[test]
    fn test_ensure_propagates_create_failure() {
        let backend = FakeBackend::new();
        backend.fail_next_create();
        let mut registry = SoundRegistry::new();

        let result = registry.ensure(SoundId::new(1), &SourceBytes::new(fake_audio(1.0)), &backend, noop);
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
