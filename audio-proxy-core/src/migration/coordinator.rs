use std::sync::Arc;

use super::snapshot::SourceSnapshot;
use crate::models::error::BackendError;
use crate::models::migration::{InheritOutcome, MigrationMapping, MigrationReport};
use crate::models::state::SourceState;
use crate::registry::buffer_registry::{BufferRegistry, SharedBuffers};
use crate::registry::listener_controller::SharedListener;
use crate::registry::source_registry::{SharedSources, SourceRegistry};
use crate::traits::device::AudioContext;
use crate::traits::handle_backend::Handle;

/// Moves every live buffer, source and the listener state from one context
/// to another.
///
/// The shared registries stay where they are: their contents are replaced by
/// registries built on the new context, and each successor carries the
/// old→new mapping in its lineage so existing proxies keep resolving.
///
/// If anything fails before the old registries are replaced, the new
/// objects are released, the paused sources are resumed on the old context
/// and the error is returned.
pub struct MigrationCoordinator<'a> {
    pub old_context: &'a dyn AudioContext,
    pub new_context: &'a dyn AudioContext,
    pub buffers: &'a SharedBuffers,
    pub sources: &'a SharedSources,
    pub listener: &'a SharedListener,
    pub buffer_batch: u32,
    pub source_batch: u32,
}

struct Rebuilt {
    buffers: BufferRegistry,
    buffer_outcome: InheritOutcome,
    sources: SourceRegistry,
    source_handles: Vec<Handle>,
}

impl MigrationCoordinator<'_> {
    pub fn run(&self) -> Result<MigrationReport, BackendError> {
        let mut sources = self.sources.lock();
        let mut buffers = self.buffers.lock();
        let mut listener = self.listener.lock();

        // Capture on the old context.
        self.old_context.make_current()?;
        let old_handles = sources.used().to_vec();
        let states: Vec<SourceState> = old_handles.iter().map(|&h| sources.state(h)).collect();
        sources.pause_all();
        let snapshots: Vec<SourceSnapshot> = old_handles
            .iter()
            .zip(&states)
            .map(|(&h, &state)| SourceSnapshot {
                state,
                ..sources.snapshot(h)
            })
            .collect();
        let playing: Vec<Handle> = old_handles
            .iter()
            .zip(&states)
            .filter(|(_, state)| state.is_playing())
            .map(|(&h, _)| h)
            .collect();
        let listener_snapshot = listener.snapshot();

        let rebuilt = match self.rebuild(&sources, &buffers) {
            Ok(rebuilt) => rebuilt,
            Err(e) => {
                log::error!("Migration aborted: {e}");
                match self.old_context.make_current() {
                    Ok(()) => {
                        sources.play_batch(&playing);
                    }
                    Err(e) => log::error!("Failed to reactivate previous context: {e}"),
                }
                return Err(e);
            }
        };

        // The new context is current from here on.
        let Rebuilt {
            buffers: new_buffers,
            buffer_outcome,
            sources: mut new_sources,
            source_handles,
        } = rebuilt;
        let old_buffers = buffers.install(new_buffers);

        let mut source_mapping = MigrationMapping::with_capacity(old_handles.len());
        let mut degraded_sources = Vec::new();
        for ((&old, &new), snapshot) in old_handles.iter().zip(&source_handles).zip(&snapshots) {
            source_mapping.insert(old, new);
            if !new_sources.restore(new, snapshot, &buffer_outcome.mapping, &mut buffers) {
                log::warn!("Source {old} came over degraded as {new}");
                degraded_sources.push(old);
            }
        }
        new_sources.adopt_lineage(&sources, source_mapping.clone());
        let old_sources = sources.install(new_sources);

        let resume: Vec<Handle> = playing
            .iter()
            .filter(|h| !degraded_sources.contains(h))
            .filter_map(|h| source_mapping.get(h).copied())
            .collect();
        sources.play_batch(&resume);

        listener.rebind(self.new_context.listener());
        if !listener.restore(&listener_snapshot) {
            log::warn!("Listener state was only partially restored");
        }

        // Sources go before the buffers they may still reference.
        if let Err(e) = self.old_context.make_current() {
            log::warn!("Releasing previous resources without their context: {e}");
        }
        drop(old_sources);
        drop(old_buffers);
        if let Err(e) = self.new_context.make_current() {
            log::error!("Failed to reactivate new context: {e}");
        }

        log::debug!(
            "migrated {} buffers and {} sources",
            buffer_outcome.mapping.len(),
            source_mapping.len()
        );
        Ok(MigrationReport {
            buffers: buffer_outcome.mapping,
            sources: source_mapping,
            degraded_buffers: buffer_outcome.degraded,
            degraded_sources,
        })
    }

    /// Build successor registries on the new context. Whatever was created
    /// is released on the new context if a step fails.
    fn rebuild(&self, sources: &SourceRegistry, buffers: &BufferRegistry) -> Result<Rebuilt, BackendError> {
        self.new_context.make_current()?;

        let mut new_buffers = BufferRegistry::new(self.new_context.buffers());
        new_buffers.initialize(self.buffer_batch)?;
        let buffer_outcome = new_buffers.inherit_collection(buffers)?;

        let mut new_sources = SourceRegistry::new(self.new_context.sources(), Arc::clone(self.buffers));
        new_sources.initialize(self.source_batch)?;
        let source_handles = new_sources.prepare_batch(sources.used().len())?;

        Ok(Rebuilt {
            buffers: new_buffers,
            buffer_outcome,
            sources: new_sources,
            source_handles,
        })
    }
}
