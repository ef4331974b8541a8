use crate::error::ReconcileError;
use crate::event_priority::DISCRETE_EVENT_PRIORITY;
use crate::host::HostAdapter;
use crate::reconciler::Reconciler;
use crate::root::RootId;

/// Roots with synchronous work, flushed from a microtask or `flush_sync`.
#[derive(Debug, Default)]
pub(crate) struct SyncQueue {
    roots: Vec<RootId>,
    is_flushing: bool,
}

impl SyncQueue {
    pub(crate) fn push(&mut self, root: RootId) {
        self.roots.push(root);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl<H: HostAdapter> Reconciler<H> {
    /// Runs every queued sync callback. Re-entrant calls are ignored.
    ///
    /// On error the failing entry is dropped, entries after it are kept,
    /// and the error is returned.
    pub(crate) fn flush_sync_callbacks(&mut self) -> Result<(), ReconcileError> {
        if self.sync_queue.is_flushing || self.sync_queue.is_empty() {
            return Ok(());
        }
        self.sync_queue.is_flushing = true;
        let runtime = self.runtime.clone();
        let _priority = runtime.scoped_update_priority(DISCRETE_EVENT_PRIORITY);

        let mut index = 0;
        let mut result = Ok(());
        // Entries pushed while flushing run in the same pass.
        while let Some(root) = self.sync_queue.roots.get(index).copied() {
            index += 1;
            if let Err(err) = self.perform_sync_work_on_root(root) {
                result = Err(err);
                break;
            }
        }
        self.sync_queue.roots.drain(..index);
        self.sync_queue.is_flushing = false;
        result
    }
}
