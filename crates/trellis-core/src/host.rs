//! The seam between the reconciler and the tree it materializes.

use std::fmt;

use crate::element::Props;
use crate::error::HostError;
use crate::lane::Lane;

/// Creates and mutates host instances on behalf of the reconciler.
///
/// Render-phase methods (`create_*`, `append_initial_child`,
/// `finalize_initial_children`, `prepare_update`) only touch instances that
/// are not attached to the container yet. Everything visible happens in the
/// commit-phase methods, which run in a single uninterrupted pass bracketed by
/// [`prepare_for_commit`](Self::prepare_for_commit) and
/// [`reset_after_commit`](Self::reset_after_commit).
pub trait HostAdapter {
    /// Handle to a host element or text instance.
    type Instance: Clone + fmt::Debug + 'static;
    /// The surface a root renders into.
    type Container: 'static;
    /// Diff produced by `prepare_update` and applied by `commit_update`.
    type UpdatePayload: 'static;

    fn create_instance(&mut self, ty: &str, props: &Props) -> Result<Self::Instance, HostError>;

    fn create_text_instance(&mut self, text: &str) -> Result<Self::Instance, HostError>;

    fn append_initial_child(
        &mut self,
        parent: &Self::Instance,
        child: &Self::Instance,
    ) -> Result<(), HostError>;

    fn finalize_initial_children(
        &mut self,
        instance: &Self::Instance,
        ty: &str,
        props: &Props,
    ) -> Result<(), HostError>;

    /// Returns `None` when nothing needs to change.
    fn prepare_update(
        &self,
        instance: &Self::Instance,
        ty: &str,
        old_props: &Props,
        new_props: &Props,
    ) -> Option<Self::UpdatePayload>;

    /// Whether the host renders `props`' children itself as text content.
    fn should_set_text_content(&self, ty: &str, props: &Props) -> bool;

    /// Priority for updates that were not given one explicitly.
    fn current_event_priority(&self) -> Lane;

    fn append_child(
        &mut self,
        parent: &Self::Instance,
        child: &Self::Instance,
    ) -> Result<(), HostError>;

    fn append_child_to_container(
        &mut self,
        container: &Self::Container,
        child: &Self::Instance,
    ) -> Result<(), HostError>;

    fn insert_before(
        &mut self,
        parent: &Self::Instance,
        child: &Self::Instance,
        before: &Self::Instance,
    ) -> Result<(), HostError>;

    fn insert_in_container_before(
        &mut self,
        container: &Self::Container,
        child: &Self::Instance,
        before: &Self::Instance,
    ) -> Result<(), HostError>;

    fn remove_child(
        &mut self,
        parent: &Self::Instance,
        child: &Self::Instance,
    ) -> Result<(), HostError>;

    fn remove_child_from_container(
        &mut self,
        container: &Self::Container,
        child: &Self::Instance,
    ) -> Result<(), HostError>;

    fn commit_update(
        &mut self,
        instance: &Self::Instance,
        payload: Self::UpdatePayload,
        ty: &str,
        old_props: &Props,
        new_props: &Props,
    ) -> Result<(), HostError>;

    fn commit_text_update(
        &mut self,
        instance: &Self::Instance,
        old_text: &str,
        new_text: &str,
    ) -> Result<(), HostError>;

    fn prepare_for_commit(&mut self, _container: &Self::Container) {}

    fn reset_after_commit(&mut self, _container: &Self::Container) {}
}
