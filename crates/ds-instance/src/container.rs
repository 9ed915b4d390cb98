/// Contract the owning container (the launcher's instance model) exposes to
/// its instances.
///
/// Everything is keyed by instance id (the root directory name) so the
/// association stays non-owning; an instance without a container simply skips
/// these calls.
pub trait InstanceContainer {
    /// The instance with `id` changed its display name.
    fn instance_renamed(&self, id: &str);

    /// Group the instance currently belongs to, if any.
    fn group_for(&self, id: &str) -> Option<String>;

    /// Assign the instance to `group`. An empty group name clears the
    /// assignment.
    fn set_group(&self, id: &str, group: &str);
}
