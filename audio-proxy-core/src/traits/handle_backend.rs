use crate::models::error::BackendError;

/// Opaque backend resource name.
pub type Handle = u32;

/// Allocation primitives a [`HandlePool`](crate::pool::handle_pool::HandlePool)
/// drives for one resource kind.
///
/// Implemented by every backend resource trait; the pool never calls any
/// other backend method.
pub trait HandleBackend: Send + Sync {
    /// Allocate `count` new unique handles.
    fn generate(&self, count: u32) -> Result<Vec<Handle>, BackendError>;

    /// Make `handle` reusable without releasing it. A reclaimed source is
    /// stopped, unbound and back to its default properties.
    fn reclaim(&self, handle: Handle);

    /// Release the backend resources behind `handles` for good.
    fn delete(&self, handles: &[Handle]);
}
