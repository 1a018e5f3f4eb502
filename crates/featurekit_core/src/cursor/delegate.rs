//! Uniform access to the cursor a decorator wraps.

/// Implemented by decorators that wrap exactly one inner cursor or writer.
///
/// Tooling uses this to walk a decorator chain, for example to find the
/// backend cursor underneath filtering and limiting layers.
pub trait Delegating {
    /// The wrapped cursor or writer.
    type Inner;

    /// Borrows the wrapped instance.
    fn delegate(&self) -> &Self::Inner;

    /// Mutably borrows the wrapped instance.
    fn delegate_mut(&mut self) -> &mut Self::Inner;
}
