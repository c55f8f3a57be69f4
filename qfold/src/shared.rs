use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

/// Shared ownership of a mutable IR object.
///
/// Ops, blocks, regions, and values all point at each other (an op points at
/// its parent block, a result points at its defining op, and so on), so the IR
/// is stored behind reference-counted locks.
///
/// # Example
///
/// ```
/// use qfold::shared::Shared;
///
/// let value = Shared::new(1.into());
/// assert_eq!(*value.try_read().unwrap(), 1);
/// ```
pub type Shared<T> = Arc<RwLock<T>>;

/// Short accessors for [Shared].
///
/// The passes are single-threaded, so a lock that is already taken means that
/// some code is holding a guard for too long. Waiting would hang forever, so
/// these methods panic instead.
///
/// # Example
///
/// ```
/// use qfold::shared::Shared;
/// use qfold::shared::SharedExt;
///
/// let value: Shared<i64> = Shared::new(1.into());
/// *value.wr() += 1;
/// assert_eq!(*value.rd(), 2);
/// ```
pub trait SharedExt<T: ?Sized> {
    /// Take a read guard.
    fn rd(&self) -> RwLockReadGuard<T>;
    /// Take a write guard.
    fn wr(&self) -> RwLockWriteGuard<T>;
    /// Whether `self` and `other` point to the same object.
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> SharedExt<T> for Shared<T> {
    fn rd(&self) -> RwLockReadGuard<T> {
        self.try_read().unwrap()
    }
    fn wr(&self) -> RwLockWriteGuard<T> {
        self.try_write().unwrap()
    }
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

#[test]
fn test_shared() {
    let a: Shared<i64> = Shared::new(42.into());
    let b = a.clone();
    let c: Shared<i64> = Shared::new(42.into());
    assert_eq!(*a.rd(), 42);
    assert!(a.same(&b));
    assert!(!a.same(&c));
    {
        let _guard = a.rd();
        // Nested reads are fine.
        assert_eq!(*b.rd(), 42);
    }
    *b.wr() = 1;
    assert_eq!(*a.rd(), 1);
}
