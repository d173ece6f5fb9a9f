// src/shared.rs - Mask handle shared between threads

use std::sync::{Arc, RwLock};

use crate::errors::{MaskError, Result};
use crate::mask_trait::BooleanMask;

/// A mask behind a reader-writer lock.
///
/// Cloning the handle shares the same mask. Readers take a snapshot (bounds
/// and cells copied together under the read lock) and run heavy work on the
/// copy, so a writer changing the bounds never produces a torn read.
#[derive(Debug, Default)]
pub struct SharedMask<M> {
    inner: Arc<RwLock<M>>,
}

impl<M> Clone for SharedMask<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: BooleanMask> SharedMask<M> {
    pub fn new(mask: M) -> Self {
        Self {
            inner: Arc::new(RwLock::new(mask)),
        }
    }

    /// Copy of the current mask
    pub fn snapshot(&self) -> Result<M> {
        let guard = self.inner.read().map_err(|_| MaskError::Poisoned)?;
        Ok(guard.clone())
    }

    /// Mutate the mask under the write lock
    pub fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut M) -> R,
    {
        let mut guard = self.inner.write().map_err(|_| MaskError::Poisoned)?;
        Ok(f(&mut guard))
    }

    /// Swap in a new mask, returning the previous one
    pub fn replace(&self, mask: M) -> Result<M> {
        self.update(|current| std::mem::replace(current, mask))
    }

    /// Point count read under the lock without copying
    pub fn point_count(&self) -> Result<usize> {
        let guard = self.inner.read().map_err(|_| MaskError::Poisoned)?;
        Ok(guard.point_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds2D;
    use crate::mask2d::Mask2D;
    use std::thread;

    #[test]
    fn test_snapshot_is_independent() {
        let shared = SharedMask::new(Mask2D::filled(Bounds2D::new(0, 0, 2, 2)));
        let before = shared.snapshot().unwrap();
        shared.update(|m| m.set(0, 0, false)).unwrap();

        assert_eq!(before.point_count(), 4);
        assert_eq!(shared.point_count().unwrap(), 3);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let shared = SharedMask::new(Mask2D::empty());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let handle = shared.clone();
                thread::spawn(move || {
                    for j in 0..25 {
                        let dot = Mask2D::from_points(&[(i * 100 + j, i)]);
                        handle.update(|m| m.apply_union_into(&dot)).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let handle = shared.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let snap = handle.snapshot().unwrap();
                    assert_eq!(snap.cells().len(), snap.bounds().area());
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(shared.point_count().unwrap(), 100);
    }

    #[test]
    fn test_replace_returns_previous() {
        let shared = SharedMask::new(Mask2D::from_points(&[(1, 1)]));
        let old = shared.replace(Mask2D::empty()).unwrap();
        assert_eq!(old.point_count(), 1);
        assert!(shared.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let shared = SharedMask::new(Mask2D::empty());
        let handle = shared.clone();
        let _ = thread::spawn(move || {
            handle
                .update(|_| panic!("writer failed"))
                .unwrap();
        })
        .join();

        assert!(matches!(shared.snapshot(), Err(MaskError::Poisoned)));
    }
}
