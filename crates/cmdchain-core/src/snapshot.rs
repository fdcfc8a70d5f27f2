//! Read-mostly registry cell.
//!
//! Readers take an immutable snapshot without locking. Writers serialize on a
//! mutex, clone the current table, mutate the clone, and publish it with a
//! single atomic swap. A resolution that loaded the old snapshot keeps using
//! it until it finishes.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Snapshot<T> {
    current: ArcSwap<T>,
    writer: Mutex<()>,
}

impl<T: Clone> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
            writer: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Apply `f` to a copy of the table and publish the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _guard = self.writer.lock();
        let mut next = T::clone(&self.current.load());
        let out = f(&mut next);
        self.current.store(Arc::new(next));
        out
    }

    /// Like [`Snapshot::update`], but publishes only when `f` succeeds.
    pub fn try_update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let _guard = self.writer.lock();
        let mut next = T::clone(&self.current.load());
        let out = f(&mut next)?;
        self.current.store(Arc::new(next));
        Ok(out)
    }
}

impl<T: Clone + Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn readers_keep_their_snapshot() {
        let cell = Snapshot::new(vec![1]);
        let before = cell.load();
        cell.update(|v| v.push(2));
        assert_eq!(*before, vec![1]);
        assert_eq!(*cell.load(), vec![1, 2]);
    }

    #[test]
    fn failed_updates_are_not_published() {
        let cell = Snapshot::new(vec![1]);
        let res: Result<(), &str> = cell.try_update(|v| {
            v.push(2);
            Err("rejected")
        });
        assert!(res.is_err());
        assert_eq!(*cell.load(), vec![1]);
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let cell = Arc::new(Snapshot::new(Vec::<usize>::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for j in 0..50 {
                        cell.update(|v| v.push(i * 100 + j));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cell.load().len(), 400);
    }
}
