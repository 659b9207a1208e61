// ============================================================================
// MUTATION QUEUE - Serializes mutations that target the same entity id
// ============================================================================

use futures::lock::{Mutex, OwnedMutexGuard};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

struct Slot {
    lock: Arc<Mutex<()>>,
    holders: usize,
}

/// One FIFO lane per id. Mutations on different ids never wait on each other.
#[derive(Clone, Default)]
pub struct MutationQueue {
    slots: Rc<RefCell<HashMap<String, Slot>>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until every earlier mutation on `id` has released its permit
    pub async fn acquire(&self, id: &str) -> MutationPermit {
        let lock = {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(id.to_string()).or_insert_with(|| Slot {
                lock: Arc::new(Mutex::new(())),
                holders: 0,
            });
            slot.holders += 1;
            slot.lock.clone()
        };
        // Registered before the await so a cancelled wait still releases its place
        let ticket = Ticket {
            queue: self.clone(),
            id: id.to_string(),
        };

        let guard = lock.lock_owned().await;
        MutationPermit {
            _guard: guard,
            _ticket: ticket,
        }
    }

    /// Takes every lane in ascending id order. Two callers with overlapping id
    /// sets therefore never hold one lane each while waiting on the other's.
    pub async fn acquire_all(&self, ids: &BTreeSet<String>) -> Vec<MutationPermit> {
        let mut permits = Vec::with_capacity(ids.len());
        for id in ids {
            permits.push(self.acquire(id).await);
        }
        permits
    }

    /// Ids with a mutation running or waiting
    pub fn active_ids(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.slots.borrow().contains_key(id)
    }

    fn release(&self, id: &str) {
        let mut slots = self.slots.borrow_mut();
        if let Some(slot) = slots.get_mut(id) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                slots.remove(id);
            }
        }
    }
}

struct Ticket {
    queue: MutationQueue,
    id: String,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.queue.release(&self.id);
    }
}

/// Held for the whole optimistic mutation; dropping it lets the next one run
pub struct MutationPermit {
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;

    #[test]
    fn same_id_runs_in_order() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let queue = MutationQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (release_first, first_done) = oneshot::channel::<()>();

        {
            let (queue, log) = (queue.clone(), log.clone());
            spawner
                .spawn_local(async move {
                    let _permit = queue.acquire("3").await;
                    log.borrow_mut().push("first:start");
                    let _ = first_done.await;
                    log.borrow_mut().push("first:end");
                })
                .unwrap();
        }
        {
            let (queue, log) = (queue.clone(), log.clone());
            spawner
                .spawn_local(async move {
                    let _permit = queue.acquire("3").await;
                    log.borrow_mut().push("second:start");
                })
                .unwrap();
        }

        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["first:start"]);
        assert!(queue.is_busy("3"));

        release_first.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["first:start", "first:end", "second:start"]);
        assert_eq!(queue.active_ids(), 0);
    }

    #[test]
    fn different_ids_do_not_block() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let queue = MutationQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (_hold, never) = oneshot::channel::<()>();

        {
            let (queue, log) = (queue.clone(), log.clone());
            spawner
                .spawn_local(async move {
                    let _permit = queue.acquire("1").await;
                    log.borrow_mut().push("1");
                    let _ = never.await;
                })
                .unwrap();
        }
        {
            let (queue, log) = (queue.clone(), log.clone());
            spawner
                .spawn_local(async move {
                    let _permit = queue.acquire("2").await;
                    log.borrow_mut().push("2");
                })
                .unwrap();
        }

        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["1", "2"]);
        assert_eq!(queue.active_ids(), 1);
    }

    #[test]
    fn overlapping_sets_wait_instead_of_deadlocking() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let queue = MutationQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (release_first, first_done) = oneshot::channel::<()>();

        let ids = |list: &[&str]| list.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>();
        {
            let (queue, log, wanted) = (queue.clone(), log.clone(), ids(&["11", "10"]));
            spawner
                .spawn_local(async move {
                    let _permits = queue.acquire_all(&wanted).await;
                    log.borrow_mut().push("first");
                    let _ = first_done.await;
                })
                .unwrap();
        }
        {
            let (queue, log, wanted) = (queue.clone(), log.clone(), ids(&["10", "11"]));
            spawner
                .spawn_local(async move {
                    let _permits = queue.acquire_all(&wanted).await;
                    log.borrow_mut().push("second");
                })
                .unwrap();
        }

        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["first"]);
        assert!(queue.is_busy("10") && queue.is_busy("11"));

        release_first.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(queue.active_ids(), 0);
    }
}
