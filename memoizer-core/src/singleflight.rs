use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// How a caller took part in a coalesced call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The caller ran the computation itself.
    Leader,
    /// The caller attached to a computation started by someone else.
    Follower,
}

enum CallState<T> {
    Running,
    Finished(T),
    /// The leader unwound before producing a value.
    Abandoned,
}

struct Call<T> {
    state: Mutex<CallState<T>>,
    done: Condvar,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(CallState::Running),
            done: Condvar::new(),
        }
    }

    /// Blocks until the call leaves the running state.
    ///
    /// Returns `None` if the leader abandoned the call.
    fn wait(&self) -> Option<T> {
        let mut state = self.state.lock();
        while matches!(*state, CallState::Running) {
            self.done.wait(&mut state);
        }
        match &*state {
            CallState::Finished(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn settle(&self, outcome: CallState<T>) {
        *self.state.lock() = outcome;
        self.done.notify_all();
    }
}

/// Call-coalescing group: at most one execution per key is in flight.
///
/// Callers that arrive while a call for the same key is running block on it
/// and receive a clone of its result instead of starting their own. Once the
/// call finishes its registration is dropped, so the next caller for the key
/// starts a fresh execution. Remembering results is the job of the layer
/// above (see [`Memoizer`](crate::Memoizer)).
///
/// # Thread Safety
///
/// The registry is a `parking_lot::Mutex` held only long enough to look up or
/// register a call. It is never held while the computation runs or while a
/// follower waits, so computations may freely use other keys of the same
/// group.
///
/// # Panics in the leader
///
/// If the leader's computation panics the panic continues unwinding into the
/// leader's caller. The call is marked abandoned, followers are woken, and
/// they re-enter the group; one of them becomes the new leader and runs its
/// own computation.
///
/// # Examples
///
/// ```
/// use memoizer_core::singleflight::{Group, Role};
///
/// let group = Group::new();
/// let (value, role) = group.call("answer", || 42);
/// assert_eq!(value, 42);
/// assert_eq!(role, Role::Leader);
/// assert_eq!(group.in_flight(), 0);
/// ```
pub struct Group<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

enum Slot<T> {
    Lead(Arc<Call<T>>),
    Join(Arc<Call<T>>),
}

impl<T: Clone> Group<T> {
    /// Creates a group with no calls in flight.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` for `key` unless a call for `key` is already running, in which
    /// case this blocks until that call finishes and returns its result.
    ///
    /// # Parameters
    ///
    /// * `key` - Identity of the call; callers with equal keys coalesce
    /// * `f` - The computation, executed only if this caller becomes leader
    ///
    /// # Returns
    ///
    /// The call's result together with the [`Role`] this caller played.
    ///
    /// # Deadlocks
    ///
    /// `f` must not call back into this group with the same `key`: it would
    /// wait on its own unfinished call.
    pub fn call<F>(&self, key: &str, f: F) -> (T, Role)
    where
        F: FnOnce() -> T,
    {
        loop {
            let call = match self.join_or_lead(key) {
                Slot::Lead(call) => return (self.lead(key, call, f), Role::Leader),
                Slot::Join(call) => call,
            };

            trace!(key, "waiting on in-flight call");
            if let Some(value) = call.wait() {
                return (value, Role::Follower);
            }
            debug!(key, "in-flight call abandoned by its leader, retrying");
        }
    }

    /// Number of calls currently running.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn join_or_lead(&self, key: &str) -> Slot<T> {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get(key) {
            return Slot::Join(Arc::clone(call));
        }
        let call = Arc::new(Call::new());
        calls.insert(key.to_owned(), Arc::clone(&call));
        Slot::Lead(call)
    }

    fn lead<F>(&self, key: &str, call: Arc<Call<T>>, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        debug!(key, "leading call");
        let mut guard = LeaderGuard {
            group: self,
            key,
            call,
            finished: false,
        };
        let value = f();
        guard.call.settle(CallState::Finished(value.clone()));
        guard.finished = true;
        value
    }

    fn deregister(&self, key: &str, call: &Arc<Call<T>>) {
        let mut calls = self.calls.lock();
        if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, call)) {
            calls.remove(key);
        }
    }
}

impl<T: Clone> Default for Group<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deregisters the leader's call on every exit path, marking it abandoned when
/// the computation unwound.
struct LeaderGuard<'a, T: Clone> {
    group: &'a Group<T>,
    key: &'a str,
    call: Arc<Call<T>>,
    finished: bool,
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(key = self.key, "leader unwound before finishing");
            self.call.settle(CallState::Abandoned);
        }
        self.group.deregister(self.key, &self.call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_single_call_leads() {
        let group = Group::new();
        let (value, role) = group.call("k", || "v".to_string());
        assert_eq!(value, "v");
        assert_eq!(role, Role::Leader);
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn test_sequential_calls_each_execute() {
        // The group only deduplicates concurrent calls; it does not remember.
        let group = Group::new();
        let runs = AtomicUsize::new(0);
        for _ in 0..3 {
            let (_, role) = group.call("k", || runs.fetch_add(1, Ordering::SeqCst));
            assert_eq!(role, Role::Leader);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_callers_share_one_execution() {
        let group = Arc::new(Group::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let leader = {
            let group = Arc::clone(&group);
            let runs = Arc::clone(&runs);
            thread::spawn(move || {
                group.call("shared", || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    99
                })
            })
        };

        entered_rx.recv().unwrap();
        assert_eq!(group.in_flight(), 1);

        let followers: Vec<_> = (0..4)
            .map(|_| {
                let group = Arc::clone(&group);
                let runs = Arc::clone(&runs);
                thread::spawn(move || {
                    group.call("shared", || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        -1
                    })
                })
            })
            .collect();

        // Give the followers time to attach before releasing the leader.
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert_eq!(leader.join().unwrap(), (99, Role::Leader));
        for follower in followers {
            assert_eq!(follower.join().unwrap(), (99, Role::Follower));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn test_different_keys_do_not_coalesce() {
        let group = Arc::new(Group::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["left", "right"]
            .into_iter()
            .map(|key| {
                let group = Arc::clone(&group);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    group.call(key, || {
                        // Both leaders must be running at the same time.
                        barrier.wait();
                        key.to_string()
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.contains(&("left".to_string(), Role::Leader)));
        assert!(results.contains(&("right".to_string(), Role::Leader)));
    }

    #[test]
    fn test_panicking_leader_hands_over_to_follower() {
        let group = Arc::new(Group::<u32>::new());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let leader = {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    group.call("flaky", || {
                        entered_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        panic!("leader failed");
                    })
                }))
                .is_err()
            })
        };

        entered_rx.recv().unwrap();
        let follower = {
            let group = Arc::clone(&group);
            thread::spawn(move || group.call("flaky", || 7))
        };

        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert!(leader.join().unwrap());
        // The follower retried and ran its own computation.
        assert_eq!(follower.join().unwrap(), (7, Role::Leader));
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn test_computation_may_use_other_keys() {
        let group = Group::new();
        let (value, _) = group.call("outer", || {
            let (inner, role) = group.call("inner", || 20);
            assert_eq!(role, Role::Leader);
            inner + 1
        });
        assert_eq!(value, 21);
    }
}
