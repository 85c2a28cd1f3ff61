//! Coalescing of concurrent calls for the same key.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

/// Runs at most one call per key at a time.
///
/// The first caller for a key runs the operation; callers arriving while it
/// is in flight wait and receive a clone of its result. If the running call
/// is dropped before finishing, one of the waiters takes over.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, watch::Receiver<Option<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call for `key` is currently running.
    pub fn in_flight(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub async fn run<F, Fut>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let tx = loop {
            let mut rx = {
                let mut calls = self.lock();
                match calls.get(&key) {
                    Some(rx) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        calls.insert(key.clone(), rx);
                        break tx;
                    }
                }
            };
            if let Ok(done) = rx.wait_for(Option::is_some).await {
                if let Some(value) = done.as_ref() {
                    return value.clone();
                }
            }
            // The leader went away without a result; try to lead.
        };

        let guard = FlightGuard {
            flight: self,
            key,
            tx,
        };
        let value = f().await;
        guard.tx.send_replace(Some(value.clone()));
        value
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, watch::Receiver<Option<V>>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unregisters the key when the leading call finishes or is dropped.
struct FlightGuard<'a, K: Eq + Hash + Clone, V: Clone> {
    flight: &'a SingleFlight<K, V>,
    key: K,
    tx: watch::Sender<Option<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Drop for FlightGuard<'_, K, V> {
    fn drop(&mut self) {
        // Remove before `tx` drops so woken waiters never see a stale entry.
        self.flight.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{sleep, Duration};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_run() {
        let flight = SingleFlight::<u32, u32>::new();
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        let op = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            7
        };

        let (a, b, c) = tokio::join!(flight.run(1, op), flight.run(1, op), flight.run(1, op));
        assert_eq!((a, b, c), (7, 7, 7));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flight.in_flight(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_run_independently() {
        let flight = SingleFlight::<u32, u32>::new();
        let runs = AtomicUsize::new(0);
        let op = |v: u32| {
            let runs = &runs;
            move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                v
            }
        };

        let (a, b) = tokio::join!(flight.run(1, op(1)), flight.run(2, op(2)));
        assert_eq!((a, b), (1, 2));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn later_call_runs_again() {
        let flight = SingleFlight::<(), u32>::new();
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        for _ in 0..2 {
            flight
                .run((), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    1
                })
                .await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_takes_over_from_cancelled_leader() {
        let flight = SingleFlight::<(), u32>::new();
        let leader = flight.run((), || async {
            sleep(Duration::from_secs(60)).await;
            1
        });
        let waiter = async {
            sleep(Duration::from_millis(10)).await;
            flight.run((), || async { 2 }).await
        };

        // The leader is dropped when the timeout fires; the waiter then runs
        // its own operation.
        let (led, waited) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(20), leader),
            waiter
        );
        assert!(led.is_err());
        assert_eq!(waited, 2);
    }
}
