//! Trailing-edge debounce for async operations.
//!
//! Calls made within `delay` of each other collapse into one invocation of
//! the wrapped operation, run `delay` after the last call with that call's
//! arguments. Every caller in the burst receives the same outcome.

use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{ChatError, Result};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

type Operation<A, R> = dyn Fn(A) -> BoxFuture<'static, Result<R>> + Send + Sync;

struct Pending<A, R> {
    generation: u64,
    args: Option<A>,
    waiters: Vec<oneshot::Sender<Result<R>>>,
}

pub struct Debouncer<A, R> {
    delay: Duration,
    op: Arc<Operation<A, R>>,
    pending: Arc<Mutex<Pending<A, R>>>,
}

impl<A, R> Debouncer<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F, Fut>(delay: Duration, op: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self {
            delay,
            op: Arc::new(move |args| -> BoxFuture<'static, Result<R>> { Box::pin(op(args)) }),
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                args: None,
                waiters: Vec::new(),
            })),
        }
    }

    /// Schedule a call with `args`, superseding any call still waiting out
    /// its quiet period. The arguments are recorded immediately; the
    /// returned future resolves once the collapsed call completes.
    pub fn call(&self, args: A) -> impl Future<Output = Result<R>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let generation = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.generation += 1;
            pending.args = Some(args);
            pending.waiters.push(tx);
            pending.generation
        };

        let pending = Arc::clone(&self.pending);
        let op = Arc::clone(&self.op);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let (args, waiters) = {
                let mut pending = pending.lock().unwrap_or_else(|e| e.into_inner());
                if pending.generation != generation {
                    return;
                }
                (pending.args.take(), std::mem::take(&mut pending.waiters))
            };
            let Some(args) = args else {
                return;
            };

            tracing::debug!(coalesced = waiters.len(), "debounced call firing");
            let outcome = op(args).await;
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        });

        async move {
            rx.await.unwrap_or_else(|_| {
                Err(ChatError::Remote {
                    status: None,
                    message: "debounced request dropped before completion".to_string(),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, Arc<Mutex<Vec<u32>>>, Debouncer<u32, u32>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (c, s) = (calls.clone(), seen.clone());
        let debouncer = Debouncer::new(DEFAULT_DELAY, move |n: u32| {
            c.fetch_add(1, Ordering::SeqCst);
            s.lock().unwrap().push(n);
            async move { Ok(n * 10) }
        });
        (calls, seen, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_call() {
        let (calls, seen, debouncer) = counting();

        let mut futures = Vec::new();
        for n in 1..=5 {
            futures.push(debouncer.call(n));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let results = futures_util::future::join_all(futures).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![5]);
        assert!(results.into_iter().all(|r| r == Ok(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_run_separately() {
        let (calls, seen, debouncer) = counting();

        assert_eq!(debouncer.call(1).await, Ok(10));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(debouncer.call(2).await, Ok(20));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let (calls, _, debouncer) = counting();
        let start = tokio::time::Instant::now();

        let first = debouncer.call(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = debouncer.call(2);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (a, b) = tokio::join!(first, second);
        assert_eq!((a, b), (Ok(20), Ok(20)));
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_reach_every_caller() {
        let debouncer: Debouncer<(), u32> = Debouncer::new(DEFAULT_DELAY, |_| async {
            Err(ChatError::Remote {
                status: Some(503),
                message: "busy".to_string(),
            })
        });

        let (a, b) = tokio::join!(debouncer.call(()), debouncer.call(()));
        assert!(matches!(a, Err(ChatError::Remote { status: Some(503), .. })));
        assert_eq!(a, b);
    }
}
