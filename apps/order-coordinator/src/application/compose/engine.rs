//! Compose Engine
//!
//! Combines outcome producers. A producer is a lazy stream of done events
//! that ends either cleanly or right after its first error. Both combinators
//! deliver exactly one terminal signal: the end of the stream, or one error
//! followed by the end.
//!
//! - `parallel`: every producer runs in its own Tokio task. The first error
//!   ends the composed stream; siblings keep running to completion and their
//!   later errors are dropped. A producer that panics has its panic resumed
//!   in the caller once the other producers finished, unless an error already
//!   ended the stream. Dropping the composed stream before its terminal
//!   signal aborts the producers.
//! - `sequential`: producer `i + 1` is only polled after producer `i` ended
//!   cleanly; an error ends the composition and later producers never start.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, future, ready};
use tokio::task::JoinHandle;

use super::params::{ComposeParams, ConcurrencyMode};
use crate::application::commands::{
    Command, CommandError, CommandExecutor, EventHandlers, execute_with_retries,
};
use crate::domain::order_execution::OrderEvent;

/// One item of a producer: a done event or the error that ended it.
pub type Outcome = Result<OrderEvent, CommandError>;

/// Lazy stream of outcomes.
pub type OutcomeStream = BoxStream<'static, Outcome>;

/// Combine `producers` according to `mode`.
pub fn compose(mode: ConcurrencyMode, producers: Vec<OutcomeStream>) -> OutcomeStream {
    match mode {
        ConcurrencyMode::Parallel => parallel(producers),
        ConcurrencyMode::Sequential => sequential(producers),
    }
}

/// Run all producers concurrently. Nothing starts before the first poll.
pub fn parallel(producers: Vec<OutcomeStream>) -> OutcomeStream {
    defer(move || {
        let (tx, rx) = mpsc::unbounded();
        let tasks = producers
            .into_iter()
            .map(|mut producer| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    while let Some(outcome) = producer.next().await {
                        // The composed stream may have ended already; keep
                        // driving this producer regardless.
                        let _ = tx.unbounded_send(outcome);
                    }
                })
            })
            .collect();
        ParallelOutcomes {
            rx,
            tasks,
            joined: 0,
            finished: false,
        }
        .boxed()
    })
}

struct ParallelOutcomes {
    rx: mpsc::UnboundedReceiver<Outcome>,
    tasks: Vec<JoinHandle<()>>,
    joined: usize,
    finished: bool,
}

impl Stream for ParallelOutcomes {
    type Item = Outcome;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Outcome>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if let Some(item) = ready!(this.rx.poll_next_unpin(cx)) {
            this.finished = item.is_err();
            return Poll::Ready(Some(item));
        }
        // Every sender is gone; a producer may have ended by panicking.
        while let Some(task) = this.tasks.get_mut(this.joined) {
            let joined = ready!(Pin::new(task).poll(cx));
            this.joined += 1;
            match joined {
                Err(err) if err.is_panic() => {
                    this.finished = true;
                    std::panic::resume_unwind(err.into_panic());
                }
                _ => {}
            }
        }
        this.finished = true;
        Poll::Ready(None)
    }
}

impl Drop for ParallelOutcomes {
    fn drop(&mut self) {
        if !self.finished {
            for task in &self.tasks {
                task.abort();
            }
        }
    }
}

/// Run producers one after another, stopping at the first error.
pub fn sequential(producers: Vec<OutcomeStream>) -> OutcomeStream {
    StopAfterError {
        inner: stream::iter(producers).flatten().boxed(),
        done: false,
    }
    .boxed()
}

/// Run `first`, then `second` if `first` ended cleanly.
pub fn concat(first: OutcomeStream, second: OutcomeStream) -> OutcomeStream {
    sequential(vec![first, second])
}

/// Build the producer only when it is first polled.
///
/// Use this for a step whose inputs are only known once the previous step
/// finished, such as reading a position after a merge.
pub fn defer<F>(build: F) -> OutcomeStream
where
    F: FnOnce() -> OutcomeStream + Send + 'static,
{
    stream::once(async move { build() }).flatten().boxed()
}

/// Drive `outcomes` to its terminal signal.
pub async fn run_to_completion(
    mut outcomes: OutcomeStream,
) -> Result<Vec<OrderEvent>, CommandError> {
    let mut events = Vec::new();
    while let Some(outcome) = outcomes.next().await {
        events.push(outcome?);
    }
    Ok(events)
}

/// Attach the hooks of `params` to `outcomes`.
///
/// `on_start` runs at the first poll, `on_error` with the terminal error,
/// `on_complete` at a clean end.
pub fn with_hooks(outcomes: OutcomeStream, params: &ComposeParams) -> OutcomeStream {
    Hooked {
        inner: outcomes,
        params: params.clone(),
        started: false,
        done: false,
    }
    .boxed()
}

/// Lazy producer for one command: retries per `params`, emits the done event
/// (nothing for a no-op) or the error, and runs the hooks of `params`.
pub fn command_outcome(
    executor: &CommandExecutor,
    command: Command,
    params: &ComposeParams,
    handlers: &EventHandlers,
) -> OutcomeStream {
    let executor = executor.clone();
    let handlers = handlers.clone();
    let policy = params.retry_policy().clone();

    let outcome = stream::once(async move {
        execute_with_retries(&executor, &command, &handlers, &policy).await
    })
    .filter_map(|result| future::ready(result.transpose()))
    .boxed();

    with_hooks(outcome, params)
}

struct StopAfterError {
    inner: OutcomeStream,
    done: bool,
}

impl Stream for StopAfterError {
    type Item = Outcome;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Outcome>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let item = ready!(this.inner.poll_next_unpin(cx));
        this.done = !matches!(item, Some(Ok(_)));
        Poll::Ready(item)
    }
}

struct Hooked {
    inner: OutcomeStream,
    params: ComposeParams,
    started: bool,
    done: bool,
}

impl Stream for Hooked {
    type Item = Outcome;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Outcome>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if !this.started {
            this.started = true;
            this.params.notify_start();
        }
        let item = ready!(this.inner.poll_next_unpin(cx));
        match &item {
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                this.done = true;
                this.params.notify_error(err);
            }
            None => {
                this.done = true;
                this.params.notify_complete();
            }
        }
        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::CommandKind;
    use crate::application::compose::ComposeOptions;
    use crate::domain::order_execution::{Order, OrderEventKind, OrderSide, OrderSnapshot};
    use crate::domain::shared::{InstrumentId, OrderId};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn done(id: &str) -> Outcome {
        let order = Order::new(
            OrderId::new(id),
            InstrumentId::new("EURUSD"),
            OrderSide::Buy,
            OrderSnapshot::created(id, dec!(0.1)),
        );
        Ok(OrderEvent::internal(order, OrderEventKind::CloseOk))
    }

    fn rejected(id: &str) -> Outcome {
        Err(CommandError::Rejected {
            kind: CommandKind::Close,
            order_id: OrderId::new(id),
            event_kind: OrderEventKind::CloseRejected,
        })
    }

    /// Producer that records it started, waits, then yields `outcome`.
    fn step(started: &Arc<AtomicUsize>, delay_ms: u64, outcome: Outcome) -> OutcomeStream {
        let started = Arc::clone(started);
        stream::once(async move {
            started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            outcome
        })
        .boxed()
    }

    fn ids(events: &[OrderEvent]) -> Vec<String> {
        events.iter().map(|e| e.order_id().to_string()).collect()
    }

    #[tokio::test]
    async fn sequential_runs_in_order() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = sequential(vec![
            step(&started, 5, done("a")),
            step(&started, 1, done("b")),
            step(&started, 0, done("c")),
        ]);

        let events = run_to_completion(outcomes).await.unwrap();

        assert_eq!(ids(&events), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sequential_failure_skips_later_steps() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = sequential(vec![
            step(&started, 0, done("a")),
            step(&started, 0, rejected("b")),
            step(&started, 0, done("c")),
        ]);

        let err = run_to_completion(outcomes).await.unwrap_err();

        assert_eq!(err.order_id(), Some(&OrderId::new("b")));
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sequential_error_is_the_last_item() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = sequential(vec![
            step(&started, 0, rejected("a")),
            step(&started, 0, done("b")),
        ]);

        let items: Vec<Outcome> = outcomes.collect().await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn empty_producers_complete() {
        assert!(run_to_completion(parallel(Vec::new())).await.unwrap().is_empty());
        assert!(run_to_completion(sequential(Vec::new())).await.unwrap().is_empty());
        let empty: OutcomeStream = stream::empty().boxed();
        let then = stream::iter(vec![done("x")]).boxed();
        let events = run_to_completion(sequential(vec![empty, then])).await.unwrap();
        assert_eq!(ids(&events), vec!["x"]);
    }

    #[tokio::test]
    async fn parallel_starts_all_producers() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = parallel(vec![
            step(&started, 20, done("slow")),
            step(&started, 1, done("fast")),
        ]);

        let events = run_to_completion(outcomes).await.unwrap();

        assert_eq!(ids(&events), vec!["fast", "slow"]);
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn parallel_is_lazy() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = parallel(vec![step(&started, 0, done("a"))]);
        tokio::task::yield_now().await;

        assert_eq!(started.load(Ordering::SeqCst), 0);
        drop(outcomes);
    }

    #[tokio::test]
    async fn parallel_failure_lets_siblings_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let sibling = {
            let finished = Arc::clone(&finished);
            stream::once(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                done("y")
            })
            .boxed()
        };

        let err = run_to_completion(parallel(vec![step(&started, 1, rejected("x")), sibling]))
            .await
            .unwrap_err();

        assert_eq!(err.order_id(), Some(&OrderId::new("x")));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn parallel_surfaces_only_first_error() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = parallel(vec![
            step(&started, 1, rejected("first")),
            step(&started, 20, rejected("second")),
        ]);

        let items: Vec<Outcome> = outcomes.collect().await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().err().and_then(|e| e.order_id()),
            Some(&OrderId::new("first"))
        );
    }

    #[tokio::test]
    async fn parallel_resumes_producer_panic() {
        let started = Arc::new(AtomicUsize::new(0));
        async fn exploding() -> Outcome {
            tokio::task::yield_now().await;
            panic!("handler failed")
        }
        let panicking = stream::once(exploding()).boxed();

        let run = tokio::spawn(run_to_completion(parallel(vec![
            step(&started, 5, done("a")),
            panicking,
        ])));
        let joined = run.await;

        assert!(joined.is_err_and(|e| e.is_panic()));
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_parallel_early_aborts_producers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let slow = {
            let finished = Arc::clone(&finished);
            stream::once(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                done("slow")
            })
            .boxed()
        };
        let mut outcomes = parallel(vec![slow]);

        let poll = tokio::time::timeout(Duration::from_millis(5), outcomes.next()).await;
        assert!(poll.is_err());
        drop(outcomes);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn defer_builds_at_first_poll() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let outcomes = defer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            stream::iter(vec![done("late")]).boxed()
        });

        assert_eq!(built.load(Ordering::SeqCst), 0);
        let events = run_to_completion(outcomes).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(ids(&events), vec!["late"]);
    }

    #[tokio::test]
    async fn concat_chains_dependent_steps() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = concat(
            step(&started, 0, rejected("cancel")),
            step(&started, 0, done("merge")),
        );

        assert!(run_to_completion(outcomes).await.is_err());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hooks_fire_once_per_terminal_signal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (start, complete, error) = (Arc::clone(&calls), Arc::clone(&calls), Arc::clone(&calls));
        let params = ComposeParams::new(ComposeOptions {
            on_start: Some(Arc::new(move || {
                start.fetch_add(1, Ordering::SeqCst);
            })),
            on_complete: Some(Arc::new(move || {
                complete.fetch_add(10, Ordering::SeqCst);
            })),
            on_error: Some(Arc::new(move |_| {
                error.fetch_add(100, Ordering::SeqCst);
            })),
            ..ComposeOptions::default()
        })
        .unwrap();

        let ok = with_hooks(stream::iter(vec![done("a"), done("b")]).boxed(), &params);
        run_to_completion(ok).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 11);

        let failed = with_hooks(stream::iter(vec![rejected("a"), done("b")]).boxed(), &params);
        let items: Vec<Outcome> = failed.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 112);
    }

    #[tokio::test]
    async fn compose_dispatches_on_mode() {
        let started = Arc::new(AtomicUsize::new(0));
        let outcomes = compose(
            ConcurrencyMode::Sequential,
            vec![step(&started, 0, rejected("a")), step(&started, 0, done("b"))],
        );

        assert!(run_to_completion(outcomes).await.is_err());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
