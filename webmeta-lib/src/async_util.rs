//! Driving a future while draining the events it emits.
//!
//! Sync runs report progress through channels; frontends render those
//! events while the operation is still running and pick up the stragglers
//! after it returns.

use std::future::Future;

use tokio::sync::{broadcast, mpsc};

/// Common face of the channel receivers a frontend may be handed.
#[allow(async_fn_in_trait)]
pub trait EventReceiver<E> {
    /// Next event, or `None` once no more can arrive.
    async fn recv(&mut self) -> Option<E>;

    /// An event that is already queued, without waiting.
    fn try_recv(&mut self) -> Option<E>;
}

impl<E> EventReceiver<E> for mpsc::UnboundedReceiver<E> {
    async fn recv(&mut self) -> Option<E> {
        mpsc::UnboundedReceiver::recv(self).await
    }

    fn try_recv(&mut self) -> Option<E> {
        mpsc::UnboundedReceiver::try_recv(self).ok()
    }
}

impl<E: Clone> EventReceiver<E> for broadcast::Receiver<E> {
    async fn recv(&mut self) -> Option<E> {
        loop {
            match broadcast::Receiver::recv(self).await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("event receiver lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn try_recv(&mut self) -> Option<E> {
        loop {
            match broadcast::Receiver::try_recv(self) {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Run `task` to completion, handing every event from `events` to
/// `on_event`, and return the task's output.
///
/// Events the task queued before finishing are delivered before returning.
/// The channel does not have to close: long-lived senders (a registry's
/// progress channel) are fine.
pub async fn run_with_events<F, E, Rx>(
    task: F,
    mut events: Rx,
    mut on_event: impl FnMut(E),
) -> F::Output
where
    F: Future,
    Rx: EventReceiver<E> + Unpin,
{
    tokio::pin!(task);
    let mut seen: u64 = 0;

    let output = loop {
        tokio::select! {
            output = &mut task => break Some(output),
            event = events.recv() => match event {
                Some(e) => {
                    seen += 1;
                    on_event(e);
                }
                None => break None,
            },
        }
    };

    let Some(output) = output else {
        log::debug!("run_with_events: channel closed after {} events", seen);
        return task.await;
    };

    while let Some(e) = events.try_recv() {
        seen += 1;
        on_event(e);
    }
    log::debug!("run_with_events: {} events delivered", seen);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_sent_before_completion_are_delivered() {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = async move {
            for i in 0..3 {
                tx.send(i).unwrap();
                tokio::task::yield_now().await;
            }
            "done"
        };

        let mut received = Vec::new();
        let output = run_with_events(task, rx, |e| received.push(e)).await;
        assert_eq!(output, "done");
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn open_channel_does_not_block_the_result() {
        let (tx, rx) = broadcast::channel(16);
        let sender = tx.clone();
        let task = async move {
            sender.send("a".to_string()).unwrap();
            sender.send("b".to_string()).unwrap();
            42
        };

        let mut received = Vec::new();
        let output = run_with_events(task, rx, |e: String| received.push(e)).await;
        assert_eq!(output, 42);
        assert_eq!(received, vec!["a", "b"]);
        // `tx` is still alive here.
        drop(tx);
    }
}
