//! Background prefetching over a bounded channel.

use crate::common::*;
use tokio::sync::mpsc;

/// Splits a stream into a producer future and a blocking consumer iterator.
///
/// The producer forwards items in stream order into a channel holding at
/// most `depth` items, so it runs ahead of the consumer by that many items.
/// Spawn the producer on a tokio runtime and drain the consumer from a
/// thread that is allowed to block. The producer stops after forwarding
/// an error or once the consumer is dropped.
pub fn prefetch<S, T>(
    stream: S,
    depth: usize,
) -> (impl Future<Output = Result<()>> + Send + 'static, Prefetched<T>)
where
    S: 'static + Stream<Item = Result<T>> + Send,
    T: 'static + Send,
{
    let (tx, rx) = mpsc::channel(depth.max(1));

    let producer = async move {
        let mut stream = Box::pin(stream);

        while let Some(result) = stream.next().await {
            let is_err = result.is_err();

            // the consumer reports its own error when it quits early
            if tx.send(result).await.is_err() {
                debug!("the consumer is closed, stop prefetching");
                break;
            }

            // the consumer aborts on the error
            if is_err {
                break;
            }
        }

        Fallible::Ok(())
    };

    (producer, Prefetched { rx })
}

/// The consumer side of [prefetch].
#[derive(Debug)]
pub struct Prefetched<T> {
    rx: mpsc::Receiver<Result<T>>,
}

impl<T> Iterator for Prefetched<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.blocking_recv()
    }
}
