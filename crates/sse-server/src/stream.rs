//! Response body for `text/event-stream` subscriptions.
//!
//! Frames from the hub are forwarded unchanged. While the subscription is
//! idle a `:keepalive` comment is written every interval so intermediaries
//! keep the connection open. The stream ends when the hub closes the queue;
//! dropping it (client gone) drops the [`Subscription`], which unregisters
//! the connection.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use metrics::counter;
use sse_hub::Subscription;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::metrics::KEEPALIVES_SENT_TOTAL;

/// SSE comment frame sent on idle streams.
pub const KEEPALIVE_FRAME: &[u8] = b":keepalive\n\n";

/// Turn a subscription into a response body stream.
///
/// `keepalive` of `None` disables keepalive comments.
pub fn event_stream(
    mut sub: Subscription,
    keepalive: Option<Duration>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let Some(period) = keepalive else {
            while let Some(frame) = sub.next().await {
                yield Ok(frame);
            }
            debug!(conn_id = %sub.id(), "event stream closed");
            return;
        };

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let frame = tokio::select! {
                frame = sub.next() => match frame {
                    Some(frame) => {
                        ticker.reset();
                        frame
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    counter!(KEEPALIVES_SENT_TOTAL).increment(1);
                    Bytes::from_static(KEEPALIVE_FRAME)
                }
            };
            yield Ok(frame);
        }
        debug!(conn_id = %sub.id(), "event stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sse_hub::{Hub, HubConfig, Message};

    #[tokio::test]
    async fn forwards_frames_and_ends_on_shutdown() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let sub = hub.subscribe("/chat").await.unwrap();
        let stream = event_stream(sub, None);
        futures::pin_mut!(stream);

        hub.broadcast(Message::new("/chat", "hi")).await.unwrap();
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"data: hi\n\n");

        hub.shutdown().await;
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stream_emits_keepalive() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let sub = hub.subscribe("/chat").await.unwrap();
        let stream = event_stream(sub, Some(Duration::from_secs(15)));
        futures::pin_mut!(stream);

        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], KEEPALIVE_FRAME);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_interleave_with_keepalive() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let sub = hub.subscribe("/chat").await.unwrap();
        let stream = event_stream(sub, Some(Duration::from_secs(15)));
        futures::pin_mut!(stream);

        hub.broadcast(Message::new("/chat", "one").with_event("greeting"))
            .await
            .unwrap();
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"event: greeting\ndata: one\n\n");

        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], KEEPALIVE_FRAME);

        hub.shutdown().await;
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_stream_unregisters() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let sub = hub.subscribe("/chat").await.unwrap();
        let stream = event_stream(sub, Some(Duration::from_secs(15)));
        assert_eq!(hub.status().await.unwrap().connection_count(), 1);

        drop(stream);
        assert_eq!(hub.status().await.unwrap().connection_count(), 0);
    }
}
