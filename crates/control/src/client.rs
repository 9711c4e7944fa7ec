// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-channel client: a persistent WebSocket duplex stream carrying
//! `init`/`update` membership events in and `report_failure` reports out.

use crate::event::{decode_event, MembershipEvent};
use crate::Error;
use fleet_core::backoff_duration;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Connect-policy knobs shared with the worker handle's retry loop.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub backoff_base: f64,
    pub min_retry_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { backoff_base: 2.0, min_retry_interval: Duration::from_secs(2) }
    }
}

/// A running control-channel client.
///
/// Events are delivered over a bounded channel rather than a callback so the
/// receiver can apply backpressure and so the client's reconnect loop can
/// run entirely in its own supervised task.
pub struct ControlChannelClient {
    events_rx: mpsc::Receiver<MembershipEvent>,
    outbound_tx: mpsc::Sender<String>,
}

impl ControlChannelClient {
    /// Connect (with retry) and spawn the supervising task.
    ///
    /// `url` is the full control-channel WebSocket URL, e.g.
    /// `ws://host:port/cluster/{crunch_id}`.
    pub fn spawn(url: String, policy: ReconnectPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        tokio::spawn(run(url, policy, events_tx, outbound_rx));
        Self { events_rx, outbound_tx }
    }

    /// Await the next decoded membership event. Returns `None` once the
    /// client has been dropped (never on transient disconnects — those are
    /// retried internally).
    pub async fn next_event(&mut self) -> Option<MembershipEvent> {
        self.events_rx.recv().await
    }

    /// Enqueue a pre-encoded outbound frame (typically `report_failure`).
    pub async fn send(&self, frame: String) -> Result<(), Error> {
        self.outbound_tx.send(frame).await.map_err(|_| Error::ReceiverDropped)
    }

    /// A cheaply-cloneable handle for sending outbound frames, independent
    /// of the event receiver — lets the membership manager hold onto
    /// `report_failure` capability without owning the client itself.
    pub fn outbound_handle(&self) -> OutboundSender {
        OutboundSender(self.outbound_tx.clone())
    }
}

/// A cloneable sender for outbound control-channel frames.
#[derive(Clone)]
pub struct OutboundSender(mpsc::Sender<String>);

impl OutboundSender {
    pub async fn send(&self, frame: String) -> Result<(), Error> {
        self.0.send(frame).await.map_err(|_| Error::ReceiverDropped)
    }
}

async fn run(
    url: String,
    policy: ReconnectPolicy,
    events_tx: mpsc::Sender<MembershipEvent>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        tracing::info!(%url, attempt, "control channel: connecting");

        let stream = match tokio_tungstenite::connect_async(&url).await {
            Ok((stream, _response)) => {
                tracing::info!(%url, "control channel: connected");
                attempt = 0;
                stream
            }
            Err(e) => {
                let delay = backoff_duration(policy.backoff_base, policy.min_retry_interval, attempt);
                tracing::warn!(%url, error = %e, ?delay, "control channel: connect failed, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match decode_event(&text) {
                                Ok(event) => {
                                    if events_tx.send(event).await.is_err() {
                                        tracing::info!("control channel: receiver dropped, shutting down");
                                        return;
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "control channel: dropping unparseable frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "control channel: received close frame");
                            break;
                        }
                        Some(Ok(_)) => {} // ping/pong/binary — ignore
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "control channel: transport error");
                            break;
                        }
                        None => {
                            tracing::info!("control channel: stream ended");
                            break;
                        }
                    }
                }
                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        tracing::warn!(error = %e, "control channel: send failed");
                        break;
                    }
                }
            }
        }

        // Fall through to reconnect. The authoritative `init` that follows a
        // fresh connection replaces the live set, so no local cleanup is
        // needed here beyond looping.
        let delay = backoff_duration(policy.backoff_base, policy.min_retry_interval, 1);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
