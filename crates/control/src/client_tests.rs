// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::net::TcpListener;

#[test]
fn reconnect_policy_default_matches_handle_defaults() {
    let policy = ReconnectPolicy::default();
    assert_eq!(policy.backoff_base, 2.0);
    assert_eq!(policy.min_retry_interval, Duration::from_secs(2));
}

/// Spins up a one-shot local WebSocket server that sends a single `init`
/// frame and then closes, and checks the client surfaces the decoded event.
#[tokio::test]
async fn delivers_decoded_init_event_from_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let frame = r#"{"event":"init","data":[{"model_id":"m1","state":"RUNNING","ip":"10.0.0.1","port":9000,"infos":{}}]}"#;
        ws.send(Message::Text(frame.to_string())).await.unwrap();
        // Keep the socket open briefly so the client has time to read it.
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    let url = format!("ws://{addr}/cluster/test");
    let mut client = ControlChannelClient::spawn(url, ReconnectPolicy::default());

    let event = tokio::time::timeout(Duration::from_secs(2), client.next_event())
        .await
        .expect("event should arrive before timeout")
        .expect("channel should still be open");

    match event {
        MembershipEvent::Init(records) => assert_eq!(records[0].model_id, "m1"),
        other => panic!("expected init event, got {other:?}"),
    }
}
