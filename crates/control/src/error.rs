// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("control channel handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("control channel closed before the first init event")]
    ClosedBeforeInit,
    #[error("control channel receiver dropped")]
    ReceiverDropped,
}
