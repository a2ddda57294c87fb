use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use gitgrove_core::{Msg, PROTOCOL_VERSION};
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::driver::Control;

/// Full frames of large graphs exceed the codec's 8 MiB default.
const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
enum Route {
    Reply(Msg),
    Control(Control),
    Ignore,
}

fn route(msg: Msg) -> Route {
    match msg {
        Msg::Ping => Route::Reply(Msg::Pong),
        Msg::Seek { time_ms } => Route::Control(Control::Seek(time_ms)),
        Msg::Reset => Route::Control(Control::Reset),
        Msg::Settings { settings } => Route::Control(Control::Settings(settings)),
        Msg::SetSpeed { speed } => Route::Control(Control::SetSpeed(speed)),
        Msg::Pause { paused } => Route::Control(Control::Pause(paused)),
        Msg::Hello { .. } | Msg::Frame { .. } | Msg::Stats { .. } | Msg::Pong => Route::Ignore,
    }
}

fn encode(msg: &Msg) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(msg)?)
}

pub async fn run(
    sock_path: &Path,
    bus_tx: broadcast::Sender<Msg>,
    control_tx: mpsc::Sender<Control>,
) -> Result<()> {
    let listener = UnixListener::bind(sock_path)
        .with_context(|| format!("binding {}", sock_path.display()))?;
    tracing::info!(socket = %sock_path.display(), "gitgrove-agent listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let frames = bus_tx.subscribe();
        let control_tx = control_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_viewer(stream, frames, control_tx).await {
                tracing::debug!(error = %err, "viewer disconnected");
            }
        });
    }
}

async fn serve_viewer(
    stream: UnixStream,
    mut frames: broadcast::Receiver<Msg>,
    control_tx: mpsc::Sender<Control>,
) -> Result<()> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    let mut framed = Framed::new(stream, codec);

    // Expect Hello first
    match framed.next().await {
        Some(Ok(bytes)) => match serde_json::from_slice::<Msg>(&bytes)? {
            Msg::Hello { version } => tracing::info!(%version, "viewer connected"),
            other => anyhow::bail!("expected Hello, got {:?}", std::mem::discriminant(&other)),
        },
        Some(Err(err)) => return Err(err.into()),
        None => return Ok(()),
    }

    let hello = Msg::Hello {
        version: PROTOCOL_VERSION.to_string(),
    };
    framed.send(tokio_util::bytes::Bytes::from(encode(&hello)?)).await?;

    loop {
        tokio::select! {
            received = framed.next() => {
                let Some(bytes) = received else {
                    tracing::info!("viewer closed the connection");
                    return Ok(());
                };
                let bytes = bytes?;
                let msg: Msg = match serde_json::from_slice(&bytes) {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping malformed viewer message");
                        continue;
                    }
                };
                match route(msg) {
                    Route::Reply(reply) => framed.send(tokio_util::bytes::Bytes::from(encode(&reply)?)).await?,
                    Route::Control(control) => {
                        if control_tx.send(control).await.is_err() {
                            return Ok(());
                        }
                    }
                    Route::Ignore => tracing::debug!("ignoring viewer message"),
                }
            }
            outgoing = frames.recv() => match outgoing {
                Ok(msg) => framed.send(tokio_util::bytes::Bytes::from(encode(&msg)?)).await?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "viewer lagging, frames dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}
