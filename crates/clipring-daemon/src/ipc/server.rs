//! Local socket IPC server: a Unix domain socket, or a named pipe on
//! Windows.

use anyhow::Result;
use clipring_common::{decode_request, encode_response, ClipEntry, ErrorCode, Request, Response};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::{IpcEvent, SubscriptionStreams};
use crate::notify::Subscription;

/// Start the IPC server.
#[cfg(unix)]
pub async fn serve(socket_path: PathBuf, event_tx: mpsc::Sender<IpcEvent>) -> Result<()> {
    use tokio::net::UnixListener;

    // Remove existing socket if present
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    // Create parent directory if needed
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)?;
    info!("IPC server listening on {:?}", socket_path);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => spawn_client(stream, event_tx.clone()),
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Start the IPC server on the named pipe at `pipe_path`.
#[cfg(windows)]
pub async fn serve(pipe_path: PathBuf, event_tx: mpsc::Sender<IpcEvent>) -> Result<()> {
    use tokio::net::windows::named_pipe::ServerOptions;

    let mut server = ServerOptions::new()
        .first_pipe_instance(true)
        .create(&pipe_path)?;
    info!("IPC server listening on {:?}", pipe_path);

    loop {
        if let Err(e) = server.connect().await {
            error!("Failed to accept connection: {}", e);
            server = ServerOptions::new().create(&pipe_path)?;
            continue;
        }
        // A fresh instance must exist before the connected one is handed
        // off, or clients connecting in between get "pipe busy".
        let connected = std::mem::replace(&mut server, ServerOptions::new().create(&pipe_path)?);
        spawn_client(connected, event_tx.clone());
    }
}

fn spawn_client<S>(stream: S, event_tx: mpsc::Sender<IpcEvent>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = handle_client(stream, event_tx).await {
            debug!("Client connection ended: {}", e);
        }
    });
}

async fn handle_client<S>(stream: S, event_tx: mpsc::Sender<IpcEvent>) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // Client disconnected
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let request = match decode_request(line.trim().as_bytes()) {
            Ok(req) => req,
            Err(e) => {
                let response =
                    Response::error(ErrorCode::InvalidRequest, format!("Invalid request: {}", e));
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        debug!("Received request: {:?}", request);

        if matches!(request, Request::Subscribe) {
            return stream_updates(reader, writer, event_tx).await;
        }

        // Send request to main loop and wait for response
        let (response_tx, response_rx) = oneshot::channel();
        let event = IpcEvent::Request {
            request,
            response_tx,
        };

        if event_tx.send(event).await.is_err() {
            // Main loop shut down
            break;
        }

        let response = match response_rx.await {
            Ok(resp) => resp,
            Err(_) => Response::error(
                ErrorCode::InternalError,
                "Internal error: response channel closed",
            ),
        };

        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

/// Push history and visibility changes until the client disconnects.
async fn stream_updates<R, W>(
    reader: BufReader<R>,
    mut writer: W,
    event_tx: mpsc::Sender<IpcEvent>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (reply, reply_rx) = oneshot::channel();
    if event_tx.send(IpcEvent::Subscribe { reply }).await.is_err() {
        return Ok(());
    }
    let Ok(streams) = reply_rx.await else {
        return Ok(());
    };

    let id = streams.history.id;
    debug!("Client subscribed ({:?})", id);
    let result = forward_updates(reader, &mut writer, streams).await;

    let _ = event_tx.send(IpcEvent::Unsubscribe { id }).await;
    result
}

async fn forward_updates<R, W>(
    mut reader: BufReader<R>,
    writer: &mut W,
    streams: SubscriptionStreams,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let SubscriptionStreams {
        history: Subscription { mut updates, .. },
        mut visibility,
    } = streams;

    write_response(writer, &Response::Subscribed).await?;

    // Anything the client sends after subscribing is ignored.
    let mut discard = String::new();
    loop {
        let response = tokio::select! {
            update = updates.recv() => {
                // The notifier drops subscribers that fall too far behind.
                let Some(snapshot) = update else {
                    debug!("Subscription ended by the daemon");
                    break;
                };
                Response::HistoryChanged {
                    entries: snapshot.iter().map(|entry| ClipEntry::clone(entry)).collect(),
                }
            }
            changed = visibility.changed() => {
                if changed.is_err() {
                    break;
                }
                Response::Visibility {
                    visible: *visibility.borrow_and_update(),
                }
            }
            read = reader.read_line(&mut discard) => {
                if read? == 0 {
                    break;
                }
                discard.clear();
                continue;
            }
        };

        write_response(writer, &response).await?;
    }

    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_response(response)?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
