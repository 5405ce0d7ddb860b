//! IPC client using synchronous I/O over a Unix socket, or a named pipe on
//! Windows.

use anyhow::{anyhow, bail, Result};
use clipring_common::{
    decode_response, encode_request, ClipEntry, ErrorCode, ImageBlob, Request, Response,
};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
type Stream = std::os::unix::net::UnixStream;
#[cfg(windows)]
type Stream = std::fs::File;

/// IPC client for communicating with the daemon.
pub struct IpcClient {
    reader: BufReader<Stream>,
    writer: Stream,
}

/// Daemon diagnostics, as reported by `get_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonStatus {
    pub version: String,
    pub entry_count: u64,
    pub max_entries: u64,
    pub visible: bool,
    pub subscribers: u64,
}

/// A change pushed to a subscribed connection.
#[derive(Debug, Clone)]
pub enum Update {
    History(Vec<ClipEntry>),
    Visibility(bool),
}

impl IpcClient {
    /// Connect to the daemon.
    pub fn connect() -> Result<Self> {
        Self::connect_to(&clipring_common::socket_path())
    }

    /// Connect to a daemon listening on `path`.
    pub fn connect_to(path: &Path) -> Result<Self> {
        debug!("Connecting to daemon at {:?}", path);

        let stream = open_stream(path).map_err(|e| {
            anyhow!(
                "Failed to connect to daemon at {:?}: {}. Is clipring-daemon running?",
                path,
                e
            )
        })?;
        let writer = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Send a request and receive a response.
    fn request(&mut self, request: &Request) -> Result<Response> {
        self.send(request)?;
        self.read_response()?
            .ok_or_else(|| anyhow!("Daemon closed the connection"))
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        let encoded = encode_request(request)?;
        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Next response line, or `None` once the daemon hangs up.
    fn read_response(&mut self) -> Result<Option<Response>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(decode_response(line.trim().as_bytes())?))
    }

    /// Get clipboard history, newest first, optionally filtered by a
    /// case-insensitive text search.
    pub fn get_history(
        &mut self,
        limit: Option<usize>,
        search: Option<String>,
    ) -> Result<Vec<ClipEntry>> {
        match self.request(&Request::GetHistory { limit, search })? {
            Response::History { entries } => Ok(entries),
            other => Err(unexpected("Failed to get history", other)),
        }
    }

    /// Put text on the clipboard. Returns whether the clipboard accepted it.
    pub fn copy_text(&mut self, text: String) -> Result<bool> {
        match self.request(&Request::CopyText { text })? {
            Response::Copied { success } => Ok(success),
            other => Err(unexpected("Failed to copy text", other)),
        }
    }

    /// Put a PNG image on the clipboard. Returns whether the clipboard
    /// accepted it.
    pub fn copy_image(&mut self, data: ImageBlob) -> Result<bool> {
        match self.request(&Request::CopyImage { data })? {
            Response::Copied { success } => Ok(success),
            Response::Error {
                code: ErrorCode::InvalidImage,
                message,
            } => bail!("Not a usable PNG image: {}", message),
            other => Err(unexpected("Failed to copy image", other)),
        }
    }

    /// Clear all history.
    pub fn clear_history(&mut self) -> Result<()> {
        let response = self.request(&Request::ClearHistory)?;
        expect_ok("Failed to clear history", response)
    }

    /// Paste the history entry with `id` into the focused application.
    pub fn paste(&mut self, id: u64) -> Result<ClipEntry> {
        let entry = self
            .get_history(None, None)?
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| anyhow!("No history entry with id {}", id))?;

        let response = self.request(&Request::PasteItem {
            entry: entry.clone(),
        })?;
        expect_ok("Failed to paste entry", response)?;
        Ok(entry)
    }

    /// Show the history surface if hidden, hide it otherwise.
    pub fn toggle_visibility(&mut self) -> Result<()> {
        let response = self.request(&Request::ToggleVisibility)?;
        expect_ok("Failed to toggle visibility", response)
    }

    /// Hide the history surface.
    pub fn hide_surface(&mut self) -> Result<()> {
        let response = self.request(&Request::HideSurface)?;
        expect_ok("Failed to hide surface", response)
    }

    /// Get daemon status.
    pub fn status(&mut self) -> Result<DaemonStatus> {
        match self.request(&Request::GetStatus)? {
            Response::Status {
                version,
                entry_count,
                max_entries,
                visible,
                subscribers,
            } => Ok(DaemonStatus {
                version,
                entry_count,
                max_entries,
                visible,
                subscribers,
            }),
            other => Err(unexpected("Failed to get status", other)),
        }
    }

    /// Ping the daemon.
    pub fn ping(&mut self) -> Result<()> {
        match self.request(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected("Ping failed", other)),
        }
    }

    /// Turn this connection into a stream of pushed updates.
    pub fn subscribe(mut self) -> Result<Updates> {
        match self.request(&Request::Subscribe)? {
            Response::Subscribed => Ok(Updates { client: self }),
            other => Err(unexpected("Failed to subscribe", other)),
        }
    }
}

/// Updates from a subscribed connection. Ends when the daemon hangs up.
pub struct Updates {
    client: IpcClient,
}

impl Iterator for Updates {
    type Item = Result<Update>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let response = match self.client.read_response() {
                Ok(Some(response)) => response,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            match response {
                Response::HistoryChanged { entries } => return Some(Ok(Update::History(entries))),
                Response::Visibility { visible } => return Some(Ok(Update::Visibility(visible))),
                other => debug!("Ignoring unexpected push: {:?}", other),
            }
        }
    }
}

#[cfg(unix)]
fn open_stream(path: &Path) -> std::io::Result<Stream> {
    Stream::connect(path)
}

#[cfg(windows)]
fn open_stream(path: &Path) -> std::io::Result<Stream> {
    std::fs::OpenOptions::new().read(true).write(true).open(path)
}

fn expect_ok(context: &str, response: Response) -> Result<()> {
    match response {
        Response::Ok => Ok(()),
        other => Err(unexpected(context, other)),
    }
}

fn unexpected(context: &str, response: Response) -> anyhow::Error {
    match response {
        Response::Error { code, message } => anyhow!("{}: {} ({:?})", context, message, code),
        other => anyhow!("{}: unexpected response {:?}", context, other),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use clipring_common::{decode_request, encode_response, ClipPayload};
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::thread::JoinHandle;

    /// Accept one connection and answer each request with `respond`,
    /// writing every returned response in order.
    fn fake_daemon<F>(respond: F) -> (tempfile::TempDir, PathBuf, JoinHandle<Vec<Request>>)
    where
        F: Fn(&Request) -> Vec<Response> + Send + 'static,
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipring.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let mut seen = Vec::new();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                let request = decode_request(line.trim().as_bytes()).unwrap();
                for response in respond(&request) {
                    writer.write_all(&encode_response(&response).unwrap()).unwrap();
                }
                seen.push(request);
                line.clear();
            }
            seen
        });

        (dir, path, handle)
    }

    fn text_entry(id: u64, text: &str) -> ClipEntry {
        ClipEntry {
            id,
            payload: ClipPayload::Text(text.to_string()),
            created_at: 0,
        }
    }

    #[test]
    fn test_paste_looks_up_entry_by_id() {
        let (_dir, path, handle) = fake_daemon(|request| match request {
            Request::GetHistory { .. } => vec![Response::History {
                entries: vec![text_entry(2, "newer"), text_entry(1, "older")],
            }],
            _ => vec![Response::Ok],
        });

        let mut client = IpcClient::connect_to(&path).unwrap();
        let pasted = client.paste(1).unwrap();
        assert_eq!(pasted.payload.as_text(), Some("older"));
        assert!(client.paste(7).is_err());
        drop(client);

        let seen = handle.join().unwrap();
        assert!(matches!(
            &seen[1],
            Request::PasteItem { entry } if entry.id == 1
        ));
        // The missing id never reaches the daemon as a paste.
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_history_forwards_search_and_limit() {
        let (_dir, path, handle) = fake_daemon(|_| {
            vec![Response::History {
                entries: vec![text_entry(4, "Needle")],
            }]
        });

        let mut client = IpcClient::connect_to(&path).unwrap();
        let entries = client.get_history(Some(3), Some("needle".to_string())).unwrap();
        assert_eq!(entries.len(), 1);
        drop(client);

        let seen = handle.join().unwrap();
        assert!(matches!(
            &seen[0],
            Request::GetHistory { limit: Some(3), search: Some(search) } if search == "needle"
        ));
    }

    #[test]
    fn test_daemon_errors_become_client_errors() {
        let (_dir, path, _handle) = fake_daemon(|_| {
            vec![Response::error(ErrorCode::InvalidImage, "bad signature")]
        });

        let mut client = IpcClient::connect_to(&path).unwrap();
        let err = client
            .copy_image(ImageBlob::from_png(b"nope".to_vec()))
            .unwrap_err();
        assert!(err.to_string().contains("bad signature"));
    }

    #[test]
    fn test_subscription_yields_pushed_updates() {
        let (_dir, path, _handle) = fake_daemon(|request| match request {
            Request::Subscribe => vec![
                Response::Subscribed,
                Response::HistoryChanged {
                    entries: vec![text_entry(1, "pushed")],
                },
                Response::Pong,
                Response::Visibility { visible: true },
            ],
            _ => vec![],
        });

        let client = IpcClient::connect_to(&path).unwrap();
        let mut updates = client.subscribe().unwrap();

        match updates.next() {
            Some(Ok(Update::History(entries))) => assert_eq!(entries[0].id, 1),
            other => panic!("unexpected update: {:?}", other.map(|r| r.ok())),
        }
        assert!(matches!(updates.next(), Some(Ok(Update::Visibility(true)))));
    }

    #[test]
    fn test_connect_fails_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let err = IpcClient::connect_to(&dir.path().join("missing.sock"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Is clipring-daemon running?"));
    }
}
