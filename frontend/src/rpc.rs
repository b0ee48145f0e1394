//! Line-delimited JSON RPC server.
//!
//! One task per connection; a client failure tears down only that
//! connection. `get_state_stream` turns the connection into a push
//! stream: one snapshot per controller time tick until the client drops.

use std::rc::Rc;

use atsc_core::prelude::Controller;
use atsc_core::rpc::{Request, Response, StateSnapshot, StreamSelector};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

pub async fn serve(listener: TcpListener, controller: Rc<Controller>) {
    let shutdown = controller.shutdown_event();
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "RPC client connected");
                        tokio::task::spawn_local(handle(stream, controller.clone()));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
        }
    }
}

async fn handle(stream: TcpStream, controller: Rc<Controller>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let shutdown = controller.shutdown_event();

    loop {
        let line = tokio::select! {
            _ = shutdown.wait() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(&line) {
            Ok(Request::GetStateStream { selector }) => {
                stream_state(&mut write, &controller, selector).await;
                break;
            }
            Ok(request) => {
                let response = controller.dispatch(&request);
                if write_line(&mut write, &response).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let response = Response::Error {
                    message: format!("bad request: {e}"),
                };
                if write_line(&mut write, &response).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("RPC client disconnected");
}

async fn stream_state(
    write: &mut OwnedWriteHalf,
    controller: &Rc<Controller>,
    selector: StreamSelector,
) {
    let mut updates = controller.snapshot_stream();
    let shutdown = controller.shutdown_event();
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = select_sections(updates.borrow_and_update().clone(), selector);
                if write_line(write, &Response::Snapshot(snapshot)).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Trim a full snapshot down to the sections the subscriber asked for.
fn select_sections(mut snapshot: StateSnapshot, selector: StreamSelector) -> StateSnapshot {
    if !selector.runtime_info {
        snapshot.runtime_info = None;
    }
    if !selector.field_outputs {
        snapshot.field_outputs = None;
    }
    if !selector.signals {
        snapshot.signals = None;
    }
    snapshot
}

async fn write_line(write: &mut OwnedWriteHalf, response: &Response) -> std::io::Result<()> {
    let mut payload = serde_json::to_vec(response).map_err(std::io::Error::other)?;
    payload.push(b'\n');
    write.write_all(&payload).await
}
