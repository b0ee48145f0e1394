//! Transport seam under the bus service.
//!
//! [`SerialLink`] is the production link: a blocking reader thread feeds
//! raw chunks through a bounded channel consumed on the core task, which
//! is the only thread boundary in the controller. [`Loopback`] is the
//! in-memory link used by tests and the fuzz jig.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::rc::Rc;
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};

use tracing::{debug, warn};

use crate::error::BusError;

pub trait BusLink {
    /// Best-effort write of one encoded frame.
    fn send(&self, bytes: &[u8]) -> Result<(), BusError>;

    /// Drain one pending chunk of received bytes, if any.
    fn try_recv(&self) -> Option<Vec<u8>>;
}

/// Serial device link. The device is opened read/write; line parameters
/// (baud, framing) are expected to be configured on the tty beforehand.
pub struct SerialLink {
    writer: RefCell<File>,
    rx: Receiver<Vec<u8>>,
}

impl SerialLink {
    pub fn open(path: &str) -> Result<Self, BusError> {
        let open = |p: &str| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(p)
                .map_err(|source| BusError::Open {
                    path: p.to_string(),
                    source,
                })
        };
        let reader = open(path)?;
        let writer = open(path)?;
        let (tx, rx) = std::sync::mpsc::sync_channel::<Vec<u8>>(256);
        std::thread::Builder::new()
            .name("fieldbus-rx".into())
            .spawn(move || Self::read_loop(reader, tx))
            .map_err(|source| BusError::Open {
                path: path.to_string(),
                source,
            })?;
        debug!(path, "serial link open");
        Ok(Self {
            writer: RefCell::new(writer),
            rx,
        })
    }

    fn read_loop(mut reader: File, tx: SyncSender<Vec<u8>>) {
        let mut buffer = [0u8; 64];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    // Bounded queue: the wire may drop, so a full queue
                    // sheds the oldest traffic by dropping this chunk.
                    if tx.try_send(buffer[..n].to_vec()).is_err() {
                        warn!("fieldbus receive queue full, chunk dropped");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "serial read failed, receiver stopping");
                    break;
                }
            }
        }
    }
}

impl BusLink for SerialLink {
    fn send(&self, bytes: &[u8]) -> Result<(), BusError> {
        let mut writer = self.writer.borrow_mut();
        writer.write_all(bytes).map_err(BusError::Write)?;
        writer.flush().map_err(BusError::Write)
    }

    fn try_recv(&self) -> Option<Vec<u8>> {
        match self.rx.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// In-memory link pair: bytes sent on one end arrive at the other.
pub struct Loopback {
    outbound: Rc<RefCell<Vec<Vec<u8>>>>,
    inbound: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Loopback {
    /// Create both ends of a link.
    pub fn pair() -> (Loopback, Loopback) {
        let a = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::new(RefCell::new(Vec::new()));
        (
            Loopback {
                outbound: a.clone(),
                inbound: b.clone(),
            },
            Loopback {
                outbound: b,
                inbound: a,
            },
        )
    }
}

impl BusLink for Loopback {
    fn send(&self, bytes: &[u8]) -> Result<(), BusError> {
        self.outbound.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn try_recv(&self) -> Option<Vec<u8>> {
        let mut inbound = self.inbound.borrow_mut();
        if inbound.is_empty() {
            None
        } else {
            Some(inbound.remove(0))
        }
    }
}
