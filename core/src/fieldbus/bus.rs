//! The bus service: frame transmit queue, receive scanner and health
//! counters.
//!
//! Transmission is paced by the fieldbus clock and is best-effort: a
//! failed write logs, drops the frame and moves on. The receive side
//! scans raw chunks for FLAG-delimited bodies and decodes them;
//! consecutive framing errors above a threshold raise a sticky degraded
//! indication that clears on the next good frame.

use std::cell::{Cell, RefCell};

use tracing::{debug, warn};

use crate::fieldbus::frames::DecodedFrame;
use crate::fieldbus::hdlc;
use crate::fieldbus::link::BusLink;

/// Consecutive framing errors before the bus reports degraded.
const DEGRADED_THRESHOLD: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusCounters {
    pub tx_frames: u64,
    pub tx_bytes: u64,
    pub rx_frames: u64,
    pub rx_bytes: u64,
    pub framing_errors: u64,
    pub dropped_writes: u64,
}

pub struct FieldBus {
    link: Box<dyn BusLink>,
    transmit_queue: RefCell<Vec<Vec<u8>>>,
    /// Bytes accumulated between FLAG delimiters.
    drydock: RefCell<Vec<u8>>,
    /// Set once the first FLAG has been seen; leading line noise before
    /// it is discarded rather than decoded.
    synced: Cell<bool>,
    counters: Cell<BusCounters>,
    consecutive_errors: Cell<u32>,
    degraded: Cell<bool>,
}

impl FieldBus {
    pub fn new(link: Box<dyn BusLink>) -> Self {
        Self {
            link,
            transmit_queue: RefCell::new(Vec::new()),
            drydock: RefCell::new(Vec::new()),
            synced: Cell::new(false),
            counters: Cell::new(BusCounters::default()),
            degraded: Cell::new(false),
            consecutive_errors: Cell::new(0),
        }
    }

    pub fn counters(&self) -> BusCounters {
        self.counters.get()
    }

    pub fn degraded(&self) -> bool {
        self.degraded.get()
    }

    /// Queue frame content (header + payload) for the next transmit
    /// pass. Encoding happens here so the queue holds wire bytes.
    pub fn enqueue(&self, content: &[u8]) {
        self.transmit_queue.borrow_mut().push(hdlc::encode(content));
    }

    /// Drain the transmit queue onto the link. Invoked on fieldbus
    /// ticks.
    pub fn transmit_pending(&self) {
        let frames: Vec<Vec<u8>> = self.transmit_queue.borrow_mut().drain(..).collect();
        let mut counters = self.counters.get();
        for frame in frames {
            match self.link.send(&frame) {
                Ok(()) => {
                    counters.tx_frames += 1;
                    counters.tx_bytes += frame.len() as u64;
                }
                Err(e) => {
                    counters.dropped_writes += 1;
                    warn!(error = %e, "bus write failed, frame dropped");
                }
            }
        }
        self.counters.set(counters);
    }

    /// Pull everything the link has received and decode complete frames.
    pub fn poll(&self) -> Vec<DecodedFrame> {
        let mut decoded = Vec::new();
        while let Some(chunk) = self.link.try_recv() {
            for byte in chunk {
                self.scan_byte(byte, &mut decoded);
            }
        }
        decoded
    }

    fn scan_byte(&self, byte: u8, decoded: &mut Vec<DecodedFrame>) {
        if byte != hdlc::FLAG {
            if self.synced.get() {
                self.drydock.borrow_mut().push(byte);
            }
            return;
        }
        // A FLAG both closes the current body and opens the next one, so
        // back-to-back frames sharing a delimiter stay in sync.
        self.synced.set(true);
        let body: Vec<u8> = self.drydock.borrow_mut().drain(..).collect();
        if body.is_empty() {
            return;
        }
        let mut counters = self.counters.get();
        match hdlc::decode(&body) {
            Ok(content) => {
                counters.rx_frames += 1;
                counters.rx_bytes += body.len() as u64;
                self.consecutive_errors.set(0);
                if self.degraded.replace(false) {
                    debug!("bus recovered");
                }
                let frame = DecodedFrame::parse(&content);
                debug!(
                    address = ?frame.address,
                    frame_type = ?frame.frame_type,
                    bytes = body.len(),
                    "frame received"
                );
                decoded.push(frame);
            }
            Err(e) => {
                counters.framing_errors += 1;
                let streak = self.consecutive_errors.get() + 1;
                self.consecutive_errors.set(streak);
                warn!(error = %e, streak, "framing error, frame discarded");
                if streak >= DEGRADED_THRESHOLD && !self.degraded.replace(true) {
                    warn!(streak, "bus degraded");
                }
            }
        }
        self.counters.set(counters);
    }
}
