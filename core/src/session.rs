use crate::config::{ConfigPatch, ModemConfig};
use crate::error::{ModemError, Result};
use crate::framing;
use crate::fsk::{Modulator, SymbolDetector};
use crate::ring::RingBuffer;
use log::{debug, trace};
use std::collections::VecDeque;

/// Ring capacity as a multiple of one symbol's sample count.
pub const RING_WINDOWS: usize = 64;

/// Bound on the decoded-byte queue scanned for frames; oldest bytes are
/// evicted first, so an unterminated frame eventually falls off the end
/// without ever surfacing an error.
pub const BYTE_QUEUE_CAPACITY: usize = 512;

/// Host-owned audio endpoints. The session drives acquisition and playback
/// through this seam so the decode loop itself stays a pure step function;
/// real devices, WAV files, and test stubs all plug in here.
pub trait AudioIo {
    /// Acquire the capture device. A denial or missing device is reported
    /// as `ModemError::PermissionDenied`.
    fn open_capture(&mut self) -> Result<()>;

    /// Release the capture device.
    fn close_capture(&mut self);

    /// Resume the output if suspended and schedule one-shot playback at the
    /// given gain. Must return once playback is scheduled, not when it
    /// completes.
    fn play(&mut self, samples: &[f32], gain: f32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
}

/// Tagged event variants delivered to whatever replaces the UI layer.
#[derive(Debug)]
pub enum ModemEvent {
    /// One decoded message payload.
    Message(String),
    /// Human-readable lifecycle notice.
    Status(String),
    /// Runtime failure that did not terminate the session.
    Error(ModemError),
}

/// Half-duplex acoustic modem session.
///
/// Owns the configuration, ring decode buffer and bit/byte accumulators.
/// The host drives it: captured PCM goes in through [`advance`], which
/// walks the ring in symbol-length windows, assembles detected symbols
/// into bytes and scans them for frames. Local playback picked up by the
/// open microphone re-enters the loop as ordinary input; that
/// self-interference is a known limitation of the half-duplex design.
///
/// [`advance`]: ModemSession::advance
pub struct ModemSession<IO> {
    io: IO,
    config: ModemConfig,
    modulator: Modulator,
    detector: SymbolDetector,
    state: SessionState,
    ring: RingBuffer,
    scan_offset: usize,
    bit_bucket: u32,
    bit_count: u32,
    byte_queue: VecDeque<u8>,
    pending: Vec<ModemEvent>,
}

impl<IO: AudioIo> ModemSession<IO> {
    pub fn new(config: ModemConfig, io: IO) -> Result<Self> {
        config.validate()?;
        let modulator = Modulator::new(&config);
        let detector = SymbolDetector::new(&config);
        let ring = RingBuffer::new(RING_WINDOWS * config.symbol_samples());
        Ok(Self {
            io,
            config,
            modulator,
            detector,
            state: SessionState::Idle,
            ring,
            scan_offset: 0,
            bit_bucket: 0,
            bit_count: 0,
            byte_queue: VecDeque::with_capacity(BYTE_QUEUE_CAPACITY),
            pending: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Acquire the capture device and enter `Listening`. On a permission
    /// failure the error propagates and the session stays `Idle`. Calling
    /// while already listening is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Listening {
            return Ok(());
        }
        self.io.open_capture()?;
        self.reset_decode_state();
        self.ring.clear();
        self.state = SessionState::Listening;
        debug!("session listening");
        self.pending.push(ModemEvent::Status("listening started".into()));
        Ok(())
    }

    /// Release the capture device and discard all decode state. Idempotent;
    /// calling while `Idle` does nothing.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.io.close_capture();
        self.reset_decode_state();
        self.ring.clear();
        self.state = SessionState::Idle;
        debug!("session idle");
        self.pending.push(ModemEvent::Status("listening stopped".into()));
    }

    /// Frame and synthesize `message`, then schedule one-shot playback at
    /// the configured amplitude. Fire-and-forget: returns once the backend
    /// accepts the waveform.
    pub fn send(&mut self, message: &str) -> Result<()> {
        let payload = message.as_bytes();
        if framing::contains_sentinel(payload) {
            return Err(ModemError::Encoding(
                "message contains a framing sentinel byte".into(),
            ));
        }
        let packet = framing::wrap(payload);
        let samples = self.modulator.packet_waveform(&packet);
        debug!(
            "sending {} payload bytes as {} samples",
            payload.len(),
            samples.len()
        );
        self.io.play(&samples, self.config.amplitude)
    }

    /// Merge a partial reconfiguration, revalidate, and recompute derived
    /// sample counts. Safe while listening; takes effect on the next scan.
    pub fn update_config(&mut self, patch: ConfigPatch) -> Result<()> {
        let next = patch.apply(&self.config);
        next.validate()?;
        self.config = next;
        self.modulator = Modulator::new(&self.config);
        self.detector = SymbolDetector::new(&self.config);
        let evicted = self.ring.set_capacity(RING_WINDOWS * self.config.symbol_samples());
        self.scan_offset = self.scan_offset.saturating_sub(evicted);
        Ok(())
    }

    /// One decode step: fold newly captured samples into the ring, walk it
    /// in non-overlapping symbol windows, and return every event produced
    /// (plus any queued lifecycle notices). Non-blocking; safe to call from
    /// any scheduler tick.
    ///
    /// On a completed frame the bit accumulator and byte queue are fully
    /// reset, so bytes decoded after that frame within the same scan are
    /// dropped: most-recent-wins delivery.
    pub fn advance(&mut self, captured: &[f32]) -> Vec<ModemEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.state != SessionState::Listening {
            return events;
        }

        let evicted = self.ring.push(captured);
        self.scan_offset = self.scan_offset.saturating_sub(evicted);

        let window_len = self.config.symbol_samples();
        let mut window = vec![0.0f32; window_len];
        while self.ring.copy_window(self.scan_offset, &mut window) {
            self.scan_offset += window_len;
            if let Some(symbol) = self.detector.detect(&window) {
                trace!("symbol {}", symbol);
                self.push_symbol(symbol);
            }
        }

        if let Some(payload) = framing::extract_frames(self.byte_queue.make_contiguous()).pop() {
            let text = String::from_utf8_lossy(&payload).into_owned();
            debug!("decoded frame of {} bytes", payload.len());
            self.reset_decode_state();
            events.push(ModemEvent::Message(text));
        }

        events
    }

    /// Fold one detected symbol into the little-endian bit accumulator,
    /// emitting bytes into the bounded byte queue as they complete.
    fn push_symbol(&mut self, symbol: u8) {
        self.bit_bucket |= (symbol as u32) << self.bit_count;
        self.bit_count += self.config.bits_per_symbol as u32;
        while self.bit_count >= 8 {
            let byte = (self.bit_bucket & 0xFF) as u8;
            self.bit_bucket >>= 8;
            self.bit_count -= 8;
            if self.byte_queue.len() == BYTE_QUEUE_CAPACITY {
                self.byte_queue.pop_front();
            }
            self.byte_queue.push_back(byte);
        }
    }

    fn reset_decode_state(&mut self) {
        self.bit_bucket = 0;
        self.bit_count = 0;
        self.byte_queue.clear();
    }
}
