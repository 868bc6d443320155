//! Acoustic FSK modem for short text messages.
//!
//! Turns text into audible tone bursts and back over a speaker/microphone
//! pair: Hann-windowed single-tone FSK symbols between guard tones, a
//! Goertzel filter bank with an RMS energy gate on the receive side, and
//! START/END sentinel framing to delimit messages inside a continuously
//! captured stream. Best-effort, half-duplex; loss or corruption is
//! detected by framing, never repaired.

pub mod config;
pub mod error;
pub mod framing;
pub mod fsk;
pub mod ring;
pub mod session;

pub use config::{ConfigPatch, ModemConfig};
pub use error::{ModemError, Result};
pub use fsk::{Modulator, SymbolDetector};
pub use ring::RingBuffer;
pub use session::{AudioIo, ModemEvent, ModemSession, SessionState};
