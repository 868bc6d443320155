use crate::config::ModemConfig;
use std::f32::consts::PI;

// Single-tone FSK over a speaker/microphone pair.
//
// Each symbol is one fixed-duration tone burst at
//   base_frequency + symbol * frequency_step
// with a full-burst Hann envelope to suppress spectral leakage at symbol
// boundaries. Detection is non-coherent: a Goertzel filter per candidate
// frequency, gated by slice RMS so silence never reaches the filter bank.

/// Fraction of the slice's total energy-sample product the winning Goertzel
/// bin must hold before a detection is accepted. A single dominant windowed
/// tone concentrates roughly a third of that product in its own bin; guard
/// tone spill-over and windows straddling two symbols stay far below it.
const MIN_TONE_FRACTION: f32 = 0.1;

/// Symmetric Hann window value for sample `i` of `n`.
fn hann(i: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    let x = i as f32 / (n - 1) as f32;
    0.5 * (1.0 - (2.0 * PI * x).cos())
}

/// Root-mean-square level of a sample slice. Exactly 0.0 for silence.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Single-bin power estimate at `freq` over the whole slice.
///
/// The bin index is quantized to k = round(N * freq / rate), then the
/// second-order recurrence q0 = 2cos(w)*q1 - q2 + sample runs once over the
/// slice and the power is (q1 - q2*cos w)^2 + (q2*sin w)^2. O(N) per call,
/// no full transform.
pub fn goertzel_power(samples: &[f32], freq: f32, sample_rate: u32) -> f32 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }

    let k = (n as f32 * freq / sample_rate as f32).round();
    let omega = 2.0 * PI * k / n as f32;
    let coeff = 2.0 * omega.cos();

    let mut q1 = 0.0f32;
    let mut q2 = 0.0f32;
    for &sample in samples {
        let q0 = coeff * q1 - q2 + sample;
        q2 = q1;
        q1 = q0;
    }

    let real = q1 - q2 * omega.cos();
    let imag = q2 * omega.sin();
    real * real + imag * imag
}

/// Waveform synthesis half of the codec: bytes in, PCM out.
///
/// The synthesized waveform is unit-amplitude; playback gain is the audio
/// backend's job so the same packet can be replayed at any level.
#[derive(Debug, Clone)]
pub struct Modulator {
    config: ModemConfig,
}

impl Modulator {
    pub fn new(config: &ModemConfig) -> Self {
        Self { config: config.clone() }
    }

    /// One Hann-enveloped tone burst for a symbol value.
    ///
    /// Phase advances sample-by-sample (phase += 2*pi*f*dt); each burst is
    /// windowed independently so no phase memory is kept across symbols.
    pub fn symbol_waveform(&self, symbol: u8) -> Vec<f32> {
        self.tone(self.config.symbol_frequency(symbol), self.config.symbol_samples())
    }

    /// Settle burst at half the base frequency, played before and after the
    /// payload so capture AGC and the receive energy gate stabilize. Not
    /// part of the logical framing.
    pub fn guard_waveform(&self, duration_samples: usize) -> Vec<f32> {
        self.tone(self.config.base_frequency / 2.0, duration_samples)
    }

    /// Full transmission for a framed packet: guard tone, one symbol per
    /// `bits_per_symbol` bits consumed little-endian from the packet bytes,
    /// trailing guard tone. A bit remainder (when the symbol width does not
    /// divide the packet's bit count) is flushed as a final zero-padded
    /// symbol.
    pub fn packet_waveform(&self, packet: &[u8]) -> Vec<f32> {
        let bits_per_symbol = self.config.bits_per_symbol as u32;
        let mask = (1u32 << bits_per_symbol) - 1;
        let guard_samples = self.config.guard_samples();

        let mut samples = self.guard_waveform(guard_samples);

        let mut bit_bucket: u32 = 0;
        let mut bit_count: u32 = 0;
        for &byte in packet {
            bit_bucket |= (byte as u32) << bit_count;
            bit_count += 8;
            while bit_count >= bits_per_symbol {
                let symbol = (bit_bucket & mask) as u8;
                bit_bucket >>= bits_per_symbol;
                bit_count -= bits_per_symbol;
                samples.extend_from_slice(&self.symbol_waveform(symbol));
            }
        }
        if bit_count > 0 {
            let symbol = (bit_bucket & mask) as u8;
            samples.extend_from_slice(&self.symbol_waveform(symbol));
        }

        samples.extend_from_slice(&self.guard_waveform(guard_samples));
        samples
    }

    /// Symbols emitted for a packet of `byte_count` bytes.
    pub fn symbols_per_packet(&self, byte_count: usize) -> usize {
        let total_bits = byte_count * 8;
        let bits_per_symbol = self.config.bits_per_symbol as usize;
        (total_bits + bits_per_symbol - 1) / bits_per_symbol
    }

    fn tone(&self, freq: f32, duration_samples: usize) -> Vec<f32> {
        let dt = 1.0 / self.config.sample_rate as f32;
        let mut phase = 0.0f32;
        let mut samples = Vec::with_capacity(duration_samples);
        for i in 0..duration_samples {
            samples.push(phase.sin() * hann(i, duration_samples));
            phase += 2.0 * PI * freq * dt;
        }
        samples
    }
}

/// Spectral half of the codec: one capture window in, symbol estimate out.
#[derive(Debug, Clone)]
pub struct SymbolDetector {
    config: ModemConfig,
}

impl SymbolDetector {
    pub fn new(config: &ModemConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Estimate which symbol, if any, is present in one window of samples.
    ///
    /// Windows below the RMS gate are skipped without running the filter
    /// bank; that gate, not the per-bin floor, does most of the work of not
    /// decoding silence as data. Among the 2^B candidates the maximum-power
    /// bin wins, and only if it also clears the minimum-tone discriminator.
    pub fn detect(&self, samples: &[f32]) -> Option<u8> {
        if rms(samples) < self.config.min_energy {
            return None;
        }

        let mut best_symbol = 0u8;
        let mut best_power = 0.0f32;
        for s in 0..self.config.alphabet_size() {
            let symbol = s as u8;
            let power = goertzel_power(
                samples,
                self.config.symbol_frequency(symbol),
                self.config.sample_rate,
            );
            if power > best_power {
                best_power = power;
                best_symbol = symbol;
            }
        }

        let total: f32 = samples.iter().map(|s| s * s).sum();
        let floor = MIN_TONE_FRACTION * total * samples.len() as f32;
        if best_power > floor {
            Some(best_symbol)
        } else {
            None
        }
    }
}
