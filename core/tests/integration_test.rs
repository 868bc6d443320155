use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tonewire_core::{
    framing, AudioIo, ConfigPatch, ModemConfig, ModemEvent, ModemSession, Modulator, Result,
    SymbolDetector,
};

#[derive(Default)]
struct LoopbackIo {
    played: Vec<f32>,
}

impl AudioIo for LoopbackIo {
    fn open_capture(&mut self) -> Result<()> {
        Ok(())
    }

    fn close_capture(&mut self) {}

    fn play(&mut self, samples: &[f32], gain: f32) -> Result<()> {
        self.played = samples.iter().map(|s| s * gain).collect();
        Ok(())
    }
}

fn decode_stream(session: &mut ModemSession<LoopbackIo>, samples: &[f32]) -> Vec<String> {
    let mut decoded = Vec::new();
    for chunk in samples.chunks(1024) {
        for event in session.advance(chunk) {
            if let ModemEvent::Message(text) = event {
                decoded.push(text);
            }
        }
    }
    decoded
}

/// Codec-level round trip: framed packet -> waveform -> symbol-aligned
/// detection -> bytes -> frame extraction, on a noiseless channel.
#[test]
fn test_codec_round_trip_noiseless() {
    let config = ModemConfig::default();
    let modulator = Modulator::new(&config);
    let detector = SymbolDetector::new(&config);

    let message = "Hello, acoustic modem!";
    let packet = framing::wrap(message.as_bytes());
    let waveform = modulator.packet_waveform(&packet);

    // Walk the data region between the guard tones in symbol-aligned
    // windows, reassembling bytes little-endian.
    let guard = config.guard_samples();
    let window = config.symbol_samples();
    let data = &waveform[guard..waveform.len() - guard];

    let mut bytes = Vec::new();
    let mut bucket: u32 = 0;
    let mut count: u32 = 0;
    for slice in data.chunks(window) {
        let symbol = detector.detect(slice).expect("symbol window did not decode");
        bucket |= (symbol as u32) << count;
        count += config.bits_per_symbol as u32;
        while count >= 8 {
            bytes.push((bucket & 0xFF) as u8);
            bucket >>= 8;
            count -= 8;
        }
    }

    let frames = framing::extract_frames(&bytes);
    assert_eq!(frames, vec![message.as_bytes().to_vec()]);
}

#[test]
fn test_session_round_trip_over_loopback() {
    let mut session =
        ModemSession::new(ModemConfig::default(), LoopbackIo::default()).unwrap();
    session.start().unwrap();
    session.send("over the air").unwrap();

    let wave = session.io().played.clone();
    let decoded = decode_stream(&mut session, &wave);
    assert_eq!(decoded, vec!["over the air".to_string()]);
}

#[test]
fn test_round_trip_with_gaussian_noise() {
    let mut session =
        ModemSession::new(ModemConfig::default(), LoopbackIo::default()).unwrap();
    session.start().unwrap();
    session.send("noisy channel").unwrap();

    let mut wave = session.io().played.clone();
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0f32, 0.005).unwrap();
    for sample in wave.iter_mut() {
        *sample += noise.sample(&mut rng);
    }

    let decoded = decode_stream(&mut session, &wave);
    assert_eq!(decoded, vec!["noisy channel".to_string()]);
}

#[test]
fn test_round_trip_with_attenuation() {
    let mut session =
        ModemSession::new(ModemConfig::default(), LoopbackIo::default()).unwrap();
    session.start().unwrap();
    session.send("quiet").unwrap();

    // A distant microphone hears a much weaker copy of the playback.
    let wave: Vec<f32> = session.io().played.iter().map(|s| s * 0.1).collect();
    let decoded = decode_stream(&mut session, &wave);
    assert_eq!(decoded, vec!["quiet".to_string()]);
}

#[test]
fn test_round_trip_with_leading_and_trailing_silence() {
    let config = ModemConfig::default();
    let mut session = ModemSession::new(config.clone(), LoopbackIo::default()).unwrap();
    session.start().unwrap();
    session.send("padded").unwrap();

    // Leading silence arrives in whole capture windows; there is no clock
    // recovery, so a fractional-window offset is accepted message loss.
    let mut stream = vec![0.0f32; 20 * config.symbol_samples()];
    stream.extend_from_slice(&session.io().played);
    stream.extend_from_slice(&vec![0.0f32; 48_000]);

    let decoded = decode_stream(&mut session, &stream);
    assert_eq!(decoded, vec!["padded".to_string()]);
}

/// The documented end-to-end scenario: default channel, message "hi",
/// waveform length fixed by the packet size alone.
#[test]
fn test_transmission_length_contract() {
    let config = ModemConfig::default();
    let mut session = ModemSession::new(config.clone(), LoopbackIo::default()).unwrap();
    session.send("hi").unwrap();

    // Guard tones plus 2 symbols per packet byte (START + 2 payload + END).
    let guard = (48_000.0f32 * 0.1).round() as usize;
    let symbol = (48_000.0f32 * 0.035).round() as usize;
    assert_eq!(session.io().played.len(), 2 * guard + 8 * symbol);

    // Same-length payload, same waveform length.
    session.send("no").unwrap();
    assert_eq!(session.io().played.len(), 2 * guard + 8 * symbol);
}

#[test]
fn test_narrow_channel_round_trip() {
    // 2 bits per symbol: smaller alphabet, more symbols per byte.
    let mut session =
        ModemSession::new(ModemConfig::default(), LoopbackIo::default()).unwrap();
    session
        .update_config(ConfigPatch {
            bits_per_symbol: Some(2),
            ..ConfigPatch::default()
        })
        .unwrap();
    session.start().unwrap();
    session.send("narrow").unwrap();

    let wave = session.io().played.clone();
    let decoded = decode_stream(&mut session, &wave);
    assert_eq!(decoded, vec!["narrow".to_string()]);
}
