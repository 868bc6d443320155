use clap::{Args, Parser, Subcommand};
use hound::WavSpec;
use log::info;
use std::fs::File;
use std::path::PathBuf;
use tonewire_core::{
    AudioIo, ConfigPatch, ModemConfig, ModemEvent, ModemSession, Result as ModemResult,
};

#[derive(Parser)]
#[command(name = "tonewire")]
#[command(about = "Acoustic FSK modem for short text messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a text message to a WAV audio file
    Send {
        /// Message text to transmit
        #[arg(value_name = "TEXT")]
        text: String,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Decode messages from a WAV audio file
    Listen {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Samples fed per simulated capture tick
        #[arg(long, default_value = "1024")]
        chunk: usize,

        #[command(flatten)]
        channel: ChannelArgs,
    },
}

/// Channel parameters; unset flags keep the default preset. Sender and
/// receiver must use matching values.
#[derive(Args)]
struct ChannelArgs {
    /// PCM sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Bits per tone burst (alphabet size 2^bits)
    #[arg(long)]
    bits_per_symbol: Option<u8>,

    /// Tone burst duration in seconds
    #[arg(long)]
    symbol_duration: Option<f32>,

    /// Guard tone duration in seconds
    #[arg(long)]
    guard_duration: Option<f32>,

    /// Frequency of symbol value 0 in Hz
    #[arg(long)]
    base_frequency: Option<f32>,

    /// Spacing between adjacent symbol frequencies in Hz
    #[arg(long)]
    frequency_step: Option<f32>,

    /// Playback amplitude in (0, 1]
    #[arg(long)]
    amplitude: Option<f32>,

    /// RMS gate below which capture windows count as silence
    #[arg(long)]
    min_energy: Option<f32>,
}

impl ChannelArgs {
    fn into_config(self) -> ModemResult<ModemConfig> {
        let patch = ConfigPatch {
            sample_rate: self.sample_rate,
            bits_per_symbol: self.bits_per_symbol,
            symbol_duration: self.symbol_duration,
            guard_duration: self.guard_duration,
            base_frequency: self.base_frequency,
            frequency_step: self.frequency_step,
            amplitude: self.amplitude,
            min_energy: self.min_energy,
        };
        let config = patch.apply(&ModemConfig::default());
        config.validate()?;
        Ok(config)
    }
}

/// WAV-backed audio endpoints: playback collects the scheduled waveform
/// for writing, capture is satisfied by the input file the listen loop
/// streams in.
#[derive(Default)]
struct WavIo {
    scheduled: Vec<f32>,
}

impl AudioIo for WavIo {
    fn open_capture(&mut self) -> ModemResult<()> {
        Ok(())
    }

    fn close_capture(&mut self) {}

    fn play(&mut self, samples: &[f32], gain: f32) -> ModemResult<()> {
        self.scheduled = samples.iter().map(|s| s * gain).collect();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { text, output, channel } => send_command(&text, &output, channel)?,
        Commands::Listen { input, chunk, channel } => listen_command(&input, chunk, channel)?,
    }

    Ok(())
}

fn send_command(
    text: &str,
    output_path: &PathBuf,
    channel: ChannelArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = channel.into_config()?;
    let sample_rate = config.sample_rate;

    let mut session = ModemSession::new(config, WavIo::default())?;
    session.send(text)?;
    let samples = session.io().scheduled.clone();
    info!("synthesized {} samples for {} bytes", samples.len(), text.len());

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let file = File::create(output_path)?;
    let mut writer = hound::WavWriter::new(file, spec)?;
    for sample in samples {
        writer.write_sample(sample_to_i16(sample))?;
    }
    writer.finalize()?;

    println!("Wrote {}", output_path.display());
    Ok(())
}

fn listen_command(
    input_path: &PathBuf,
    chunk: usize,
    channel: ChannelArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = channel.into_config()?;

    let file = File::open(input_path)?;
    let mut reader = hound::WavReader::new(file)?;
    let spec = reader.spec();
    info!(
        "reading WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    if spec.sample_rate != config.sample_rate {
        return Err(format!(
            "WAV sample rate {} does not match channel sample rate {}",
            spec.sample_rate, config.sample_rate
        )
        .into());
    }

    let samples = match spec.bits_per_sample {
        16 => {
            let int_samples: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
            int_samples?
                .into_iter()
                .map(|s| s as f32 / 32768.0)
                .collect()
        }
        32 => {
            let float_samples: Result<Vec<f32>, _> = reader.samples::<f32>().collect();
            float_samples?
        }
        _ => {
            return Err(format!("Unsupported bit depth: {}", spec.bits_per_sample).into());
        }
    };
    info!("extracted {} samples", samples.len());

    let mut session = ModemSession::new(config, WavIo::default())?;
    session.start()?;

    let chunk = chunk.max(1);
    let mut message_count = 0usize;
    for block in samples.chunks(chunk) {
        for event in session.advance(block) {
            match event {
                ModemEvent::Message(text) => {
                    message_count += 1;
                    println!("{}", text);
                }
                ModemEvent::Status(notice) => info!("{}", notice),
                ModemEvent::Error(err) => eprintln!("decode error: {}", err),
            }
        }
    }
    session.stop();

    if message_count == 0 {
        eprintln!("no messages decoded");
    }
    Ok(())
}

/// Clamp to [-1, 1] and scale into the signed 16-bit PCM range.
fn sample_to_i16(sample: f32) -> i16 {
    (sample.max(-1.0).min(1.0) * 32767.0) as i16
}
