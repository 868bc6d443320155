use tonewire_core::{
    AudioIo, ConfigPatch, ModemConfig, ModemEvent, ModemSession, Result as ModemResult,
};
use wasm_bindgen::prelude::*;

/// The page owns the real AudioContext and microphone stream; playback is
/// collected here for the page to schedule, capture permission is the
/// page's getUserMedia prompt.
#[derive(Default)]
struct PageIo {
    scheduled: Vec<f32>,
}

impl AudioIo for PageIo {
    fn open_capture(&mut self) -> ModemResult<()> {
        Ok(())
    }

    fn close_capture(&mut self) {}

    fn play(&mut self, samples: &[f32], gain: f32) -> ModemResult<()> {
        self.scheduled = samples.iter().map(|s| s * gain).collect();
        Ok(())
    }
}

#[wasm_bindgen]
pub struct WasmModem {
    inner: ModemSession<PageIo>,
}

#[wasm_bindgen]
impl WasmModem {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmModem, JsValue> {
        ModemSession::new(ModemConfig::default(), PageIo::default())
            .map(|inner| WasmModem { inner })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Retune the channel; unset (NaN/zero) handling is the page's job, so
    /// every argument here is applied as given.
    pub fn configure(
        &mut self,
        sample_rate: u32,
        bits_per_symbol: u8,
        symbol_duration: f32,
        guard_duration: f32,
        base_frequency: f32,
        frequency_step: f32,
        amplitude: f32,
        min_energy: f32,
    ) -> Result<(), JsValue> {
        let patch = ConfigPatch {
            sample_rate: Some(sample_rate),
            bits_per_symbol: Some(bits_per_symbol),
            symbol_duration: Some(symbol_duration),
            guard_duration: Some(guard_duration),
            base_frequency: Some(base_frequency),
            frequency_step: Some(frequency_step),
            amplitude: Some(amplitude),
            min_energy: Some(min_energy),
        };
        self.inner
            .update_config(patch)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Begin accumulating pushed capture samples.
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.inner
            .start()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Discard decode state and stop accepting samples.
    pub fn stop(&mut self) {
        self.inner.stop();
    }

    /// Synthesize the framed waveform for a message. The page plays the
    /// returned Float32Array through its own output node.
    pub fn encode(&mut self, text: &str) -> Result<Vec<f32>, JsValue> {
        self.inner
            .send(text)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(std::mem::take(&mut self.inner.io_mut().scheduled))
    }

    /// One capture tick: push newly captured samples, get back the newest
    /// decoded message if one completed.
    pub fn push_samples(&mut self, samples: &[f32]) -> Option<String> {
        self.inner
            .advance(samples)
            .into_iter()
            .rev()
            .find_map(|event| match event {
                ModemEvent::Message(text) => Some(text),
                _ => None,
            })
    }
}
