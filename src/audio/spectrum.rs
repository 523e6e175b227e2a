use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::analyser::Analyser;
use crate::config::AudioConfig;
use crate::error::VisualizerError;

/// One snapshot of frequency magnitudes, each 0-255.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpectrumFrame(Vec<u8>);

impl SpectrumFrame {
    pub fn new(samples: Vec<u8>) -> Self {
        Self(samples)
    }

    pub fn samples(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sample at `index`, or 0 past the end.
    pub fn get(&self, index: usize) -> u8 {
        self.samples().get(index).copied().unwrap_or(0)
    }

    /// Arithmetic mean over every sample, in 0-255.
    pub fn average(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.samples().iter().map(|&s| s as u32).sum::<u32>() as f32 / self.0.len() as f32
    }
}

/// A live audio signal the source can analyse.
pub trait SignalHandle {
    /// Identity of the element producing the signal. Changes whenever the
    /// element is rebound to a new source.
    fn element_id(&self) -> u64;

    /// True while audio is actually playing.
    fn is_decoding(&self) -> bool;

    /// Fill `out` with the samples leading up to the playhead, newest last.
    fn time_domain(&self, out: &mut [f32]);
}

/// Pseudo-periodic spectrum used when there is no audio to analyse.
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn frame(&mut self, len: usize, elapsed: f32) -> SpectrumFrame {
        let t = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let samples = (0..len)
            .map(|i| {
                let i = i as f32;
                let jitter: f32 = self.rng.random_range(0.0..20.0);
                let value = 80.0
                    + 30.0 * (2.0 * t + 0.1 * i).sin()
                    + 50.0 * (0.5 * t + 0.05 * i).sin()
                    + jitter;
                value.clamp(0.0, 255.0) as u8
            })
            .collect();
        SpectrumFrame::new(samples)
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// The analysis node bound to one audio element.
struct AnalyserBinding {
    element_id: u64,
    analyser: Analyser,
    time_domain: Vec<f32>,
}

/// Produces one spectrum frame per rendered frame, live or synthetic.
///
/// At most one analysis binding exists at a time. It is released when the
/// element changes or demo mode flips, before any new binding is made.
pub struct SpectrumSource {
    settings: AudioConfig,
    binding: Option<AnalyserBinding>,
    synthetic: SyntheticGenerator,
    last_demo_mode: Option<bool>,
    failed_element: Option<u64>,
}

impl SpectrumSource {
    pub fn new(settings: AudioConfig) -> Self {
        Self::with_generator(settings, SyntheticGenerator::new())
    }

    pub fn with_generator(settings: AudioConfig, synthetic: SyntheticGenerator) -> Self {
        Self {
            settings,
            binding: None,
            synthetic,
            last_demo_mode: None,
            failed_element: None,
        }
    }

    /// Frame length: the analyser's bin count.
    pub fn frame_len(&self) -> usize {
        self.settings.fft_size / 2
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn bound_element(&self) -> Option<u64> {
        self.binding.as_ref().map(|b| b.element_id)
    }

    pub fn next_frame(
        &mut self,
        signal: Option<&dyn SignalHandle>,
        demo_mode: bool,
        elapsed: f32,
    ) -> SpectrumFrame {
        if self.last_demo_mode.is_some_and(|last| last != demo_mode) {
            self.release();
        }
        self.last_demo_mode = Some(demo_mode);
        let len = self.frame_len();

        let element_id = signal.map(|s| s.element_id());
        if self.bound_element().is_some() && self.bound_element() != element_id {
            self.release();
        }

        let live = match signal {
            Some(signal) if !demo_mode && signal.is_decoding() => signal,
            _ => return self.synthetic.frame(len, elapsed),
        };

        if self.binding.is_none() {
            if let Err(err) = self.bind(live.element_id()) {
                if self.failed_element != Some(live.element_id()) {
                    log::warn!("{}; falling back to synthetic spectrum", err);
                    self.failed_element = Some(live.element_id());
                }
                return self.synthetic.frame(len, elapsed);
            }
        }

        match self.binding.as_mut() {
            Some(binding) => {
                live.time_domain(&mut binding.time_domain);
                SpectrumFrame::new(binding.analyser.byte_frequency_data(&binding.time_domain))
            }
            None => self.synthetic.frame(len, elapsed),
        }
    }

    fn bind(&mut self, element_id: u64) -> Result<(), VisualizerError> {
        let analyser = Analyser::new(&self.settings)
            .map_err(|e| VisualizerError::AudioGraphSetupFailure(e.to_string()))?;
        log::debug!(
            "Bound analyser to element {} ({} bins)",
            element_id,
            analyser.frequency_bin_count()
        );
        self.binding = Some(AnalyserBinding {
            element_id,
            time_domain: vec![0.0; analyser.fft_size()],
            analyser,
        });
        self.failed_element = None;
        Ok(())
    }

    /// Drop the current analysis binding, if any.
    pub fn release(&mut self) {
        if let Some(binding) = self.binding.take() {
            log::debug!("Released analyser from element {}", binding.element_id);
        }
    }
}
