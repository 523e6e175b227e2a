use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use thiserror::Error;

use crate::config::AudioConfig;

#[derive(Debug, Error)]
pub enum AnalyserError {
    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
    #[error("smoothing {0} must be within 0.0-1.0")]
    InvalidSmoothing(f32),
    #[error("decibel range {min}..{max} is empty")]
    InvalidDecibelRange { min: f32, max: f32 },
}

/// Real-time frequency analysis over the most recent `fft_size` samples.
///
/// Each call blends the new magnitude spectrum into the previous one with the
/// smoothing time constant, converts to decibels and scales the
/// `min_decibels..max_decibels` range onto 0-255.
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    previous: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(settings: &AudioConfig) -> Result<Self, AnalyserError> {
        let fft_size = settings.fft_size;
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return Err(AnalyserError::InvalidFftSize(fft_size));
        }
        if !(0.0..=1.0).contains(&settings.smoothing) {
            return Err(AnalyserError::InvalidSmoothing(settings.smoothing));
        }
        if settings.min_decibels >= settings.max_decibels {
            return Err(AnalyserError::InvalidDecibelRange {
                min: settings.min_decibels,
                max: settings.max_decibels,
            });
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft,
            fft_size,
            smoothing: settings.smoothing,
            min_decibels: settings.min_decibels,
            max_decibels: settings.max_decibels,
            window: blackman_window(fft_size),
            previous: vec![0.0; fft_size / 2],
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse `time_domain` (newest sample last) and return one byte per bin.
    /// Short input is zero-padded at the front.
    pub fn byte_frequency_data(&mut self, time_domain: &[f32]) -> Vec<u8> {
        let n = self.fft_size;
        let take = time_domain.len().min(n);
        let offset = n - take;
        let tail = &time_domain[time_domain.len() - take..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { tail[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / n as f32;
        let range = self.max_decibels - self.min_decibels;
        let tau = self.smoothing;
        let min_db = self.min_decibels;

        self.buffer[..n / 2]
            .iter()
            .zip(self.previous.iter_mut())
            .map(|(c, prev)| {
                let magnitude = c.norm() * scale;
                let smoothed = tau * *prev + (1.0 - tau) * magnitude;
                *prev = if smoothed.is_finite() { smoothed } else { 0.0 };

                let db = 20.0 * prev.log10();
                let scaled = 255.0 / range * (db - min_db);
                if scaled.is_nan() {
                    0
                } else {
                    scaled.clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * std::f32::consts::PI * x).cos()
                + a2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}
