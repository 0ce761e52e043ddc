// src/core/windower.rs
//
// Slices an aligned stream into fixed-length windows and computes the
// calibrated, resampled and smoothed PSD of every channel per window.

use rayon::prelude::*;

use super::context::RunContext;
use super::dsp::interp::{interp_log_freq, log_axis};
use super::dsp::{power_to_db, smooth, ChannelResponse, PsdEstimator, WindowType};
use super::stream::{AlignedStream, Component};
use super::window::{ChannelPsd, ExclusionReason, FrequencyAxis, Window, WindowTable};
use crate::config::WindowConfig;
use crate::error::{HvsrError, Result};

/// How native FFT bins map onto the output axis
enum AxisMapping {
    /// Interpolate onto a log-spaced axis
    Resample(Vec<f64>),
    /// Keep native bins `[first, last)`
    Native(usize, usize),
}

pub struct SpectralWindower {
    config: WindowConfig,
}

impl SpectralWindower {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Number of windows a series of `len` samples yields
    fn window_count(len: usize, window_samples: usize, step_samples: usize) -> usize {
        if len < window_samples {
            0
        } else {
            (len - window_samples) / step_samples + 1
        }
    }

    pub fn process(&self, stream: &AlignedStream, ctx: &mut RunContext) -> Result<WindowTable> {
        self.config.validate()?;

        let sr = stream.sample_rate;
        let window_samples = (self.config.window_length * sr).round() as usize;
        let step_samples = ((self.config.step() * sr).round() as usize).max(1);
        if window_samples < 2 {
            return Err(HvsrError::InvalidConfig(format!(
                "window of {} s holds fewer than 2 samples at {} Hz",
                self.config.window_length, sr
            )));
        }

        for channel in &stream.channels {
            if channel.samples.len() < window_samples {
                return Err(HvsrError::InsufficientSamples {
                    channel: channel.component.to_string(),
                    available: channel.samples.len(),
                    required: window_samples,
                });
            }
        }

        let counts: Vec<usize> = stream
            .channels
            .iter()
            .map(|c| Self::window_count(c.samples.len(), window_samples, step_samples))
            .collect();
        let max_count = counts.iter().copied().max().unwrap_or(0);
        let count = counts.iter().copied().min().unwrap_or(0);
        if max_count > 0 && (max_count - count) as f64 / max_count as f64 > self.config.mismatch_tolerance {
            let warning = HvsrError::ChannelMismatch {
                counts: counts.clone(),
                tolerance: self.config.mismatch_tolerance * 100.0,
            };
            ctx.warn(format!("{}; truncating to {} windows", warning, count));
        }

        let estimator = PsdEstimator::new(window_samples, sr, WindowType::Hann);
        let native = estimator.frequencies();
        let (axis, mapping) = self.frequency_axis(&native)?;
        ctx.debug(format!(
            "{} windows of {} samples (nfft {}), {} output bins",
            count,
            window_samples,
            estimator.nfft(),
            axis.len()
        ));

        let windows = (0..count)
            .into_par_iter()
            .map(|i| {
                let first = i * step_samples;
                let last = first + window_samples;
                let start = first as f64 / sr;
                let end = last as f64 / sr;
                let mut window = Window::new(i, start, end, stream.time_at(start), stream.time_at(end));
                window.psd = self.window_psd(stream, first, last, &estimator, &native, &axis, &mapping)?;
                if stream.channels.iter().any(|c| c.has_gap(first, last)) {
                    window.exclude(ExclusionReason::DataGap);
                }
                Ok(window)
            })
            .collect::<Result<Vec<_>>>()?;

        let gaps = windows.iter().filter(|w| !w.use_window).count();
        if gaps > 0 {
            ctx.info(format!("{} of {} windows contain data gaps", gaps, windows.len()));
        }

        Ok(WindowTable {
            frequencies: axis,
            window_length: self.config.window_length,
            windows,
        })
    }

    fn frequency_axis(&self, native: &[f64]) -> Result<(FrequencyAxis, AxisMapping)> {
        let df = native.get(1).copied().unwrap_or(0.0);
        let nyquist = native.last().copied().unwrap_or(0.0);
        let low = self.config.band.low.max(df);
        let high = self.config.band.high.min(nyquist);
        if !(low < high) {
            return Err(HvsrError::InvalidConfig(format!(
                "band [{}, {}] Hz has no overlap with resolvable [{}, {}] Hz",
                self.config.band.low, self.config.band.high, df, nyquist
            )));
        }

        match self.config.resample_bins {
            Some(n) => {
                let freqs = log_axis(low, high, n);
                Ok((FrequencyAxis::new(freqs.clone())?, AxisMapping::Resample(freqs)))
            }
            None => {
                let first = native.iter().position(|&f| f >= low).unwrap_or(native.len());
                let last = native.iter().rposition(|&f| f <= high).map_or(first, |j| j + 1);
                let freqs = native.get(first..last).unwrap_or(&[]).to_vec();
                Ok((FrequencyAxis::new(freqs)?, AxisMapping::Native(first, last)))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn window_psd(
        &self,
        stream: &AlignedStream,
        first: usize,
        last: usize,
        estimator: &PsdEstimator,
        native: &[f64],
        axis: &FrequencyAxis,
        mapping: &AxisMapping,
    ) -> Result<ChannelPsd> {
        let spectrum = |samples: &[f64], response: Option<&ChannelResponse>| -> Result<Vec<f64>> {
            let mut power = estimator.welch(samples)?;
            if let Some(response) = response {
                response.remove_from(native, &mut power);
            }
            let db: Vec<f64> = power.into_iter().map(power_to_db).collect();
            let mapped = match mapping {
                // DC has no place on a log axis
                AxisMapping::Resample(target) => interp_log_freq(target, &native[1..], &db[1..]),
                AxisMapping::Native(a, b) => db[*a..*b].to_vec(),
            };
            Ok(smooth(axis.as_slice(), &mapped, &self.config.smoothing))
        };

        let z = stream.channel(Component::Z);
        let n = stream.channel(Component::N);
        let e = stream.channel(Component::E);
        let north = n.filled(first, last);
        let east = e.filled(first, last);

        let mut psd = ChannelPsd {
            z: spectrum(&z.filled(first, last), z.response.as_ref())?,
            n: spectrum(&north, n.response.as_ref())?,
            e: spectrum(&east, e.response.as_ref())?,
            ..ChannelPsd::default()
        };

        for &azimuth in &self.config.azimuths {
            let theta = (azimuth as f64).to_radians();
            let (cos, sin) = (theta.cos(), theta.sin());
            let radial: Vec<f64> = north
                .iter()
                .zip(&east)
                .map(|(&nv, &ev)| nv * cos + ev * sin)
                .collect();
            // Horizontals are assumed to share a response; use the north one
            psd.radial.insert(azimuth, spectrum(&radial, n.response.as_ref())?);
        }

        Ok(psd)
    }
}
