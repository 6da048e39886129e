//! Synthetic input profiles for runs without a measured series.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::series::{Sample, TimeSeries};
use crate::error::InputError;

/// Shape of a synthetic power profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Profile {
    /// Flat power.
    Constant { kw: f64 },
    /// `mean_kw + amplitude_kw * sin(2 pi (t + phase_h) / period_h)`.
    Sinusoidal {
        mean_kw: f64,
        amplitude_kw: f64,
        period_h: f64,
        #[serde(default)]
        phase_h: f64,
    },
}

impl Profile {
    /// Noise-free power at `t_hours` after the start (kW, never negative).
    pub fn power_kw(&self, t_hours: f64) -> f64 {
        let kw = match *self {
            Self::Constant { kw } => kw,
            Self::Sinusoidal {
                mean_kw,
                amplitude_kw,
                period_h,
                phase_h,
            } => {
                let angle = 2.0 * std::f64::consts::PI * (t_hours + phase_h) / period_h;
                mean_kw + amplitude_kw * angle.sin()
            }
        };
        kw.max(0.0)
    }
}

/// A window of steps during which the grid is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutageWindow {
    pub start_step: usize,
    pub steps: usize,
}

impl OutageWindow {
    pub fn contains(&self, step: usize) -> bool {
        step >= self.start_step && step - self.start_step < self.steps
    }
}

/// Generator of a synthetic input series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticSeries {
    /// Timestamp of the first sample.
    pub start: NaiveDateTime,
    /// Sampling step (h).
    pub dt_hours: f64,
    /// Number of samples.
    pub steps: usize,
    pub load: Profile,
    pub green: Profile,
    /// Standard deviation of the Gaussian noise added to both profiles (kW).
    pub noise_std_kw: f64,
    /// Random seed for the noise.
    pub seed: u64,
    pub outage: Option<OutageWindow>,
}

impl Default for SyntheticSeries {
    /// Fifteen days at 15 minutes: load and production oscillate out of phase
    /// over half the run, and the grid is lost for the second half.
    fn default() -> Self {
        let steps = 15 * 96;
        let period_h = 180.0;
        Self {
            start: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            dt_hours: 0.25,
            steps,
            load: Profile::Sinusoidal {
                mean_kw: 100.0,
                amplitude_kw: 20.0,
                period_h,
                phase_h: period_h / 4.0,
            },
            green: Profile::Sinusoidal {
                mean_kw: 100.0,
                amplitude_kw: 10.0,
                period_h,
                phase_h: 0.0,
            },
            noise_std_kw: 0.0,
            seed: 42,
            outage: Some(OutageWindow {
                start_step: steps / 2,
                steps: steps - steps / 2,
            }),
        }
    }
}

impl SyntheticSeries {
    /// Samples the profiles.
    ///
    /// # Errors
    ///
    /// Returns an `InputError` if the step count or step size cannot form a
    /// valid series.
    pub fn generate(&self) -> Result<TimeSeries, InputError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step_ms = (self.dt_hours * 3_600_000.0).round() as i64;
        let samples: Vec<Sample> = (0..self.steps)
            .map(|i| {
                let t_hours = i as f64 * self.dt_hours;
                let load_noise = gaussian_noise(&mut rng, self.noise_std_kw);
                let green_noise = gaussian_noise(&mut rng, self.noise_std_kw);
                Sample {
                    time: self.start + Duration::milliseconds(step_ms * i as i64),
                    load_kw: (self.load.power_kw(t_hours) + load_noise).max(0.0),
                    green_kw: (self.green.power_kw(t_hours) + green_noise).max(0.0),
                    grid_available: !self.outage.is_some_and(|w| w.contains(i)),
                }
            })
            .collect();
        TimeSeries::from_samples(&samples)
    }
}

/// Zero-mean Gaussian noise via Box-Muller.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_profile() {
        let p = Profile::Constant { kw: 12.5 };
        assert_eq!(p.power_kw(0.0), 12.5);
        assert_eq!(p.power_kw(100.0), 12.5);
    }

    #[test]
    fn sinusoid_peaks_at_quarter_period() {
        let p = Profile::Sinusoidal {
            mean_kw: 10.0,
            amplitude_kw: 5.0,
            period_h: 24.0,
            phase_h: 0.0,
        };
        assert!((p.power_kw(6.0) - 15.0).abs() < 1e-9);
        assert!((p.power_kw(18.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn negative_power_clamped() {
        let p = Profile::Sinusoidal {
            mean_kw: 0.0,
            amplitude_kw: 5.0,
            period_h: 24.0,
            phase_h: 0.0,
        };
        assert_eq!(p.power_kw(18.0), 0.0);
    }

    #[test]
    fn outage_window_bounds() {
        let w = OutageWindow {
            start_step: 4,
            steps: 2,
        };
        assert!(!w.contains(3));
        assert!(w.contains(4));
        assert!(w.contains(5));
        assert!(!w.contains(6));
    }

    #[test]
    fn default_series_loses_grid_halfway() {
        let ts = SyntheticSeries::default().generate().unwrap();
        assert_eq!(ts.len(), 1440);
        assert_eq!(ts.dt_hours(), 0.25);
        assert!(ts.grid_available()[719]);
        assert!(!ts.grid_available()[720]);
        assert!(!ts.grid_available()[1439]);
    }

    #[test]
    fn noise_is_seeded() {
        let cfg = SyntheticSeries {
            noise_std_kw: 2.0,
            steps: 48,
            ..SyntheticSeries::default()
        };
        let a = cfg.generate().unwrap();
        let b = cfg.generate().unwrap();
        assert_eq!(a, b);
        let c = SyntheticSeries { seed: 7, ..cfg }.generate().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn zero_std_gives_no_noise() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
    }
}
