use std::marker::PhantomData;

use crate::streamer::streamer_config::StreamerConfig;
use crate::telemetry::sample::Sample;
use crate::util::random::Random;

/// Synthetic altitude source: a random walk with a steady climb, optionally replacing one step
///  with a fixed spike. Yields exactly `duration_secs` samples, indexed from 1.
pub struct AltitudeGenerator<R: Random> {
    num_samples: u32,
    inject_at: Option<u32>,
    climb_per_step_ft: f64,
    turbulence_ft: f64,
    spike_ft: f64,

    step: u32,
    altitude_ft: f64,
    _random: PhantomData<R>,
}

impl<R: Random> AltitudeGenerator<R> {
    pub fn new(config: &StreamerConfig) -> AltitudeGenerator<R> {
        AltitudeGenerator {
            num_samples: config.duration_secs,
            inject_at: config.inject_at,
            climb_per_step_ft: config.climb_per_step_ft,
            turbulence_ft: config.turbulence_ft,
            spike_ft: config.spike_ft,
            step: 0,
            altitude_ft: config.start_altitude_ft,
            _random: Default::default(),
        }
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }
}

impl<R: Random> Iterator for AltitudeGenerator<R> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.step >= self.num_samples {
            return None;
        }
        self.step += 1;

        if self.inject_at == Some(self.step) {
            self.altitude_ft += self.spike_ft;
        }
        else {
            let turbulence = R::gen_f64_range(-self.turbulence_ft..=self.turbulence_ft);
            self.altitude_ft += self.climb_per_step_ft + turbulence;
        }

        Some(Sample::new(self.step as u64, self.altitude_ft))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.num_samples - self.step) as usize;
        (remaining, Some(remaining))
    }
}

impl<R: Random> ExactSizeIterator for AltitudeGenerator<R> {}
