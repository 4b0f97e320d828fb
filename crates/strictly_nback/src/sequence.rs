//! Trial sequence generation.

use std::sync::{Mutex, PoisonError};

use derive_getters::Getters;
use derive_new::new;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{SequenceError, Stimulus};

/// Parameters for one generated sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct SequenceRequest {
    /// Number of trials.
    length: usize,
    /// Values are drawn from `0..domain_size`.
    domain_size: u32,
    /// Approximate share of intentional matches, in percent.
    match_target_percent: u8,
    /// Match distance.
    n_back: usize,
}

impl SequenceRequest {
    /// Checks a generated sequence against this request.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError`] on a wrong length or an out-of-domain value.
    #[instrument(skip(self, sequence))]
    pub fn verify(&self, sequence: &[Stimulus]) -> Result<(), SequenceError> {
        if sequence.len() != self.length {
            return Err(SequenceError::new(format!(
                "Expected {} trials, provider returned {}",
                self.length,
                sequence.len()
            )));
        }
        if let Some((index, value)) = sequence
            .iter()
            .enumerate()
            .find(|(_, value)| **value >= self.domain_size)
        {
            return Err(SequenceError::new(format!(
                "Value {} at index {} is outside 0..{}",
                value, index, self.domain_size
            )));
        }
        Ok(())
    }
}

/// Source of trial sequences.
///
/// Implementations may be random; callers must not expect two calls with
/// the same request to agree.
pub trait SequenceProvider: Send + Sync {
    /// Produces a sequence of `request.length()` values in `0..request.domain_size()`.
    fn generate(&self, request: &SequenceRequest) -> Result<Vec<Stimulus>, SequenceError>;
}

/// Random sequences with a target share of n-back matches.
#[derive(Debug)]
pub struct RandomSequenceProvider {
    rng: Mutex<ChaCha8Rng>,
}

impl RandomSequenceProvider {
    /// Creates a provider seeded from the operating system.
    #[instrument]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Creates a reproducible provider.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        info!(seed, "Creating seeded sequence provider");
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSequenceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceProvider for RandomSequenceProvider {
    #[instrument(skip(self))]
    fn generate(&self, request: &SequenceRequest) -> Result<Vec<Stimulus>, SequenceError> {
        if request.domain_size == 0 {
            return Err(SequenceError::new("Cannot draw from an empty domain"));
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut sequence: Vec<Stimulus> = Vec::with_capacity(request.length);

        for index in 0..request.length {
            let earlier = index
                .checked_sub(request.n_back)
                .and_then(|back| sequence.get(back).copied());
            let value = match earlier {
                Some(earlier) if rng.gen_range(0..100u8) < request.match_target_percent => earlier,
                Some(earlier) if request.domain_size > 1 => {
                    // Skip over `earlier` so unintended matches do not inflate the count.
                    let draw = rng.gen_range(0..request.domain_size - 1);
                    if draw >= earlier { draw + 1 } else { draw }
                }
                _ => rng.gen_range(0..request.domain_size),
            };
            sequence.push(value);
        }

        debug!(?sequence, "Generated sequence");
        Ok(sequence)
    }
}

/// Replays the same scripted sequence on every run.
#[derive(Debug, Clone, new)]
pub struct FixedSequenceProvider {
    sequence: Vec<Stimulus>,
}

impl SequenceProvider for FixedSequenceProvider {
    #[instrument(skip(self, _request))]
    fn generate(&self, _request: &SequenceRequest) -> Result<Vec<Stimulus>, SequenceError> {
        Ok(self.sequence.clone())
    }
}

/// Counts trials that repeat the value `n_back` positions earlier.
#[instrument(skip(sequence))]
pub fn count_matches(sequence: &[Stimulus], n_back: usize) -> usize {
    if n_back == 0 {
        return 0;
    }
    sequence
        .windows(n_back + 1)
        .filter(|window| window[0] == window[n_back])
        .count()
}
