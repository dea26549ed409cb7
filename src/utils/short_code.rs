use std::sync::Arc;

use nanoid::nanoid;

use crate::store::StoreError;

/// No `0/O`, `1/I/l` or `o`: codes get typed in from printed material.
pub const ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
pub const DEFAULT_MAX_ATTEMPTS: usize = 16;
const MAX_CODE_LENGTH: usize = 32;

/// Source of raw candidates. Swappable so collisions can be forced.
pub trait CodeSource: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

pub struct NanoidSource {
    alphabet: Vec<char>,
}

impl Default for NanoidSource {
    fn default() -> Self {
        Self {
            alphabet: ALPHABET.chars().collect(),
        }
    }
}

impl CodeSource for NanoidSource {
    fn generate(&self, length: usize) -> String {
        nanoid!(length, &self.alphabet)
    }
}

#[derive(Clone)]
pub struct ShortCodeGenerator {
    source: Arc<dyn CodeSource>,
    max_attempts: usize,
}

impl Default for ShortCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl ShortCodeGenerator {
    pub fn new(max_attempts: usize) -> Self {
        Self::with_source(Arc::new(NanoidSource::default()), max_attempts)
    }

    pub fn with_source(source: Arc<dyn CodeSource>, max_attempts: usize) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn generate(&self, length: usize) -> String {
        self.source.generate(length)
    }

    /// At most `max_attempts` fresh candidates.
    pub fn candidates(&self, length: usize) -> impl Iterator<Item = String> + '_ {
        (0..self.max_attempts).map(move |_| self.generate(length))
    }

    /// Offers candidates to `try_claim` until one is accepted. The claim is
    /// expected to check and reserve in one step.
    pub fn claim<T>(
        &self,
        length: usize,
        try_claim: impl FnMut(String) -> Option<T>,
    ) -> Result<T, StoreError> {
        self.candidates(length)
            .find_map(try_claim)
            .ok_or(StoreError::GenerationExhausted {
                attempts: self.max_attempts,
            })
    }
}

/// Cheap syntactic filter applied before any lookup.
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LENGTH && code.chars().all(|c| ALPHABET.contains(c))
}
