//! Security code generation.
//!
//! Codes are drawn from `A-Z0-9`. Production uses [`RandomCodes`]; tests and
//! reproducible batch runs use [`SeededCodes`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces verification codes.
pub trait CodeSource {
    fn next_code(&mut self, length: usize) -> String;
}

fn draw_code<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Codes from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl CodeSource for RandomCodes {
    fn next_code(&mut self, length: usize) -> String {
        draw_code(&mut rand::thread_rng(), length)
    }
}

/// Deterministic codes from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededCodes {
    rng: StdRng,
}

impl SeededCodes {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CodeSource for SeededCodes {
    fn next_code(&mut self, length: usize) -> String {
        draw_code(&mut self.rng, length)
    }
}

/// Pick a seeded source when a seed is configured.
pub fn code_source(seed: Option<u64>) -> Box<dyn CodeSource + Send> {
    match seed {
        Some(seed) => Box::new(SeededCodes::new(seed)),
        None => Box::new(RandomCodes),
    }
}
