//! Scripted `DeterministicRng` implementations for dice tests.

use cortex_core::rng::DeterministicRng;

/// Always returns `min`. On a d8 every die lands on 1: zero successes and no
/// overclock.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Returns faces from a fixed script, in order. Use it to pin every die of a
/// cascade, companions included.
#[derive(Debug)]
pub struct SequenceRng {
    faces: Vec<u32>,
    cursor: usize,
}

impl SequenceRng {
    /// Creates a generator that replays `faces`.
    #[must_use]
    pub fn new(faces: Vec<u32>) -> Self {
        Self { faces, cursor: 0 }
    }

    /// Number of faces drawn so far.
    #[must_use]
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl DeterministicRng for SequenceRng {
    /// # Panics
    ///
    /// Panics when the script is exhausted or a scripted face falls outside
    /// `[min, max]`; both mean the test scripted the wrong number of dice.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let face = *self
            .faces
            .get(self.cursor)
            .unwrap_or_else(|| panic!("SequenceRng exhausted after {} draws", self.cursor));
        assert!(
            (min..=max).contains(&face),
            "scripted face {face} outside [{min}, {max}]"
        );
        self.cursor += 1;
        face
    }
}
