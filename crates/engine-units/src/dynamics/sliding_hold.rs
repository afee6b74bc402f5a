// SPDX-License-Identifier: LGPL-3.0-or-later

//! Sliding-window maximum with fixed hold length.
//!
//! Follows the input level with an instant attack and a fixed-duration hold
//! before an instant release to the next-highest level inside the window.
//! Implemented as a descending-maxima monotonic queue over a fixed circular
//! array, giving O(1) amortized updates with no allocation on the audio
//! render path. Sample indices are block-relative; after each block the
//! retained expiry indices are shifted down by the block length.

use crate::consts::BLOCK_SIZE;

/// Sliding-window maximum tracker over a trailing window of fixed length.
///
/// Candidate maxima and their expiry indices live in circular arrays indexed
/// between `upper_index` (the current maximum, oldest candidate) and
/// `lower_index` (the newest candidate). Values between the two are strictly
/// descending; expiries are strictly ascending.
///
/// A window length of one is degenerate (the maximum is always the newest
/// sample) and is not supported; callers fold that case into a plain peak
/// detector.
#[derive(Debug, Clone)]
pub struct SlidingHold {
    /// Candidate window maxima, newest at `lower_index`.
    values: [f32; BLOCK_SIZE],
    /// Block-relative sample index at which each candidate stops counting.
    expiries: [usize; BLOCK_SIZE],
    /// Index of the newest candidate.
    lower_index: usize,
    /// Index of the current maximum (oldest live candidate).
    upper_index: usize,
    /// Window length in samples.
    length: usize,
}

impl SlidingHold {
    /// Create a tracker for a trailing window of `length` samples.
    ///
    /// # Arguments
    /// * `length` - Window length; must be in `2..BLOCK_SIZE`
    pub fn new(length: usize) -> Self {
        debug_assert!(length > 1, "single-sample hold window is unsupported");
        debug_assert!(length < BLOCK_SIZE);
        let mut hold = Self {
            values: [0.0; BLOCK_SIZE],
            expiries: [0; BLOCK_SIZE],
            lower_index: 0,
            upper_index: 0,
            length,
        };
        // Seed with a sentinel that any real sample replaces.
        hold.values[0] = f32::NEG_INFINITY;
        hold.expiries[0] = length;
        hold
    }

    /// Push the sample at block-relative index `i` and return the maximum
    /// over the trailing window.
    ///
    /// Ties favor the newly pushed value, refreshing its expiry.
    pub fn update(&mut self, i: usize, value: f32) -> f32 {
        const MASK: usize = BLOCK_SIZE - 1;
        let length = self.length;
        let mut lower_index = self.lower_index;
        let mut upper_index = self.upper_index;

        if i >= self.expiries[upper_index] {
            upper_index = (upper_index + 1) & MASK;
        }

        if value >= self.values[upper_index] {
            // New window maximum: the queue collapses to this single entry.
            self.values[upper_index] = value;
            self.expiries[upper_index] = i + length;
            lower_index = upper_index;
        } else {
            // Walk back from the newest entry until one dominates the
            // newcomer, wrapping at the circular bounds. The comparison is
            // written negated so a NaN input terminates the scan.
            loop {
                if !(value >= self.values[lower_index]) {
                    break;
                }
                lower_index = if lower_index == 0 { MASK } else { lower_index - 1 };
            }
            lower_index = (lower_index + 1) & MASK;
            self.values[lower_index] = value;
            self.expiries[lower_index] = i + length;
        }

        self.lower_index = lower_index;
        self.upper_index = upper_index;

        self.values[upper_index]
    }

    /// Rebase the retained expiry indices after a block of `n` samples.
    ///
    /// Only entries between the upper and lower index (with wrap-around) are
    /// live; everything outside that range is dead and left untouched.
    pub fn shift(&mut self, n: usize) {
        if self.lower_index < self.upper_index {
            for expiry in &mut self.expiries[self.upper_index..] {
                *expiry -= n;
            }
            for expiry in &mut self.expiries[..=self.lower_index] {
                *expiry -= n;
            }
        } else {
            for expiry in &mut self.expiries[self.upper_index..=self.lower_index] {
                *expiry -= n;
            }
        }
    }
}
