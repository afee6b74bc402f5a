// SPDX-License-Identifier: LGPL-3.0-or-later

//! Unit conversion functions.
//!
//! This module provides functions for converting between time, sample
//! counts, decibels, linear gain, and nepers. The dynamics processors
//! operate in the natural-log (neper) domain, so decibel parameters are
//! converted once at construction via [`db_to_neper`].

use std::f32::consts::LN_10;

/// Convert seconds to sample count.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `time` - Time in seconds
///
/// # Returns
/// Number of samples
#[inline]
pub fn seconds_to_samples(sr: f32, time: f32) -> f32 {
    time * sr
}

/// Convert sample count to seconds.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `samples` - Number of samples
///
/// # Returns
/// Time in seconds
#[inline]
pub fn samples_to_seconds(sr: f32, samples: f32) -> f32 {
    samples / sr
}

/// Convert milliseconds to sample count.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `time` - Time in milliseconds
///
/// # Returns
/// Number of samples
#[inline]
pub fn millis_to_samples(sr: f32, time: f32) -> f32 {
    time * sr / 1000.0
}

/// Convert sample count to milliseconds.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `samples` - Number of samples
///
/// # Returns
/// Time in milliseconds
#[inline]
pub fn samples_to_millis(sr: f32, samples: f32) -> f32 {
    samples * 1000.0 / sr
}

/// Convert decibels to linear gain (amplitude ratio).
///
/// # Arguments
/// * `db` - Level in decibels
///
/// # Returns
/// Linear gain (amplitude ratio)
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    (db * (LN_10 / 20.0)).exp()
}

/// Convert linear gain (amplitude ratio) to decibels.
///
/// # Arguments
/// * `gain` - Linear gain (amplitude ratio)
///
/// # Returns
/// Level in decibels
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}

/// Convert decibels to nepers (natural-log amplitude units).
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Value in nepers
#[inline]
pub fn db_to_neper(db: f32) -> f32 {
    db * (LN_10 / 20.0)
}

/// Convert nepers to decibels.
///
/// # Arguments
/// * `neper` - Value in nepers
///
/// # Returns
/// Value in decibels
#[inline]
pub fn neper_to_db(neper: f32) -> f32 {
    neper * (20.0 / LN_10)
}

/// Convert nepers to linear gain.
///
/// # Arguments
/// * `neper` - Value in nepers
///
/// # Returns
/// Linear gain
#[inline]
pub fn neper_to_gain(neper: f32) -> f32 {
    neper.exp()
}

/// Convert linear gain to nepers.
///
/// # Arguments
/// * `gain` - Linear gain
///
/// # Returns
/// Value in nepers
#[inline]
pub fn gain_to_neper(gain: f32) -> f32 {
    gain.ln()
}
