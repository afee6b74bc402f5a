// SPDX-License-Identifier: LGPL-3.0-or-later

//! Processing constants.
//!
//! This module provides the fixed block geometry and the numeric clamp
//! bounds shared by the processing modules.

/// Maximum number of samples processed per block. Always a power of two.
pub const BLOCK_SIZE: usize = 1024;

const _: () = assert!(BLOCK_SIZE.is_power_of_two());

/// Minimum amplitude admitted into a logarithm (keeps `ln()` finite).
pub const FLOAT_LOG_MIN: f32 = 1e-6;

/// Lower clamp for squared signal levels in the crest-factor detector.
pub const SQUARED_LEVEL_MIN: f32 = 1e-6;

/// Upper clamp for squared signal levels in the crest-factor detector.
pub const SQUARED_LEVEL_MAX: f32 = 1e6;

/// Smoothing window of the crest-factor detector (seconds).
pub const CREST_TIME: f32 = 0.2;

/// Smoothing window of the gain-deviation adaptation (seconds).
pub const ADAPT_TIME: f32 = 2.0;
