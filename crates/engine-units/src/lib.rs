// SPDX-License-Identifier: LGPL-3.0-or-later

//! # engine-units
//!
//! Real-time audio engine primitives.
//!
//! This crate provides the two performance-critical leaves of an audio
//! pipeline:
//!
//! - **Transport**: a lock-free single-producer/single-consumer ring buffer
//!   ([`transport::ring_buffer`]) for moving fixed-size element streams
//!   between the audio callback thread and a control thread without blocking
//!   or allocating.
//! - **Dynamics**: a feed-forward compressor/limiter
//!   ([`dynamics::compressor`]) that computes and applies a time-varying gain
//!   envelope to multichannel sample blocks, with optional automatic
//!   parameter adaptation and look-ahead.
//!
//! The two components are independent and composable; neither depends on the
//! other. Both are allocation-free after construction and bounded-time in
//! their hot paths, as required on audio render deadlines.

pub mod consts;
pub mod dynamics;
pub mod transport;
pub mod units;
