// SPDX-License-Identifier: LGPL-3.0-or-later

//! Dynamics processing: feed-forward compression and limiting.

pub mod compressor;
pub mod sliding_hold;
