// SPDX-License-Identifier: LGPL-3.0-or-later

//! Lock-free transport between audio and control threads.

pub mod ring_buffer;
