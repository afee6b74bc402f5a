// SPDX-License-Identifier: LGPL-3.0-or-later

//! Feed-forward dynamics compressor/limiter.
//!
//! Computes a time-varying gain envelope from a channel-linked control
//! signal and applies it to multichannel sample blocks in place. The
//! side-chain operates in the natural-log (neper) domain to better match
//! hearing, and can apply basic automation to knee width, attack/release
//! times, make-up (post) gain, and clipping reduction.
//!
//! The per-block pipeline:
//!
//! 1. Static pre-gain.
//! 2. Channel linking: the absolute maximum across channels forms one
//!    control signal, so channels compress coherently instead of panning
//!    under independent gain changes.
//! 3. Crest-factor detection (when attack/release automation is on).
//! 4. Peak detection in the log domain, optionally extended by a
//!    sliding-window hold ([`SlidingHold`]).
//! 5. Gain computation: soft-knee curve plus a two-stage decoupled peak
//!    detector for the ballistics.
//! 6. Signal delay (look-ahead), rotating each channel against a persistent
//!    delay line.
//! 7. Gain application.
//! 8. Side-chain tail carry into the next block.
//!
//! All working buffers are sized at construction; the per-block path does
//! not allocate.

use crate::consts::{
    ADAPT_TIME, BLOCK_SIZE, CREST_TIME, FLOAT_LOG_MIN, SQUARED_LEVEL_MAX, SQUARED_LEVEL_MIN,
};
use crate::dynamics::sliding_hold::SlidingHold;
use crate::units::{db_to_gain, db_to_neper};

/// One channel's worth of block samples.
pub type BufferLine = [f32; BLOCK_SIZE];

/// Automation switches. Each one replaces a static parameter with a value
/// derived from the signal at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoFlags {
    /// Derive the knee width from the smoothed gain deviation. Treats the
    /// processor as a limiter: the slope is forced to -1 and the varying
    /// knee sweeps the effective ratio.
    pub knee: bool,
    /// Derive the attack time per sample from the crest factor.
    pub attack: bool,
    /// Derive the release time per sample from the crest factor.
    pub release: bool,
    /// Derive the make-up (post) gain from the smoothed gain deviation.
    pub post_gain: bool,
    /// Bias the deviation to suppress clipping at the current output level.
    /// Only honored together with `post_gain`.
    pub declip: bool,
}

/// Construction parameters, in physical units.
///
/// Times are seconds, levels are decibels. Values are clamped into their
/// valid ranges at construction rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Number of channels per block.
    pub num_channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Automation switches.
    pub auto: AutoFlags,
    /// Look-ahead time in seconds; clamped to `[0, BLOCK_SIZE-1]` samples.
    pub look_ahead_time: f32,
    /// Hold window in seconds; clamped to `[0, BLOCK_SIZE-1]` samples.
    pub hold_time: f32,
    /// Input gain in dB.
    pub pre_gain_db: f32,
    /// Make-up gain in dB (starting value when automated).
    pub post_gain_db: f32,
    /// Compression threshold in dB.
    pub threshold_db: f32,
    /// Compression ratio (floored at 1).
    pub ratio: f32,
    /// Knee width in dB.
    pub knee_db: f32,
    /// Attack time in seconds; floored at one sample.
    pub attack_time: f32,
    /// Release time in seconds; floored at one sample.
    pub release_time: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            num_channels: 2,
            sample_rate: 48000.0,
            auto: AutoFlags::default(),
            look_ahead_time: 0.0,
            hold_time: 0.0,
            pre_gain_db: 0.0,
            post_gain_db: 0.0,
            threshold_db: 0.0,
            ratio: 1.0,
            knee_db: 0.0,
            attack_time: 0.01,
            release_time: 0.1,
        }
    }
}

/// Feed-forward compressor/limiter over multichannel blocks.
///
/// Static configuration is fixed at construction; per-block state (envelope
/// followers, level estimates, hold window, delay lines) persists across
/// [`process`](Self::process) calls for the lifetime of the stream. One
/// instance serves one channel group and is not meant for concurrent use.
///
/// # Examples
/// ```
/// use engine_units::consts::BLOCK_SIZE;
/// use engine_units::dynamics::compressor::{Compressor, CompressorParams};
///
/// let params = CompressorParams {
///     num_channels: 1,
///     threshold_db: -12.0,
///     ratio: 4.0,
///     attack_time: 0.005,
///     release_time: 0.1,
///     ..CompressorParams::default()
/// };
/// let mut comp = Compressor::new(&params);
///
/// let mut block = vec![[0.25f32; BLOCK_SIZE]];
/// comp.process(BLOCK_SIZE, &mut block);
/// ```
pub struct Compressor {
    auto: AutoFlags,
    num_channels: usize,
    /// Look-ahead length in samples.
    look_ahead: usize,

    /// Input gain, linear.
    pre_gain: f32,
    /// Make-up gain in nepers (starting value when automated).
    post_gain: f32,
    /// Threshold in nepers.
    threshold: f32,
    /// Compression slope: `1/ratio - 1`, or -1 under knee automation.
    slope: f32,
    /// Knee width in nepers.
    knee: f32,
    /// Attack time in samples.
    attack: f32,
    /// Release time in samples.
    release: f32,

    /// One-pole coefficient of the 200 ms crest-factor smoother.
    crest_coeff: f32,
    /// Hot-start estimate of the gain reduction target.
    gain_estimate: f32,
    /// One-pole coefficient of the 2 s deviation smoother.
    adapt_coeff: f32,

    // State carried between blocks
    last_peak_sq: f32,
    last_rms_sq: f32,
    last_release: f32,
    last_attack: f32,
    last_gain_dev: f32,

    /// Sliding hold window, present when the hold length exceeds one.
    hold: Option<Box<SlidingHold>>,
    /// Per-channel look-ahead delay lines, present when look-ahead > 0.
    delay: Vec<BufferLine>,

    /// Control signal scratch: `look_ahead` carried samples followed by the
    /// current block.
    side_chain: Box<[f32; 2 * BLOCK_SIZE]>,
    /// Squared crest factor per sample (attack/release automation).
    crest_factor: Box<BufferLine>,
}

impl Compressor {
    /// Create a compressor for a fixed channel group.
    ///
    /// Decibel parameters are converted to the log domain, times to sample
    /// counts, and everything is clamped into valid ranges (see
    /// [`CompressorParams`]). A hold window of one sample degenerates to the
    /// plain peak detector and allocates no tracker.
    pub fn new(params: &CompressorParams) -> Self {
        let sr = params.sample_rate;
        let max_samples = (BLOCK_SIZE - 1) as f32;
        let look_ahead = (params.look_ahead_time * sr).round().clamp(0.0, max_samples) as usize;
        let hold = (params.hold_time * sr).round().clamp(0.0, max_samples) as usize;

        // Knee automation treats the processor as a limiter: by varying the
        // knee width it applies compression over a wide range of effective
        // ratios, so the static slope is pinned to full limiting.
        let slope = if params.auto.knee {
            -1.0
        } else {
            1.0 / params.ratio.max(1.0) - 1.0
        };
        let threshold = db_to_neper(params.threshold_db);

        Self {
            auto: AutoFlags {
                declip: params.auto.post_gain && params.auto.declip,
                ..params.auto
            },
            num_channels: params.num_channels,
            look_ahead,
            pre_gain: db_to_gain(params.pre_gain_db),
            post_gain: db_to_neper(params.post_gain_db),
            threshold,
            slope,
            knee: db_to_neper(params.knee_db).max(0.0),
            attack: (params.attack_time * sr).max(1.0),
            release: (params.release_time * sr).max(1.0),
            crest_coeff: (-1.0 / (CREST_TIME * sr)).exp(),
            gain_estimate: threshold * -0.5 * slope,
            adapt_coeff: (-1.0 / (ADAPT_TIME * sr)).exp(),
            last_peak_sq: 0.0,
            last_rms_sq: 0.0,
            last_release: 0.0,
            last_attack: 0.0,
            last_gain_dev: 0.0,
            hold: (hold > 1).then(|| Box::new(SlidingHold::new(hold))),
            delay: if look_ahead > 0 {
                vec![[0.0; BLOCK_SIZE]; params.num_channels]
            } else {
                Vec::new()
            },
            side_chain: Box::new([0.0; 2 * BLOCK_SIZE]),
            crest_factor: Box::new([0.0; BLOCK_SIZE]),
        }
    }

    /// Look-ahead length in samples (the processor's latency).
    pub fn look_ahead(&self) -> usize {
        self.look_ahead
    }

    /// Number of channels per block.
    pub fn channels(&self) -> usize {
        self.num_channels
    }

    /// Compress `count` samples of every channel in place.
    ///
    /// # Arguments
    /// * `count` - Samples to process, in `1..=BLOCK_SIZE`
    /// * `channels` - One [`BufferLine`] per channel, mutated in place
    pub fn process(&mut self, count: usize, channels: &mut [BufferLine]) {
        debug_assert!(count > 0 && count <= BLOCK_SIZE);
        debug_assert_eq!(channels.len(), self.num_channels);

        let pre_gain = self.pre_gain;
        if pre_gain != 1.0 {
            for line in channels.iter_mut() {
                for sample in &mut line[..count] {
                    *sample *= pre_gain;
                }
            }
        }

        self.link_channels(count, channels);

        if self.auto.attack || self.auto.release {
            self.crest_detector(count);
        }

        if self.hold.is_some() {
            self.peak_hold_detector(count);
        } else {
            self.peak_detector(count);
        }

        self.gain_compressor(count);

        if !self.delay.is_empty() {
            self.signal_delay(count, channels);
        }

        for line in channels.iter_mut() {
            for (sample, &gain) in line[..count].iter_mut().zip(&self.side_chain[..count]) {
                *sample *= gain;
            }
        }

        // The gain for the trailing look-ahead portion of the control signal
        // has not been computed against future samples yet; carry it to the
        // front for the next block.
        self.side_chain.copy_within(count..count + self.look_ahead, 0);
    }

    /// Link channels into one control signal: the absolute maximum across
    /// all channels at every sample position.
    fn link_channels(&mut self, count: usize, channels: &[BufferLine]) {
        let side = &mut self.side_chain[self.look_ahead..self.look_ahead + count];
        side.fill(0.0);
        for line in channels {
            for (ctrl, &sample) in side.iter_mut().zip(&line[..count]) {
                *ctrl = ctrl.max(sample.abs());
            }
        }
    }

    /// Squared crest factor of the control signal, for attack/release
    /// automation: an instantaneous squared-peak detector over a squared-RMS
    /// detector, both smoothed over the fixed 200 ms window.
    fn crest_detector(&mut self, count: usize) {
        let a_crest = self.crest_coeff;
        let mut y2_peak = self.last_peak_sq;
        let mut y2_rms = self.last_rms_sq;

        let side = &self.side_chain[self.look_ahead..self.look_ahead + count];
        for (crest, &x_abs) in self.crest_factor[..count].iter_mut().zip(side) {
            let x2 = (x_abs * x_abs).clamp(SQUARED_LEVEL_MIN, SQUARED_LEVEL_MAX);
            y2_peak = x2.max(lerp(x2, y2_peak, a_crest));
            y2_rms = lerp(x2, y2_rms, a_crest);
            *crest = y2_peak / y2_rms;
        }

        self.last_peak_sq = y2_peak;
        self.last_rms_sq = y2_rms;
    }

    /// Convert the control signal to the log domain, clamped away from zero.
    fn peak_detector(&mut self, count: usize) {
        for ctrl in &mut self.side_chain[self.look_ahead..self.look_ahead + count] {
            *ctrl = ctrl.max(FLOAT_LOG_MIN).ln();
        }
    }

    /// Log-domain peak detection extended by the sliding hold window, so
    /// fast transients register for the full hold duration.
    fn peak_hold_detector(&mut self, count: usize) {
        let Some(hold) = self.hold.as_deref_mut() else {
            return;
        };
        for (i, ctrl) in self.side_chain[self.look_ahead..self.look_ahead + count]
            .iter_mut()
            .enumerate()
        {
            let x_log = ctrl.max(FLOAT_LOG_MIN).ln();
            *ctrl = hold.update(i, x_log);
        }
        hold.shift(count);
    }

    /// The gain computer: soft-knee curve, per-sample automation, and the
    /// two-stage decoupled peak detector for the ballistics. Overwrites the
    /// first `count` side-chain samples with linear gains.
    fn gain_compressor(&mut self, count: usize) {
        let auto_knee = self.auto.knee;
        let auto_attack = self.auto.attack;
        let auto_release = self.auto.release;
        let auto_post_gain = self.auto.post_gain;
        let auto_declip = self.auto.declip;
        let threshold = self.threshold;
        let slope = self.slope;
        let attack = self.attack;
        let release = self.release;
        let c_est = self.gain_estimate;
        let a_adp = self.adapt_coeff;
        let look_ahead = self.look_ahead;

        let mut post_gain = self.post_gain;
        let mut knee = self.knee;
        let mut t_att = attack;
        let mut t_rel = release - attack;
        let mut a_att = (-1.0 / t_att).exp();
        let mut a_rel = (-1.0 / t_rel).exp();
        let mut y_1 = self.last_release;
        let mut y_l = self.last_attack;
        let mut c_dev = self.last_gain_dev;

        for i in 0..count {
            if auto_knee {
                knee = (2.5 * (c_dev + c_est)).max(0.0);
            }
            let knee_h = 0.5 * knee;

            // Static compression curve on the look-ahead control signal:
            // zero below the knee, quadratic blend inside it, linear above.
            let x_over = self.side_chain[i + look_ahead] - threshold;
            let y_g = if x_over <= -knee_h {
                0.0
            } else if x_over.abs() < knee_h {
                (x_over + knee_h) * (x_over + knee_h) / (2.0 * knee)
            } else {
                x_over
            };

            let y2_crest = self.crest_factor[i];
            if auto_attack {
                t_att = 2.0 * attack / y2_crest;
                a_att = (-1.0 / t_att).exp();
            }
            if auto_release {
                t_rel = 2.0 * release / y2_crest - t_att;
                a_rel = (-1.0 / t_rel).exp();
            }

            // Gain smoothing is a smooth decoupled peak detector: the
            // release stage takes the instant maximum of the target and its
            // own decay, feeding the attack stage. The attack time was
            // subtracted from the release time above to compensate for the
            // chained stages.
            let x_l = -slope * y_g;
            y_1 = x_l.max(lerp(x_l, y_1, a_rel));
            y_l = lerp(y_1, y_l, a_att);

            // Knee and make-up automation run on a smoothed deviation
            // between the gain target and the hot-start estimate.
            c_dev = lerp(-(y_l + c_est), c_dev, a_adp);

            let input = self.side_chain[i];
            if auto_post_gain {
                if auto_declip {
                    // Attenuate further when the output would clip at the
                    // current level; the long adaptation keeps it down.
                    c_dev = c_dev.max(input - y_l - threshold - c_est);
                }
                post_gain = -(c_dev + c_est);
            }

            self.side_chain[i] = (post_gain - y_l).exp();
        }

        self.last_release = y_1;
        self.last_attack = y_l;
        self.last_gain_dev = c_dev;
    }

    /// Delay every channel by the look-ahead length against its persistent
    /// delay line, aligning the signal with gain computed from a control
    /// signal that ran ahead of it. In-place rotate-and-swap; no allocation.
    fn signal_delay(&mut self, count: usize, channels: &mut [BufferLine]) {
        let look_ahead = self.look_ahead;

        for (line, delay) in channels.iter_mut().zip(self.delay.iter_mut()) {
            let inout = &mut line[..count];
            let delay_buf = &mut delay[..look_ahead];

            if count >= look_ahead {
                inout.rotate_right(look_ahead);
                inout[..look_ahead].swap_with_slice(delay_buf);
            } else {
                inout.swap_with_slice(&mut delay_buf[..count]);
                delay_buf.rotate_left(count);
            }
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::neper_to_gain;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn mono_params() -> CompressorParams {
        CompressorParams {
            num_channels: 1,
            ..CompressorParams::default()
        }
    }

    fn block(value: f32) -> Vec<BufferLine> {
        vec![[value; BLOCK_SIZE]]
    }

    #[test]
    fn test_identity_at_unity_ratio() {
        // Ratio 1 and zero pre/post gain leave the signal untouched.
        let params = CompressorParams {
            ratio: 1.0,
            threshold_db: -20.0,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        let mut channels = vec![[0.0f32; BLOCK_SIZE]];
        for (i, sample) in channels[0].iter_mut().enumerate() {
            *sample = (i as f32 * 0.013).sin() * 0.9;
        }
        let reference = channels[0];

        for _ in 0..4 {
            comp.process(BLOCK_SIZE, &mut channels);
            assert_eq!(
                channels[0], reference,
                "unity ratio must be bit-exact identity"
            );
        }
    }

    #[test]
    fn test_steady_state_convergence() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_time: 0.001,
            release_time: 0.05,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        // Constant 0.5 (about -6 dB) is well above the -20 dB threshold.
        let mut channels = block(0.5);
        for _ in 0..50 {
            channels[0] = [0.5; BLOCK_SIZE];
            comp.process(BLOCK_SIZE, &mut channels);
        }

        channels[0] = [0.5; BLOCK_SIZE];
        comp.process(BLOCK_SIZE, &mut channels);

        // Converged: the whole block sits at one stable gain.
        let first = channels[0][0];
        for (i, &sample) in channels[0].iter().enumerate() {
            assert!(
                (sample - first).abs() < 1e-4,
                "gain still moving at sample {i}: {sample} vs {first}"
            );
        }

        // Expected gain: exp(slope * overshoot) with slope = 1/4 - 1.
        let overshoot = (0.5f32).ln() - db_to_neper(-20.0);
        let expected = 0.5 * (-0.75 * overshoot).exp();
        assert!(
            (first - expected).abs() < 1e-3,
            "steady-state output {first} differs from expected {expected}"
        );
    }

    #[test]
    fn test_signals_below_threshold_pass_unchanged() {
        let params = CompressorParams {
            threshold_db: -6.0,
            ratio: 8.0,
            knee_db: 0.0,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        // -40 dB input sits far below the threshold and the knee.
        let mut channels = block(0.01);
        comp.process(BLOCK_SIZE, &mut channels);
        for &sample in channels[0].iter() {
            assert!(
                (sample - 0.01).abs() < 1e-7,
                "sub-threshold signal was altered: {sample}"
            );
        }
    }

    #[test]
    fn test_pre_and_post_gain() {
        let params = CompressorParams {
            pre_gain_db: 6.0,
            post_gain_db: -6.0,
            ratio: 1.0,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        let mut channels = block(0.1);
        comp.process(BLOCK_SIZE, &mut channels);

        let expected = 0.1 * db_to_gain(6.0) * neper_to_gain(db_to_neper(-6.0));
        for &sample in channels[0].iter() {
            assert!(
                (sample - expected).abs() < 1e-6,
                "pre/post gain mismatch: {sample} vs {expected}"
            );
        }
    }

    #[test]
    fn test_look_ahead_delays_signal() {
        let sr = 48000.0;
        let look_ahead = 64usize;
        let params = CompressorParams {
            ratio: 1.0,
            look_ahead_time: look_ahead as f32 / sr,
            sample_rate: sr,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);
        assert_eq!(comp.look_ahead(), look_ahead);

        let mut input = [0.0f32; BLOCK_SIZE];
        for (i, sample) in input.iter_mut().enumerate() {
            *sample = (i + 1) as f32 * 1e-3;
        }

        let mut channels = vec![input];
        comp.process(BLOCK_SIZE, &mut channels);

        // The delay line starts zeroed, so the first look_ahead samples of
        // the very first block are silence.
        for (i, &sample) in channels[0][..look_ahead].iter().enumerate() {
            assert_eq!(sample, 0.0, "expected initial silence at sample {i}");
        }
        // The rest is the input shifted by exactly look_ahead (gain is unity
        // at ratio 1).
        for i in look_ahead..BLOCK_SIZE {
            assert!(
                (channels[0][i] - input[i - look_ahead]).abs() < 1e-7,
                "time shift broken at sample {i}"
            );
        }

        // The next block starts with the tail the delay line retained.
        let mut second = vec![[0.0f32; BLOCK_SIZE]];
        comp.process(BLOCK_SIZE, &mut second);
        for i in 0..look_ahead {
            assert!(
                (second[0][i] - input[BLOCK_SIZE - look_ahead + i]).abs() < 1e-7,
                "carried tail broken at sample {i}"
            );
        }
    }

    #[test]
    fn test_look_ahead_partial_blocks() {
        // Blocks shorter than the look-ahead length exercise the swap-then-
        // rotate path of the delay.
        let sr = 48000.0;
        let look_ahead = 64usize;
        let params = CompressorParams {
            ratio: 1.0,
            look_ahead_time: look_ahead as f32 / sr,
            sample_rate: sr,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        let mut expected_stream: Vec<f32> = Vec::new();
        let mut produced: Vec<f32> = Vec::new();
        let mut next = 1.0f32;

        for &count in &[24usize, 16, 40, 64, 8, 128] {
            let mut channels = vec![[0.0f32; BLOCK_SIZE]];
            for sample in &mut channels[0][..count] {
                *sample = next;
                expected_stream.push(next);
                next += 1.0;
            }
            comp.process(count, &mut channels);
            produced.extend_from_slice(&channels[0][..count]);
        }

        // Output equals the input stream shifted by look_ahead zeros.
        for (i, &got) in produced.iter().enumerate() {
            let expected = if i < look_ahead {
                0.0
            } else {
                expected_stream[i - look_ahead]
            };
            assert!(
                (got - expected).abs() < 1e-6,
                "stream shift broken at sample {i}: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn test_channels_compress_coherently() {
        let params = CompressorParams {
            num_channels: 2,
            threshold_db: -20.0,
            ratio: 10.0,
            attack_time: 0.001,
            release_time: 0.02,
            ..CompressorParams::default()
        };
        let mut comp = Compressor::new(&params);

        // A loud left channel must pull the quiet right channel down by the
        // same per-sample gain.
        let mut channels = vec![[0.8f32; BLOCK_SIZE], [0.05f32; BLOCK_SIZE]];
        for _ in 0..20 {
            channels[0] = [0.8; BLOCK_SIZE];
            channels[1] = [0.05; BLOCK_SIZE];
            comp.process(BLOCK_SIZE, &mut channels);
        }

        for i in 0..BLOCK_SIZE {
            let gain_left = channels[0][i] / 0.8;
            let gain_right = channels[1][i] / 0.05;
            assert!(
                (gain_left - gain_right).abs() < 1e-5,
                "unlinked gain at sample {i}: {gain_left} vs {gain_right}"
            );
        }
        assert!(
            channels[1][BLOCK_SIZE - 1] < 0.05,
            "linked compression must also reduce the quiet channel"
        );
    }

    #[test]
    fn test_hold_extends_peak_influence() {
        let sr = 48000.0;
        let hold = 128usize;
        let base = CompressorParams {
            threshold_db: -30.0,
            ratio: 20.0,
            attack_time: 0.0005,
            release_time: 0.002,
            sample_rate: sr,
            ..mono_params()
        };
        let with_hold = CompressorParams {
            hold_time: hold as f32 / sr,
            ..base
        };

        let mut comp_plain = Compressor::new(&base);
        let mut comp_hold = Compressor::new(&with_hold);

        // One transient at the start of the block, silence after.
        let mut impulse = [1e-4f32; BLOCK_SIZE];
        impulse[0] = 0.9;

        let mut plain = vec![impulse];
        comp_plain.process(BLOCK_SIZE, &mut plain);
        let mut held = vec![impulse];
        comp_hold.process(BLOCK_SIZE, &mut held);

        // While the hold window covers the transient, gain reduction stays
        // pinned; without it the release recovers sooner.
        let mid = hold / 2;
        assert!(
            held[0][mid] <= plain[0][mid] + 1e-9,
            "hold should keep gain reduced: {} vs {}",
            held[0][mid],
            plain[0][mid]
        );
        assert!(
            held[0][mid] < plain[0][mid],
            "hold had no effect inside the window"
        );
    }

    #[test]
    fn test_single_sample_hold_degenerates_to_peak_detector() {
        let sr = 48000.0;
        let base = CompressorParams {
            threshold_db: -12.0,
            ratio: 4.0,
            sample_rate: sr,
            ..mono_params()
        };
        // One sample of hold: exactly the sample itself, i.e. no hold.
        let degenerate = CompressorParams {
            hold_time: 1.0 / sr,
            ..base
        };

        let mut comp_plain = Compressor::new(&base);
        let mut comp_degenerate = Compressor::new(&degenerate);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..3 {
            let mut line = [0.0f32; BLOCK_SIZE];
            for sample in &mut line {
                *sample = rng.gen_range(-1.0..1.0);
            }
            let mut a = vec![line];
            let mut b = vec![line];
            comp_plain.process(BLOCK_SIZE, &mut a);
            comp_degenerate.process(BLOCK_SIZE, &mut b);
            assert_eq!(a[0], b[0], "hold of one sample must match no hold");
        }
    }

    #[test]
    fn test_declip_bounds_output_at_threshold() {
        let params = CompressorParams {
            auto: AutoFlags {
                knee: true,
                attack: true,
                release: true,
                post_gain: true,
                declip: true,
            },
            threshold_db: -3.0,
            attack_time: 0.002,
            release_time: 0.2,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        let ceiling = db_to_gain(-3.0);
        for _ in 0..30 {
            let mut channels = block(0.9);
            comp.process(BLOCK_SIZE, &mut channels);
            for (i, &sample) in channels[0].iter().enumerate() {
                assert!(
                    sample.abs() <= ceiling * (1.0 + 1e-4),
                    "declip ceiling exceeded at sample {i}: {sample}"
                );
            }
        }
    }

    #[test]
    fn test_declip_ignored_without_post_gain_automation() {
        let params = CompressorParams {
            auto: AutoFlags {
                declip: true,
                ..AutoFlags::default()
            },
            ratio: 1.0,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        // Declip without post-gain automation is inert: unity ratio stays an
        // identity.
        let mut channels = block(0.9);
        comp.process(BLOCK_SIZE, &mut channels);
        for &sample in channels[0].iter() {
            assert_eq!(sample, 0.9);
        }
    }

    #[test]
    fn test_automation_produces_finite_output() {
        let params = CompressorParams {
            auto: AutoFlags {
                knee: true,
                attack: true,
                release: true,
                post_gain: true,
                declip: true,
            },
            threshold_db: -6.0,
            look_ahead_time: 0.002,
            hold_time: 0.001,
            attack_time: 0.003,
            release_time: 0.1,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);

        let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
        for block_index in 0..16 {
            let count = 1 + rng.gen_range(0..BLOCK_SIZE);
            let mut channels = vec![[0.0f32; BLOCK_SIZE]];
            for sample in &mut channels[0][..count] {
                *sample = rng.gen_range(-1.5..1.5);
            }
            comp.process(count, &mut channels);
            for (i, &sample) in channels[0][..count].iter().enumerate() {
                assert!(
                    sample.is_finite(),
                    "non-finite output in block {block_index} at sample {i}"
                );
            }
        }
    }

    #[test]
    fn test_parameter_clamping() {
        // Zero/negative times and ratios below one are floored, oversized
        // look-ahead and hold are clamped to the block capacity.
        let params = CompressorParams {
            ratio: 0.0,
            attack_time: 0.0,
            release_time: -1.0,
            look_ahead_time: 10.0,
            hold_time: 10.0,
            ..mono_params()
        };
        let mut comp = Compressor::new(&params);
        assert_eq!(comp.look_ahead(), BLOCK_SIZE - 1);

        let mut channels = block(0.5);
        comp.process(BLOCK_SIZE, &mut channels);
        for &sample in channels[0].iter() {
            assert!(sample.is_finite());
        }
    }

    #[test]
    fn test_gain_reduction_increases_with_ratio() {
        let mut outputs = Vec::new();
        for ratio in [2.0, 4.0, 10.0] {
            let params = CompressorParams {
                threshold_db: -20.0,
                ratio,
                attack_time: 0.001,
                release_time: 0.02,
                ..mono_params()
            };
            let mut comp = Compressor::new(&params);
            let mut channels = block(0.5);
            for _ in 0..30 {
                channels[0] = [0.5; BLOCK_SIZE];
                comp.process(BLOCK_SIZE, &mut channels);
            }
            outputs.push(channels[0][BLOCK_SIZE - 1]);
        }
        assert!(
            outputs[0] > outputs[1] && outputs[1] > outputs[2],
            "higher ratio must reduce more: {outputs:?}"
        );
    }

    #[test]
    fn test_soft_knee_is_gentler_at_threshold() {
        let hard = CompressorParams {
            threshold_db: -12.0,
            ratio: 4.0,
            knee_db: 0.0,
            attack_time: 0.001,
            release_time: 0.02,
            ..mono_params()
        };
        let soft = CompressorParams {
            knee_db: 12.0,
            ..hard
        };

        // Probe right at the threshold, where the quadratic blend of the
        // soft knee has already begun reducing gain.
        let level = db_to_gain(-12.0);
        let mut comp_hard = Compressor::new(&hard);
        let mut comp_soft = Compressor::new(&soft);

        let mut out_hard = block(level);
        let mut out_soft = block(level);
        for _ in 0..30 {
            out_hard[0] = [level; BLOCK_SIZE];
            out_soft[0] = [level; BLOCK_SIZE];
            comp_hard.process(BLOCK_SIZE, &mut out_hard);
            comp_soft.process(BLOCK_SIZE, &mut out_soft);
        }

        let last = BLOCK_SIZE - 1;
        assert!(
            out_soft[0][last] < out_hard[0][last],
            "soft knee should already compress at the threshold: {} vs {}",
            out_soft[0][last],
            out_hard[0][last]
        );
    }
}
