//! Reset injection inside one iteration's signal window.
//!
//! A nominal window is 2 header (channel) bits, N address bits and
//! [`WAIT_BITS`] computation bits. An injected reset truncates the window so
//! that the reset bit is its last sample; where it lands decides how each of
//! the three streams is cut.

use rand::Rng;

use crate::sampler::Channel;
use crate::signal::{push_run, SignalWindow};

pub const HEADER_BITS: usize = 2;
pub const WAIT_BITS: usize = 20;
/// Upper bound (inclusive) of the idle gap appended after a reset.
pub const MAX_SETTLE_BITS: usize = 4;

/// Where a reset falls inside an iteration's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetPoint {
    NoReset,
    /// On the first channel bit, together with the rising `start`.
    HeaderEarly,
    /// On the second channel bit.
    HeaderLate,
    /// On the last of `address_bits` address bits sent so far.
    InAddress { address_bits: usize },
    /// On the last of `wait_bits` samples after `start` fell.
    InWaitPhase { wait_bits: usize },
}

impl ResetPoint {
    /// Classify a window index for an address rendered on `address_len` bits.
    pub fn classify(index: usize, address_len: usize) -> Self {
        let address_end = HEADER_BITS + address_len;
        match index {
            0 => ResetPoint::HeaderEarly,
            1 => ResetPoint::HeaderLate,
            i if i < address_end => ResetPoint::InAddress {
                address_bits: i - 1,
            },
            i if i < address_end + WAIT_BITS => ResetPoint::InWaitPhase {
                wait_bits: i - address_end + 1,
            },
            _ => ResetPoint::NoReset,
        }
    }

    pub fn is_reset(self) -> bool {
        self != ResetPoint::NoReset
    }

    /// Samples between the last high `start` and the reset bit, exclusive.
    pub fn start_low_samples(self) -> usize {
        match self {
            ResetPoint::InWaitPhase { wait_bits } => wait_bits - 1,
            _ => 0,
        }
    }
}

/// Nominal window length for an address rendered on `address_len` bits.
pub fn window_len(address_len: usize) -> usize {
    HEADER_BITS + address_len + WAIT_BITS
}

/// Draws the injection point for one iteration.
///
/// `probability` scales the draw range: the index is uniform over
/// `[0, floor(window / probability))`, so indices past the window mean no
/// reset. A `probability` of zero disables injection without drawing.
pub fn draw_reset_point<R: Rng>(address_len: usize, probability: f64, rng: &mut R) -> ResetPoint {
    if probability <= 0.0 {
        return ResetPoint::NoReset;
    }
    let bound = ((window_len(address_len) as f64 / probability).floor() as usize).max(1);
    let index = rng.gen_range(0..bound);
    ResetPoint::classify(index, address_len)
}

/// Shapes the three streams for one iteration.
pub fn build_window(channel: Channel, address_bits: &str, point: ResetPoint) -> SignalWindow {
    let [high, low] = channel.bits();
    let address_len = address_bits.len();

    let mut rst = String::new();
    let mut start = String::new();
    let mut w = String::new();

    match point {
        ResetPoint::HeaderEarly => {
            start.push('1');
            rst.push('1');
            w.push(high);
        }
        ResetPoint::HeaderLate => {
            start.push_str("11");
            rst.push_str("01");
            w.extend([high, low]);
        }
        ResetPoint::InAddress { address_bits: sent } => {
            push_run(&mut start, '1', HEADER_BITS + sent);
            push_run(&mut rst, '0', HEADER_BITS + sent - 1);
            rst.push('1');
            w.extend([high, low]);
            w.push_str(&address_bits[..sent]);
        }
        ResetPoint::InWaitPhase { wait_bits } => {
            push_run(&mut start, '1', HEADER_BITS + address_len);
            push_run(&mut start, '0', wait_bits);
            push_run(&mut rst, '0', HEADER_BITS + address_len + wait_bits - 1);
            rst.push('1');
            w.extend([high, low]);
            w.push_str(address_bits);
            push_run(&mut w, '0', wait_bits);
        }
        ResetPoint::NoReset => {
            push_run(&mut start, '1', HEADER_BITS + address_len);
            push_run(&mut start, '0', WAIT_BITS);
            push_run(&mut rst, '0', window_len(address_len));
            w.extend([high, low]);
            w.push_str(address_bits);
            push_run(&mut w, '0', WAIT_BITS);
        }
    }

    SignalWindow::new(rst, start, w)
}

/// Idle gap after a reset, 0..=[`MAX_SETTLE_BITS`] samples.
pub fn draw_settle_bits<R: Rng>(rng: &mut R) -> usize {
    rng.gen_range(0..=MAX_SETTLE_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_classify_covers_every_region() {
        // Address "101": header 0..2, address 2..5, wait 5..25.
        assert_eq!(ResetPoint::classify(0, 3), ResetPoint::HeaderEarly);
        assert_eq!(ResetPoint::classify(1, 3), ResetPoint::HeaderLate);
        assert_eq!(
            ResetPoint::classify(2, 3),
            ResetPoint::InAddress { address_bits: 1 }
        );
        assert_eq!(
            ResetPoint::classify(4, 3),
            ResetPoint::InAddress { address_bits: 3 }
        );
        assert_eq!(
            ResetPoint::classify(5, 3),
            ResetPoint::InWaitPhase { wait_bits: 1 }
        );
        assert_eq!(
            ResetPoint::classify(24, 3),
            ResetPoint::InWaitPhase { wait_bits: 20 }
        );
        assert_eq!(ResetPoint::classify(25, 3), ResetPoint::NoReset);
        assert_eq!(ResetPoint::classify(1000, 3), ResetPoint::NoReset);
    }

    #[test]
    fn test_no_reset_window_is_verbatim() {
        let window = build_window(Channel::Z2, "101", ResetPoint::NoReset);
        assert_eq!(window.start(), format!("11111{}", "0".repeat(20)));
        assert_eq!(window.rst(), "0".repeat(25));
        assert_eq!(window.w(), format!("10101{}", "0".repeat(20)));
    }

    #[test]
    fn test_header_resets() {
        let early = build_window(Channel::Z1, "101", ResetPoint::HeaderEarly);
        assert_eq!((early.start(), early.rst(), early.w()), ("1", "1", "0"));

        let late = build_window(Channel::Z1, "101", ResetPoint::HeaderLate);
        assert_eq!((late.start(), late.rst(), late.w()), ("11", "01", "01"));
    }

    #[test]
    fn test_address_reset_cuts_address_bits() {
        let window = build_window(
            Channel::Z3,
            "10110",
            ResetPoint::InAddress { address_bits: 3 },
        );
        assert_eq!(window.start(), "11111");
        assert_eq!(window.rst(), "00001");
        assert_eq!(window.w(), "11101");
    }

    #[test]
    fn test_wait_phase_reset_keeps_full_address() {
        let window = build_window(Channel::Z0, "11", ResetPoint::InWaitPhase { wait_bits: 3 });
        assert_eq!(window.start(), "1111000");
        assert_eq!(window.rst(), "0000001");
        assert_eq!(window.w(), "0011000");
    }

    #[test]
    fn test_reset_bit_is_last_sample_at_drawn_index() {
        let bits = "1001101";
        for index in 0..window_len(bits.len()) {
            let point = ResetPoint::classify(index, bits.len());
            let window = build_window(Channel::Z2, bits, point);
            assert_eq!(window.len(), index + 1, "index {index}");
            assert!(window.ends_in_reset());
            assert_eq!(window.rst().matches('1').count(), 1);
        }
    }

    #[test]
    fn test_zero_probability_never_draws() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut untouched = StdRng::seed_from_u64(1);
        assert_eq!(draw_reset_point(16, 0.0, &mut rng), ResetPoint::NoReset);
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_large_probability_always_resets_on_first_bit() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..32 {
            assert_eq!(draw_reset_point(4, 1e6, &mut rng), ResetPoint::HeaderEarly);
        }
    }

    #[test]
    fn test_unit_probability_always_resets() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..256 {
            assert!(draw_reset_point(8, 1.0, &mut rng).is_reset());
        }
    }

    #[test]
    fn test_start_low_samples() {
        assert_eq!(ResetPoint::HeaderLate.start_low_samples(), 0);
        assert_eq!(
            ResetPoint::InWaitPhase { wait_bits: 5 }.start_low_samples(),
            4
        );
    }
}
