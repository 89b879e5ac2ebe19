//! Lockstep bit streams driven onto `rst`, `start` and `w`.

use rand::Rng;

/// Appends `count` copies of `bit` to `stream`.
pub(crate) fn push_run(stream: &mut String, bit: char, count: usize) {
    stream.extend(std::iter::repeat(bit).take(count));
}

/// One iteration's contribution to the three streams.
///
/// Construction checks the three parts have the same length, so a window
/// can be appended to a [`SignalTimeline`] without breaking lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalWindow {
    rst: String,
    start: String,
    w: String,
}

impl SignalWindow {
    pub fn new(rst: String, start: String, w: String) -> Self {
        assert!(
            rst.len() == start.len() && start.len() == w.len(),
            "signal window out of lockstep: rst={} start={} w={}",
            rst.len(),
            start.len(),
            w.len()
        );
        Self { rst, start, w }
    }

    /// All three lines held low for `len` samples.
    pub fn idle(len: usize) -> Self {
        let zeros = "0".repeat(len);
        Self::new(zeros.clone(), zeros.clone(), zeros)
    }

    pub fn len(&self) -> usize {
        self.rst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rst.is_empty()
    }

    pub fn rst(&self) -> &str {
        &self.rst
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn w(&self) -> &str {
        &self.w
    }

    /// Whether the window ends on an asserted reset.
    pub fn ends_in_reset(&self) -> bool {
        self.rst.ends_with('1')
    }
}

/// The running `rst`/`start`/`w` streams of a whole scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalTimeline {
    rst: String,
    start: String,
    w: String,
}

impl SignalTimeline {
    /// Starts a timeline with a random power-on reset pulse on `rst`:
    /// 0..=9 low samples, 1..=9 high samples, then 3..=7 low samples.
    pub fn with_power_on_reset<R: Rng>(rng: &mut R) -> Self {
        let leading = rng.gen_range(0..10);
        let pulse = rng.gen_range(1..10);
        let trailing = rng.gen_range(5..10) - 2;

        let mut rst = String::new();
        push_run(&mut rst, '0', leading);
        push_run(&mut rst, '1', pulse);
        push_run(&mut rst, '0', trailing);

        let quiet = "0".repeat(rst.len());
        let mut timeline = Self::default();
        timeline.append(SignalWindow::new(rst, quiet.clone(), quiet));
        timeline
    }

    pub fn append(&mut self, window: SignalWindow) {
        self.rst.push_str(&window.rst);
        self.start.push_str(&window.start);
        self.w.push_str(&window.w);
        debug_assert_eq!(self.rst.len(), self.start.len());
        debug_assert_eq!(self.start.len(), self.w.len());
    }

    pub fn len(&self) -> usize {
        self.rst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rst.is_empty()
    }

    /// Level of `rst` on the most recent sample.
    pub fn rst_high(&self) -> bool {
        self.rst.ends_with('1')
    }

    pub fn rst(&self) -> &str {
        &self.rst
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn w(&self) -> &str {
        &self.w
    }

    pub fn into_streams(self) -> (String, String, String) {
        (self.rst, self.start, self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    #[should_panic(expected = "out of lockstep")]
    fn test_window_rejects_unequal_parts() {
        SignalWindow::new("01".into(), "11".into(), "1".into());
    }

    #[test]
    fn test_power_on_prefix_shape() {
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let timeline = SignalTimeline::with_power_on_reset(&mut rng);

            assert!(timeline.start().chars().all(|c| c == '0'));
            assert!(timeline.w().chars().all(|c| c == '0'));

            let rst = timeline.rst();
            let first_high = rst.find('1').expect("power-on pulse");
            let last_high = rst.rfind('1').expect("power-on pulse");
            assert!(first_high <= 9);
            assert!(rst[first_high..=last_high].chars().all(|c| c == '1'));
            let trailing = rst.len() - last_high - 1;
            assert!((3..=7).contains(&trailing), "trailing={trailing}");
            assert!(!timeline.rst_high());
        }
    }

    #[test]
    fn test_append_keeps_streams_aligned() {
        let mut timeline = SignalTimeline::default();
        timeline.append(SignalWindow::new("001".into(), "111".into(), "010".into()));
        timeline.append(SignalWindow::idle(4));

        assert_eq!(timeline.len(), 7);
        assert_eq!(timeline.rst(), "0010000");
        assert_eq!(timeline.start(), "1110000");
        assert_eq!(timeline.w(), "0100000");
    }
}
