//! VHDL assertion blocks replayed against the running simulation.

use std::fmt;

use crate::injector::ResetPoint;
use crate::sampler::Channel;

/// Low `start` samples the UUT needs before a reset can no longer preempt
/// its done pulse.
pub const MIN_SAMPLES_FOR_DONE: usize = 4;

/// Expected values of `o_z0..o_z3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OutputRegisterSet {
    values: [u8; 4],
}

impl OutputRegisterSet {
    pub fn get(&self, channel: Channel) -> u8 {
        self.values[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, value: u8) {
        self.values[channel.index()] = value;
    }

    pub fn clear(&mut self) {
        self.values = [0; 4];
    }

    pub fn is_clear(&self) -> bool {
        self.values == [0; 4]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionBlock {
    /// Wait for `done`, check every output, then check they drop to zero.
    ValueCheck {
        wait_for_start: bool,
        expected: OutputRegisterSet,
    },
    /// Check every output is zero while reset is high and once it falls.
    ResetCheck { wait_for_start: bool },
}

impl AssertionBlock {
    pub fn waits_for_start(&self) -> bool {
        match self {
            AssertionBlock::ValueCheck { wait_for_start, .. }
            | AssertionBlock::ResetCheck { wait_for_start } => *wait_for_start,
        }
    }

    pub fn is_value_check(&self) -> bool {
        matches!(self, AssertionBlock::ValueCheck { .. })
    }

    pub fn is_reset_check(&self) -> bool {
        matches!(self, AssertionBlock::ResetCheck { .. })
    }
}

fn line(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\n        {text}")
}

fn zero_checks(f: &mut fmt::Formatter<'_>, phase: &str) -> fmt::Result {
    for channel in Channel::ALL {
        let signal = channel.signal_name();
        line(
            f,
            &format!(
                "ASSERT {signal} = \"00000000\" REPORT \"TEST FALLITO ({phase} {} != 0 ) found \" & integer'image(to_integer(unsigned({signal}))) severity failure;",
                channel.label()
            ),
        )?;
    }
    Ok(())
}

fn value_checks(f: &mut fmt::Formatter<'_>, expected: &OutputRegisterSet) -> fmt::Result {
    for channel in Channel::ALL {
        let signal = channel.signal_name();
        let value = expected.get(channel);
        line(
            f,
            &format!(
                "ASSERT {signal} = std_logic_vector(to_unsigned({value}, 8)) REPORT \"TEST FALLITO ({} ---) found \" & integer'image(to_integer(unsigned({signal}))) & \" expected \" & integer'image(to_integer(to_unsigned({value}, 8))) severity failure;",
                channel.label()
            ),
        )?;
    }
    Ok(())
}

fn start_wait(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f)?;
    line(f, "WAIT UNTIL tb_start = '1';")?;
    zero_checks(f, "poststart")
}

impl fmt::Display for AssertionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionBlock::ValueCheck {
                wait_for_start,
                expected,
            } => {
                writeln!(f)?;
                if *wait_for_start {
                    start_wait(f)?;
                }
                line(f, "WAIT UNTIL tb_done = '1';")?;
                line(f, "WAIT FOR CLOCK_PERIOD/2;")?;
                value_checks(f, expected)?;
                line(f, "WAIT UNTIL tb_done = '0';")?;
                zero_checks(f, "postdone")
            }
            AssertionBlock::ResetCheck { wait_for_start } => {
                if *wait_for_start {
                    start_wait(f)?;
                }
                line(f, "WAIT UNTIL tb_rst = '1';")?;
                line(f, "WAIT FOR CLOCK_PERIOD/2;")?;
                zero_checks(f, "postreset")?;
                line(f, "WAIT UNTIL tb_rst = '0';")?;
                zero_checks(f, "postreset")
            }
        }
    }
}

/// Ordered assertion blocks; order is the replay order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionSequence {
    blocks: Vec<AssertionBlock>,
}

impl AssertionSequence {
    pub fn push(&mut self, block: AssertionBlock) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[AssertionBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn value_checks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_value_check()).count()
    }

    pub fn reset_checks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_reset_check()).count()
    }

    /// The text spliced into the testbench's test routine.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AssertionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

/// Decides, iteration by iteration, which blocks the scenario needs.
///
/// `wait_for_start` is pending whenever the next block may wait for a rising
/// `start`: at power-on and after a reset whose falling edge is followed by
/// at least one idle sample.
#[derive(Debug, Clone)]
pub struct AssertionComposer {
    wait_for_start: bool,
    registers: OutputRegisterSet,
    sequence: AssertionSequence,
}

impl Default for AssertionComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionComposer {
    pub fn new() -> Self {
        Self {
            wait_for_start: true,
            registers: OutputRegisterSet::default(),
            sequence: AssertionSequence::default(),
        }
    }

    pub fn wait_for_start(&self) -> bool {
        self.wait_for_start
    }

    pub fn registers(&self) -> &OutputRegisterSet {
        &self.registers
    }

    pub fn sequence(&self) -> &AssertionSequence {
        &self.sequence
    }

    pub fn into_sequence(self) -> AssertionSequence {
        self.sequence
    }

    /// The iteration's memory read lands in `channel`.
    pub fn record_read(&mut self, channel: Channel, value: u8) {
        self.registers.set(channel, value);
    }

    /// Emit the blocks for an iteration that ended at `point`.
    ///
    /// `rst_high_before` is the `rst` level on the sample before the window;
    /// `settle_bits` the idle gap appended after a reset. Returns the number
    /// of blocks emitted.
    pub fn finish_iteration(
        &mut self,
        point: ResetPoint,
        rst_high_before: bool,
        settle_bits: usize,
    ) -> usize {
        let before = self.sequence.len();

        if !point.is_reset() {
            self.push_value_check();
            return self.sequence.len() - before;
        }

        // A reset on the first sample that extends one already high has no
        // rising edge to wait on.
        let rst_held = point == ResetPoint::HeaderEarly && rst_high_before;
        if !rst_held {
            if point.start_low_samples() >= MIN_SAMPLES_FOR_DONE {
                self.push_value_check();
                self.sequence.push(AssertionBlock::ResetCheck {
                    wait_for_start: false,
                });
            } else {
                // On the first header bit start and reset rise together.
                let wait_for_start = self.wait_for_start && point != ResetPoint::HeaderEarly;
                self.sequence
                    .push(AssertionBlock::ResetCheck { wait_for_start });
            }
        }

        // With no gap, start rises on the sample reset falls.
        self.wait_for_start = settle_bits > 0;
        self.registers.clear();
        self.sequence.len() - before
    }

    fn push_value_check(&mut self) {
        self.sequence.push(AssertionBlock::ValueCheck {
            wait_for_start: self.wait_for_start,
            expected: self.registers,
        });
        self.wait_for_start = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer_with(channel: Channel, value: u8) -> AssertionComposer {
        let mut composer = AssertionComposer::new();
        composer.record_read(channel, value);
        composer
    }

    #[test]
    fn test_plain_iterations_emit_value_checks() {
        let mut composer = composer_with(Channel::Z1, 162);
        assert_eq!(composer.finish_iteration(ResetPoint::NoReset, false, 0), 1);
        composer.record_read(Channel::Z3, 7);
        assert_eq!(composer.finish_iteration(ResetPoint::NoReset, false, 0), 1);

        let blocks = composer.sequence().blocks();
        assert!(blocks[0].waits_for_start());
        assert!(!blocks[1].waits_for_start());

        let mut expected = OutputRegisterSet::default();
        expected.set(Channel::Z1, 162);
        expected.set(Channel::Z3, 7);
        assert_eq!(
            blocks[1],
            AssertionBlock::ValueCheck {
                wait_for_start: false,
                expected
            }
        );
    }

    #[test]
    fn test_late_reset_checks_value_then_reset() {
        let mut composer = composer_with(Channel::Z0, 20);
        let point = ResetPoint::InWaitPhase { wait_bits: 5 };
        assert_eq!(composer.finish_iteration(point, false, 2), 2);

        let blocks = composer.sequence().blocks();
        assert!(blocks[0].is_value_check());
        assert_eq!(
            blocks[1],
            AssertionBlock::ResetCheck {
                wait_for_start: false
            }
        );
        assert!(composer.registers().is_clear());
        assert!(composer.wait_for_start());
    }

    #[test]
    fn test_early_reset_only_checks_reset() {
        let mut composer = composer_with(Channel::Z2, 9);
        let point = ResetPoint::InWaitPhase { wait_bits: 4 };
        assert_eq!(composer.finish_iteration(point, false, 0), 1);

        assert_eq!(
            composer.sequence().blocks()[0],
            AssertionBlock::ResetCheck {
                wait_for_start: true
            }
        );
        assert!(!composer.wait_for_start());
    }

    #[test]
    fn test_reset_with_start_never_waits_for_start() {
        let mut composer = AssertionComposer::new();
        composer.finish_iteration(ResetPoint::HeaderEarly, false, 3);
        assert_eq!(
            composer.sequence().blocks()[0],
            AssertionBlock::ResetCheck {
                wait_for_start: false
            }
        );
        assert!(composer.wait_for_start());
    }

    #[test]
    fn test_reset_extending_a_high_reset_emits_nothing() {
        let mut composer = AssertionComposer::new();
        composer.finish_iteration(ResetPoint::HeaderLate, false, 0);
        assert!(!composer.wait_for_start());

        composer.record_read(Channel::Z1, 4);
        assert_eq!(composer.finish_iteration(ResetPoint::HeaderEarly, true, 1), 0);
        assert_eq!(composer.sequence().len(), 1);
        assert!(composer.registers().is_clear());
        assert!(composer.wait_for_start());
    }

    #[test]
    fn test_high_rst_before_window_only_matters_on_first_bit() {
        let mut composer = AssertionComposer::new();
        let point = ResetPoint::InAddress { address_bits: 2 };
        assert_eq!(composer.finish_iteration(point, true, 1), 1);
    }

    #[test]
    fn test_rendered_blocks() {
        let mut expected = OutputRegisterSet::default();
        expected.set(Channel::Z2, 75);
        let value = AssertionBlock::ValueCheck {
            wait_for_start: true,
            expected,
        }
        .to_string();

        assert!(value.contains("WAIT UNTIL tb_start = '1';"));
        assert!(value.contains("WAIT UNTIL tb_done = '1';"));
        assert!(value.contains("ASSERT tb_z2 = std_logic_vector(to_unsigned(75, 8))"));
        assert!(value.contains("ASSERT tb_z0 = std_logic_vector(to_unsigned(0, 8))"));
        assert!(value.find("tb_start").unwrap() < value.find("tb_done").unwrap());

        let reset = AssertionBlock::ResetCheck {
            wait_for_start: false,
        }
        .to_string();
        assert!(!reset.contains("tb_start"));
        assert_eq!(reset.matches("(postreset").count(), 8);
        assert!(reset.find("tb_rst = '1'").unwrap() < reset.find("tb_rst = '0'").unwrap());
    }
}
