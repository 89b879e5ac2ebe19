//! Scenario synthesis: runs every iteration and collects streams, memory and
//! assertions into one [`Scenario`].

use std::collections::BTreeMap;
use std::ops::Range;

use eyre::{bail, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assertions::{AssertionComposer, AssertionSequence};
use crate::injector::{build_window, draw_reset_point, draw_settle_bits, ResetPoint};
use crate::memory::MemoryModel;
use crate::sampler::{address_bits, AddressSampler, Channel, MAX_ADDRESS};
use crate::signal::{SignalTimeline, SignalWindow};

/// Knobs of one synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub iterations: usize,
    pub force_zero_address: bool,
    pub force_full_address: bool,
    /// 0 disables reset injection; larger values make resets more likely.
    pub reset_probability: f64,
    pub use_fixed_memory: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioConfig {
    pub fn new() -> Self {
        Self {
            seed: 0,
            iterations: 10,
            force_zero_address: false,
            force_full_address: false,
            reset_probability: 0.0,
            use_fixed_memory: false,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn force_zero_address(mut self, force: bool) -> Self {
        self.force_zero_address = force;
        self
    }

    pub fn force_full_address(mut self, force: bool) -> Self {
        self.force_full_address = force;
        self
    }

    pub fn reset_probability(mut self, probability: f64) -> Self {
        self.reset_probability = probability;
        self
    }

    pub fn use_fixed_memory(mut self, fixed: bool) -> Self {
        self.use_fixed_memory = fixed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            bail!("iteration count must be positive");
        }
        if !self.reset_probability.is_finite() || self.reset_probability < 0.0 {
            bail!(
                "reset probability must be a non-negative number, got {}",
                self.reset_probability
            );
        }
        if self.force_zero_address && self.force_full_address && self.iterations < 2 {
            bail!("forcing both the zero and the full address needs at least two iterations");
        }
        Ok(())
    }
}

// Convenience function to match `instr()`-style builders
pub fn scenario() -> ScenarioConfig {
    ScenarioConfig::new()
}

/// What one iteration did, for reporting and checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationRecord {
    pub address: u16,
    pub channel: Channel,
    pub value: u8,
    pub reset: ResetPoint,
    pub settle_bits: usize,
    /// Samples of this iteration's window, settle gap excluded.
    pub window: Range<usize>,
    /// Indices into the assertion sequence emitted for this iteration.
    pub blocks: Range<usize>,
}

/// Everything the testbench template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub rst: String,
    pub start: String,
    pub w: String,
    pub memory: BTreeMap<u16, u8>,
    pub assertions: AssertionSequence,
    pub iterations: Vec<IterationRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub samples: usize,
    pub iterations: usize,
    pub resets: usize,
    pub value_checks: usize,
    pub reset_checks: usize,
}

impl Scenario {
    pub fn len(&self) -> usize {
        self.rst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rst.is_empty()
    }

    pub fn assertion_text(&self) -> String {
        self.assertions.render()
    }

    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary {
            samples: self.len(),
            iterations: self.iterations.len(),
            resets: self.iterations.iter().filter(|r| r.reset.is_reset()).count(),
            value_checks: self.assertions.value_checks(),
            reset_checks: self.assertions.reset_checks(),
        }
    }
}

pub struct Synthesizer {
    config: ScenarioConfig,
    memory: MemoryModel,
}

impl Synthesizer {
    /// Uses the example memory when `use_fixed_memory` is set, a lazily
    /// filled one otherwise.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let memory = if config.use_fixed_memory {
            MemoryModel::example()
        } else {
            MemoryModel::dynamic()
        };
        Self::with_memory(config, memory)
    }

    pub fn with_memory(config: ScenarioConfig, memory: MemoryModel) -> Result<Self> {
        config.validate()?;
        if let MemoryModel::Fixed(contents) = &memory {
            if config.force_zero_address && !contents.contains_key(&0) {
                bail!("fixed memory has no address 0 to force");
            }
            if config.force_full_address && !contents.contains_key(&MAX_ADDRESS) {
                bail!("fixed memory has no address {MAX_ADDRESS} to force");
            }
            if contents.keys().all(|&a| config.force_zero_address && a == 0) {
                bail!("fixed memory has no address left to sample");
            }
        }
        Ok(Self { config, memory })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Runs the whole scenario. Same config and seed, same output.
    pub fn run(self) -> Scenario {
        let Synthesizer { config, mut memory } = self;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut timeline = SignalTimeline::with_power_on_reset(&mut rng);
        let sampler = AddressSampler::new(
            &memory,
            config.iterations,
            config.force_zero_address,
            config.force_full_address,
            &mut rng,
        );
        let mut composer = AssertionComposer::new();
        let mut records = Vec::with_capacity(config.iterations);
        let mut emitted = 0;

        for iteration in 0..config.iterations {
            let address = sampler.sample(iteration, &mut rng);
            let bits = address_bits(address);
            let channel = Channel::sample(&mut rng);
            let value = memory.read(address, &mut rng);
            composer.record_read(channel, value);

            let reset = draw_reset_point(bits.len(), config.reset_probability, &mut rng);
            let rst_high_before = timeline.rst_high();

            let window_start = timeline.len();
            timeline.append(build_window(channel, &bits, reset));
            let window_end = timeline.len();

            let settle_bits = if reset.is_reset() {
                let settle = draw_settle_bits(&mut rng);
                timeline.append(SignalWindow::idle(settle));
                settle
            } else {
                0
            };

            let added = composer.finish_iteration(reset, rst_high_before, settle_bits);
            debug!(
                "iteration {iteration}: address={address} channel={:?} value={value} reset={reset:?} settle={settle_bits} blocks={added}",
                channel
            );

            records.push(IterationRecord {
                address,
                channel,
                value,
                reset,
                settle_bits,
                window: window_start..window_end,
                blocks: emitted..emitted + added,
            });
            emitted += added;
        }

        let (rst, start, w) = timeline.into_streams();
        let scenario = Scenario {
            rst,
            start,
            w,
            memory: memory.into_contents(),
            assertions: composer.into_sequence(),
            iterations: records,
        };

        let summary = scenario.summary();
        info!(
            "synthesized {} iterations over {} samples: {} resets, {} value checks, {} reset checks",
            summary.iterations,
            summary.samples,
            summary.resets,
            summary.value_checks,
            summary.reset_checks
        );
        scenario
    }
}

/// Validates `config` and runs it.
pub fn synthesize(config: ScenarioConfig) -> Result<Scenario> {
    Ok(Synthesizer::new(config)?.run())
}
