//! Per-iteration address and output-channel selection.

use rand::Rng;

use crate::memory::MemoryModel;

pub const MAX_ADDRESS: u16 = u16::MAX;

/// Output register selected by the two channel bits sent after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Channel {
    Z0 = 0b00,
    Z1 = 0b01,
    Z2 = 0b10,
    Z3 = 0b11,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Z0, Channel::Z1, Channel::Z2, Channel::Z3];

    pub fn from_bits(high: bool, low: bool) -> Self {
        match (high, low) {
            (false, false) => Channel::Z0,
            (false, true) => Channel::Z1,
            (true, false) => Channel::Z2,
            (true, true) => Channel::Z3,
        }
    }

    /// Two independent fair bits, high bit drawn first.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        let high = rng.gen_range(0..2u8) == 1;
        let low = rng.gen_range(0..2u8) == 1;
        Self::from_bits(high, low)
    }

    /// Bits in the order they are shifted onto `w`.
    pub fn bits(self) -> [char; 2] {
        let bit = |set: bool| if set { '1' } else { '0' };
        let raw = self as u8;
        [bit(raw & 0b10 != 0), bit(raw & 0b01 != 0)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn signal_name(self) -> &'static str {
        match self {
            Channel::Z0 => "tb_z0",
            Channel::Z1 => "tb_z1",
            Channel::Z2 => "tb_z2",
            Channel::Z3 => "tb_z3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Z0 => "Z0",
            Channel::Z1 => "Z1",
            Channel::Z2 => "Z2",
            Channel::Z3 => "Z3",
        }
    }
}

/// Minimal unsigned binary rendering, `"0"` for address zero.
pub fn address_bits(address: u16) -> String {
    format!("{address:b}")
}

#[derive(Debug, Clone)]
enum AddressPool {
    /// Whole 16-bit space, optionally without address 0.
    Full { skip_zero: bool },
    /// Keys of a fixed memory, ascending.
    Table(Vec<u16>),
}

/// Draws the address of every iteration, applying the forced-address knobs.
#[derive(Debug, Clone)]
pub struct AddressSampler {
    pool: AddressPool,
    force_full: bool,
    force_zero: bool,
    zero_iteration: usize,
}

impl AddressSampler {
    /// Builds the sampler and draws the iteration reserved for address 0.
    ///
    /// The reserved iteration is drawn even when `force_zero` is off so the
    /// remaining draws of the run do not depend on that flag.
    pub fn new<R: Rng>(
        memory: &MemoryModel,
        iterations: usize,
        force_zero: bool,
        force_full: bool,
        rng: &mut R,
    ) -> Self {
        assert!(iterations > 0, "a run needs at least one iteration");

        let pool = match memory {
            MemoryModel::Fixed(contents) => {
                let keys: Vec<u16> = contents
                    .keys()
                    .copied()
                    .filter(|&address| !(force_zero && address == 0))
                    .collect();
                assert!(!keys.is_empty(), "fixed memory has no address to sample");
                AddressPool::Table(keys)
            }
            MemoryModel::Dynamic(_) => AddressPool::Full {
                skip_zero: force_zero,
            },
        };

        let zero_iteration = if force_zero && force_full {
            assert!(
                iterations > 1,
                "forcing both address 0 and the full address needs two iterations"
            );
            rng.gen_range(1..iterations)
        } else {
            rng.gen_range(0..iterations)
        };

        Self {
            pool,
            force_full,
            force_zero,
            zero_iteration,
        }
    }

    pub fn zero_iteration(&self) -> Option<usize> {
        self.force_zero.then_some(self.zero_iteration)
    }

    /// Address for `iteration`. One draw is consumed even when the address
    /// ends up forced.
    pub fn sample<R: Rng>(&self, iteration: usize, rng: &mut R) -> u16 {
        let drawn = match &self.pool {
            AddressPool::Full { skip_zero: true } => rng.gen_range(1..=MAX_ADDRESS),
            AddressPool::Full { skip_zero: false } => rng.gen_range(0..=MAX_ADDRESS),
            AddressPool::Table(keys) => keys[rng.gen_range(0..keys.len())],
        };

        if self.force_zero && iteration == self.zero_iteration {
            0
        } else if self.force_full && iteration == 0 {
            MAX_ADDRESS
        } else {
            drawn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_channel_bits_follow_register_index() {
        assert_eq!(Channel::Z0.bits(), ['0', '0']);
        assert_eq!(Channel::Z1.bits(), ['0', '1']);
        assert_eq!(Channel::Z2.bits(), ['1', '0']);
        assert_eq!(Channel::Z3.bits(), ['1', '1']);
        for channel in Channel::ALL {
            let [high, low] = channel.bits();
            assert_eq!(Channel::from_bits(high == '1', low == '1'), channel);
        }
    }

    #[test]
    fn test_address_bits_have_no_leading_zeros() {
        assert_eq!(address_bits(0), "0");
        assert_eq!(address_bits(1), "1");
        assert_eq!(address_bits(6), "110");
        assert_eq!(address_bits(MAX_ADDRESS), "1".repeat(16));
    }

    #[test]
    fn test_full_address_forced_on_first_iteration() {
        let mut rng = StdRng::seed_from_u64(11);
        let sampler = AddressSampler::new(&MemoryModel::dynamic(), 5, false, true, &mut rng);
        assert_eq!(sampler.sample(0, &mut rng), MAX_ADDRESS);
        assert_eq!(sampler.zero_iteration(), None);
    }

    #[test]
    fn test_zero_address_forced_exactly_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let memory = MemoryModel::example();
        let sampler = AddressSampler::new(&memory, 40, true, false, &mut rng);

        let zeros = (0..40)
            .filter(|&i| sampler.sample(i, &mut rng) == 0)
            .count();
        assert_eq!(zeros, 1);
    }

    #[test]
    fn test_both_forced_addresses_do_not_collide() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sampler = AddressSampler::new(&MemoryModel::dynamic(), 2, true, true, &mut rng);
            assert_eq!(sampler.zero_iteration(), Some(1));
            assert_eq!(sampler.sample(0, &mut rng), MAX_ADDRESS);
            assert_eq!(sampler.sample(1, &mut rng), 0);
        }
    }

    #[test]
    fn test_fixed_pool_only_yields_table_addresses() {
        let mut rng = StdRng::seed_from_u64(21);
        let memory = MemoryModel::example();
        let sampler = AddressSampler::new(&memory, 100, false, false, &mut rng);

        for i in 0..100 {
            let address = sampler.sample(i, &mut rng);
            assert!(memory.contents().contains_key(&address));
        }
    }
}
