//! Byte-addressable memory seen by the unit under test.

use std::collections::BTreeMap;

use log::trace;
use rand::Rng;

/// Contents of the memory shipped with the reference testbench, as the UUT
/// reads them through its 8-bit data port.
pub const EXAMPLE_MEMORY: [(u16, u8); 17] = [
    (0, 20),
    (1, 162),
    (2, 75),
    (3, 175),
    (6, 88),
    (57, 18),
    (985, 200),
    (721, 98),
    (420, 164),
    (65535, 144),
    (1821, 185),
    (1312, 217),
    (7765, 126),
    (214, 59),
    (9, 142),
    (3059, 6),
    (69, 69),
];

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryModel {
    /// Pre-supplied contents, immutable for the whole run.
    Fixed(BTreeMap<u16, u8>),
    /// Filled on first access with a random byte, never changed afterwards.
    Dynamic(BTreeMap<u16, u8>),
}

impl MemoryModel {
    pub fn example() -> Self {
        Self::Fixed(EXAMPLE_MEMORY.iter().copied().collect())
    }

    pub fn dynamic() -> Self {
        Self::Dynamic(BTreeMap::new())
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, MemoryModel::Fixed(_))
    }

    /// Read the byte at `address`.
    ///
    /// A dynamic miss draws one value from `rng` and caches it. A fixed miss
    /// means the sampler produced an address outside the table and aborts.
    pub fn read<R: Rng>(&mut self, address: u16, rng: &mut R) -> u8 {
        match self {
            MemoryModel::Fixed(contents) => match contents.get(&address) {
                Some(&value) => value,
                None => panic!("address {address} is not part of the fixed memory"),
            },
            MemoryModel::Dynamic(contents) => *contents.entry(address).or_insert_with(|| {
                let value = rng.gen::<u8>();
                trace!("memory[{address}] assigned {value}");
                value
            }),
        }
    }

    pub fn contents(&self) -> &BTreeMap<u16, u8> {
        match self {
            MemoryModel::Fixed(contents) | MemoryModel::Dynamic(contents) => contents,
        }
    }

    pub fn into_contents(self) -> BTreeMap<u16, u8> {
        match self {
            MemoryModel::Fixed(contents) | MemoryModel::Dynamic(contents) => contents,
        }
    }
}
