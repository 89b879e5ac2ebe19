pub mod assertions;
pub mod injector;
pub mod memory;
pub mod sampler;
pub mod signal;
pub mod synthesizer;
pub mod testbench;

pub use assertions::{AssertionBlock, AssertionComposer, AssertionSequence, OutputRegisterSet};
pub use injector::ResetPoint;
pub use memory::MemoryModel;
pub use sampler::Channel;
pub use signal::{SignalTimeline, SignalWindow};
pub use synthesizer::*;
pub use testbench::{next_output_path, render_testbench, write_testbench};
