use camino::Utf8PathBuf;
use clap::Parser;
use eyre::Result;
use tb_synth::testbench::{validate_entity_name, DEFAULT_OUTPUT_ROOT};
use tb_synth::{next_output_path, render_testbench, scenario, write_testbench, Synthesizer};

/// Generates a randomized VHDL testbench for the serial-to-parallel memory
/// dereference unit
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entity name of the generated testbench
    testbench_name: String,

    /// Random seed, fresh when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of iterations
    #[arg(short, long, default_value = "10")]
    iterations: usize,

    /// Force one iteration to use address 0
    #[arg(short = 'z', long)]
    zeros: bool,

    /// Force the first iteration to use address 65535
    #[arg(short = 'a', long)]
    full_address: bool,

    /// Reset injection control, 0 disables resets inside iterations
    #[arg(short = 'r', long, default_value = "0")]
    multiple_resets: f64,

    /// Read from the example memory instead of random contents
    #[arg(short = 'm', long)]
    use_example_memory: bool,

    /// Directory holding the sim_<n> folders
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    output_root: Utf8PathBuf,

    /// Print the testbench instead of writing it
    #[arg(long)]
    stdout: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    validate_entity_name(&cli.testbench_name)?;

    let config = scenario()
        .seed(cli.seed.unwrap_or_else(rand::random))
        .iterations(cli.iterations)
        .force_zero_address(cli.zeros)
        .force_full_address(cli.full_address)
        .reset_probability(cli.multiple_resets)
        .use_fixed_memory(cli.use_example_memory);

    let synthesizer = Synthesizer::new(config.clone())?;
    let scenario = synthesizer.run();
    let document = render_testbench(&cli.testbench_name, &config, &scenario);

    if cli.stdout {
        print!("{document}");
        return Ok(());
    }

    let path = next_output_path(&cli.output_root, &cli.testbench_name);
    write_testbench(&path, &document)?;

    let summary = scenario.summary();
    println!("Generated test bench: {path}");
    println!(
        "  seed {} | {} samples | {} resets | {} value checks | {} reset checks",
        config.seed, summary.samples, summary.resets, summary.value_checks, summary.reset_checks
    );
    Ok(())
}
