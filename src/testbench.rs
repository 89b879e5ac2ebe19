//! VHDL testbench document around a synthesized [`Scenario`].

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{bail, Result, WrapErr};
use log::info;

use crate::synthesizer::{Scenario, ScenarioConfig};

/// Project source tree the testbenches are dropped into by default.
pub const DEFAULT_OUTPUT_ROOT: &str = "serial_to_parallel_ram_dereference.srcs";

/// Entity names must be plain VHDL identifiers.
pub fn validate_entity_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        bail!("testbench name is empty");
    };
    if !first.is_ascii_alphabetic() {
        bail!("testbench name {name:?} must start with a letter");
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("testbench name {name:?} may only hold letters, digits and underscores");
    }
    if name.ends_with('_') || name.contains("__") {
        bail!("testbench name {name:?} has a misplaced underscore");
    }
    Ok(())
}

/// Comment lines recording how to regenerate the document.
fn generated_command(name: &str, config: &ScenarioConfig) -> String {
    let mut cmd = String::from("-- tb-synth \\\n");
    cmd.push_str(&format!("--    --seed {} \\\n", config.seed));
    cmd.push_str(&format!("--    --iterations {} \\\n", config.iterations));
    if config.force_zero_address {
        cmd.push_str("--    --zeros \\\n");
    }
    if config.force_full_address {
        cmd.push_str("--    --full-address \\\n");
    }
    cmd.push_str(&format!(
        "--    --multiple-resets {} \\\n",
        config.reset_probability
    ));
    if config.use_fixed_memory {
        cmd.push_str("--    --use-example-memory \\\n");
    }
    cmd.push_str(&format!("--    {name}\n"));
    cmd
}

fn ram_initializer(scenario: &Scenario) -> String {
    scenario
        .memory
        .iter()
        .map(|(address, value)| {
            format!("{address} => STD_LOGIC_VECTOR(to_unsigned({value}, 8)),\n                                ")
        })
        .collect()
}

/// Renders the complete testbench for entity `name`.
pub fn render_testbench(name: &str, config: &ScenarioConfig, scenario: &Scenario) -> String {
    let command = generated_command(name, config);
    let length = scenario.len();
    let rst = &scenario.rst;
    let start = &scenario.start;
    let w = &scenario.w;
    let ram = ram_initializer(scenario);
    let assertions = scenario.assertion_text();

    format!(
        r#"-- Generated using:
{command}
--VUNIT%% library vunit_lib; %%--
--VUNIT%% context vunit_lib.vunit_context; %%--

LIBRARY ieee;
USE ieee.std_logic_1164.ALL;
USE ieee.numeric_std.ALL;
USE ieee.std_logic_unsigned.ALL;
USE std.textio.ALL;

ENTITY {name} IS
    --VUNIT%% generic(runner_cfg: string := runner_cfg_default); %%--
END {name};

ARCHITECTURE projecttb OF {name} IS
    CONSTANT CLOCK_PERIOD : TIME := 100 ns;
    SIGNAL tb_done : STD_LOGIC;
    SIGNAL mem_address : STD_LOGIC_VECTOR (15 DOWNTO 0) := (OTHERS => '0');
    SIGNAL tb_rst : STD_LOGIC := '0';
    SIGNAL tb_start : STD_LOGIC := '0';
    SIGNAL tb_clk : STD_LOGIC := '0';
    SIGNAL mem_o_data, mem_i_data : STD_LOGIC_VECTOR (7 DOWNTO 0);
    SIGNAL enable_wire : STD_LOGIC;
    SIGNAL mem_we : STD_LOGIC;
    SIGNAL tb_z0, tb_z1, tb_z2, tb_z3 : STD_LOGIC_VECTOR (7 DOWNTO 0);
    SIGNAL tb_w : STD_LOGIC;

    CONSTANT SCENARIOLENGTH : INTEGER := {length};
    SIGNAL scenario_rst : unsigned(0 TO SCENARIOLENGTH - 1)     := "{rst}";
    SIGNAL scenario_start : unsigned(0 TO SCENARIOLENGTH - 1)   := "{start}";
    SIGNAL scenario_w : unsigned(0 TO SCENARIOLENGTH - 1)       := "{w}";

    TYPE ram_type IS ARRAY (65535 DOWNTO 0) OF STD_LOGIC_VECTOR(7 DOWNTO 0);
    SIGNAL RAM : ram_type := (  {ram}OTHERS => "00000000"
                            );

    COMPONENT project_reti_logiche IS
        PORT (
            i_clk : IN STD_LOGIC;
            i_rst : IN STD_LOGIC;
            i_start : IN STD_LOGIC;
            i_w : IN STD_LOGIC;

            o_z0 : OUT STD_LOGIC_VECTOR(7 DOWNTO 0);
            o_z1 : OUT STD_LOGIC_VECTOR(7 DOWNTO 0);
            o_z2 : OUT STD_LOGIC_VECTOR(7 DOWNTO 0);
            o_z3 : OUT STD_LOGIC_VECTOR(7 DOWNTO 0);
            o_done : OUT STD_LOGIC;

            o_mem_addr : OUT STD_LOGIC_VECTOR(15 DOWNTO 0);
            i_mem_data : IN STD_LOGIC_VECTOR(7 DOWNTO 0);
            o_mem_we : OUT STD_LOGIC;
            o_mem_en : OUT STD_LOGIC
        );
    END COMPONENT project_reti_logiche;

BEGIN
    UUT : project_reti_logiche
    PORT MAP(
        i_clk => tb_clk,
        i_start => tb_start,
        i_rst => tb_rst,
        i_w => tb_w,

        o_z0 => tb_z0,
        o_z1 => tb_z1,
        o_z2 => tb_z2,
        o_z3 => tb_z3,
        o_done => tb_done,

        o_mem_addr => mem_address,
        o_mem_en => enable_wire,
        o_mem_we => mem_we,
        i_mem_data => mem_o_data
    );

    CLK_GEN : PROCESS IS
    BEGIN
        WAIT FOR CLOCK_PERIOD/2;
        tb_clk <= NOT tb_clk;
    END PROCESS CLK_GEN;

    MEM : PROCESS (tb_clk)
    BEGIN
        IF tb_clk'event AND tb_clk = '1' THEN
            IF enable_wire = '1' THEN
                IF mem_we = '1' THEN
                    RAM(conv_integer(mem_address)) <= mem_i_data;
                    mem_o_data <= mem_i_data AFTER 1 ns;
                ELSE
                    mem_o_data <= RAM(conv_integer(mem_address)) AFTER 1 ns;
                END IF;
            END IF;
        END IF;
    END PROCESS;

    -- Shifts one sample of every scenario vector onto the UUT inputs per falling edge.
    createScenario : PROCESS (tb_clk)
    BEGIN
        IF tb_clk'event AND tb_clk = '0' THEN
            tb_rst <= scenario_rst(0);
            tb_w <= scenario_w(0);
            tb_start <= scenario_start(0);
            scenario_rst <= scenario_rst(1 TO SCENARIOLENGTH - 1) & '0';
            scenario_w <= scenario_w(1 TO SCENARIOLENGTH - 1) & '0';
            scenario_start <= scenario_start(1 TO SCENARIOLENGTH - 1) & '0';
        END IF;
    END PROCESS;

    testRoutine : PROCESS IS
    BEGIN
        --VUNIT%% test_runner_setup(runner, runner_cfg); %%--

        mem_i_data <= "00000000";
        WAIT UNTIL tb_rst = '1';
        WAIT UNTIL tb_rst = '0';
        ASSERT tb_z0 = "00000000" REPORT "TEST FALLITO (postreset Z0 != 0 ) found " & integer'image(to_integer(unsigned(tb_z0))) severity failure;
        ASSERT tb_z1 = "00000000" REPORT "TEST FALLITO (postreset Z1 != 0 ) found " & integer'image(to_integer(unsigned(tb_z1))) severity failure;
        ASSERT tb_z2 = "00000000" REPORT "TEST FALLITO (postreset Z2 != 0 ) found " & integer'image(to_integer(unsigned(tb_z2))) severity failure;
        ASSERT tb_z3 = "00000000" REPORT "TEST FALLITO (postreset Z3 != 0 ) found " & integer'image(to_integer(unsigned(tb_z3))) severity failure;
{assertions}

        --VIVADO-START%%
        ASSERT false REPORT "Simulation Ended! TEST PASSATO (EXAMPLE)" SEVERITY failure;
        --VIVADO-END%%

        --VUNIT%% test_runner_cleanup(runner); %%--
    END PROCESS testRoutine;

    --VUNIT%% test_runner_watchdog(runner, CLOCK_PERIOD * SCENARIOLENGTH); %%--

END projecttb;
"#
    )
}

/// First `<root>/sim_<i>/new/<name>.vhd` whose `sim_<i>` does not exist yet.
pub fn next_output_path(root: &Utf8Path, name: &str) -> Utf8PathBuf {
    let mut index = 1;
    while root.join(format!("sim_{index}")).exists() {
        index += 1;
    }
    root.join(format!("sim_{index}"))
        .join("new")
        .join(format!("{name}.vhd"))
}

pub fn write_testbench(path: &Utf8Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory {parent}"))?;
    }
    fs::write(path, contents).wrap_err_with(|| format!("Failed to write testbench {path}"))?;
    info!("wrote {} bytes to {path}", contents.len());
    Ok(())
}
