mod image;

use std::error::Error;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::fs::{self, File};
use std::io::BufWriter;
use std::time::Duration;

use clap::Parser;
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use base::prelude::*;
use cpu::{
    ControlUnit, MachineConfig, PaperTapeReader, StopConfig, StopReason, TapePunch,
    PAPER_TAPE_READER, TAPE_PUNCH,
};

use image::{parse_binary_image, parse_octal, parse_octal_image};

#[derive(Debug)]
struct Fail(String);

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Fail {}

/// Simulate an HP 2100-series computer.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Program image to load into memory.
    #[clap(action = clap::ArgAction::Set)]
    image: Option<OsString>,

    /// The image holds big-endian binary words rather than octal text.
    #[clap(long)]
    binary: bool,

    /// Octal address at which the image is loaded.
    #[clap(long, default_value = "100", value_parser = parse_octal)]
    origin: u16,

    /// Octal address at which execution starts (defaults to the origin).
    #[clap(long, value_parser = parse_octal)]
    start: Option<u16>,

    /// Boot loader image (octal text).  The loader is placed in the
    /// top 64 words of memory and started there.
    #[clap(long)]
    boot_loader: Option<OsString>,

    /// Installed memory, in words.
    #[clap(long, default_value_t = 32768)]
    memory: usize,

    /// Memory cycle time in nanoseconds.
    #[clap(long, default_value_t = 650)]
    cycle_ns: u64,

    /// Longest permitted chain of indirect addresses.
    #[clap(long, default_value_t = 16)]
    indirect_limit: u32,

    /// Give way to interrupts on every level of indirection.
    #[clap(long)]
    interrupt_defer_jumper: bool,

    /// Stop when an unimplemented instruction is executed (the default).
    #[clap(long, overrides_with = "no_stop_on_unimplemented")]
    stop_on_unimplemented: bool,

    /// Treat unimplemented instructions as no-ops instead of stopping.
    #[clap(long, overrides_with = "stop_on_unimplemented")]
    no_stop_on_unimplemented: bool,

    /// Stop when an I/O instruction addresses an empty select code.
    #[clap(long)]
    stop_on_nonexistent_device: bool,

    /// Octal value read from an empty select code.
    #[clap(long, default_value = "0", value_parser = parse_octal)]
    floating_bus: u16,

    /// Octal value of the switch register.
    #[clap(long, default_value = "0", value_parser = parse_octal)]
    switches: u16,

    /// Octal address at which to stop before fetching (may be repeated).
    #[clap(long = "breakpoint", value_parser = parse_octal)]
    breakpoints: Vec<u16>,

    /// Stop after this many instructions.
    #[clap(long)]
    max_instructions: Option<u64>,

    /// File to mount in the paper tape reader.
    #[clap(long)]
    tape: Option<OsString>,

    /// File which receives the output of the tape punch.
    #[clap(long)]
    punch: Option<OsString>,

    /// Octal select code of the paper tape reader.
    #[clap(long, value_parser = parse_octal)]
    reader_select_code: Option<u16>,

    /// Octal select code of the tape punch.
    #[clap(long, value_parser = parse_octal)]
    punch_select_code: Option<u16>,
}

fn select_code(arg: Option<u16>, default: SelectCode, what: &str) -> Result<SelectCode, Fail> {
    match arg {
        None => Ok(default),
        Some(n) => SelectCode::try_from(n)
            .map_err(|e| Fail(format!("{what} select code {n:o} is invalid: {e}"))),
    }
}

fn address(n: u16, what: &str) -> Result<Address, Fail> {
    Address::try_from(n).map_err(|e| Fail(format!("{what} {n:o} is invalid: {e}")))
}

fn read_file(name: &OsString, what: &str) -> Result<Vec<u8>, Fail> {
    fs::read(name).map_err(|e| Fail(format!("failed to read {what} {}: {e}", name.to_string_lossy())))
}

fn read_octal_file(name: &OsString, what: &str) -> Result<Vec<u16>, Box<dyn Error>> {
    let bytes = read_file(name, what)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Fail(format!("{what} {} is not text", name.to_string_lossy())))?;
    Ok(parse_octal_image(&text)?)
}

fn build_machine(cli: &Cli) -> Result<ControlUnit, Box<dyn Error>> {
    let config = MachineConfig {
        memory_words: cli.memory,
        cycle_time: Duration::from_nanos(cli.cycle_ns),
        indirect_limit: cli.indirect_limit,
        interrupt_defer_jumper: cli.interrupt_defer_jumper,
        floating_bus: cli.floating_bus,
        stops: StopConfig {
            unimplemented: cli.stop_on_unimplemented || !cli.no_stop_on_unimplemented,
            nonexistent_device: cli.stop_on_nonexistent_device,
        },
    };
    let mut cpu = ControlUnit::new(config)?;
    cpu.power_on();

    let reader_code = select_code(cli.reader_select_code, PAPER_TAPE_READER, "reader")?;
    let reader = match &cli.tape {
        Some(name) => PaperTapeReader::with_tape(read_file(name, "tape")?),
        None => PaperTapeReader::new(),
    };
    cpu.attach(reader_code, Box::new(reader))?;

    if let Some(name) = &cli.punch {
        let punch_code = select_code(cli.punch_select_code, TAPE_PUNCH, "punch")?;
        let file = File::create(name).map_err(|e| {
            Fail(format!(
                "failed to create punch output {}: {e}",
                name.to_string_lossy()
            ))
        })?;
        cpu.attach(punch_code, Box::new(TapePunch::new(Box::new(BufWriter::new(file)))))?;
    }

    if let Some(name) = &cli.image {
        let words = if cli.binary {
            parse_binary_image(&read_file(name, "image")?)?
        } else {
            read_octal_file(name, "image")?
        };
        let origin = address(cli.origin, "origin")?;
        cpu.load_image(origin, &words)?;
        cpu.registers_mut().p = address(cli.start.unwrap_or(cli.origin), "start address")?;
    }

    if let Some(name) = &cli.boot_loader {
        let loader = read_octal_file(name, "boot loader")?;
        cpu.boot(&loader, reader_code)?;
    } else if cli.image.is_none() {
        return Err(Box::new(Fail(
            "nothing to run: give a program image or a boot loader".to_string(),
        )));
    }

    cpu.registers_mut().s = cli.switches;
    for bp in &cli.breakpoints {
        cpu.set_breakpoint(address(*bp, "breakpoint")?);
    }
    Ok(cpu)
}

fn run_simulator() -> Result<StopReason, Box<dyn Error>> {
    let cli = Cli::parse();
    let mut cpu = build_machine(&cli)?;
    let reason = cpu.run_until_stop(cli.max_instructions);
    let regs = cpu.registers();
    event!(
        Level::INFO,
        "executed {} instructions in {:?} of simulated time",
        cpu.instructions_executed(),
        cpu.simulated_time()
    );
    println!("{reason}");
    println!(
        "P={:05o} A={:06o} B={:06o} X={:06o} Y={:06o} E={} O={}",
        regs.p,
        regs.a,
        regs.b,
        regs.x,
        regs.y,
        u8::from(regs.e),
        u8::from(regs.o)
    );
    Ok(reason)
}

fn main() {
    // See https://docs.rs/tracing-subscriber/0.2.17/tracing_subscriber/fmt/index.html
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Ok(layer) => layer,
        Err(e) => {
            eprintln!("failed to configure logging: {e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match run_simulator() {
        Ok(StopReason::Halt { .. }) => std::process::exit(0),
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
