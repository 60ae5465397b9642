//! Loads an ELF image, runs it to completion or to a breakpoint, and
//! prints final state. Flag shape follows the pattern of the original
//! `emulate` driver, trimmed to what this simulator actually models
//! (no UART, no mcycle counter).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap_num::maybe_hex;

use rv32i_sim::core::Core;
use rv32i_sim::csr::CsrFile;
use rv32i_sim::data_mem::DataMem;
use rv32i_sim::elf_loader::load_elf;
use rv32i_sim::instr_mem::InstrMem;
use rv32i_sim::isa_ext::{IsaExtension, IsaExtensionSet};
use rv32i_sim::memory::{Memory, BE_WORD};
use rv32i_sim::registers::RegisterFile;

/// Run an RV32I + Zicsr program to completion or to a breakpoint.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input ELF executable
    input: PathBuf,

    /// Print the decoded instruction and PC before every cycle
    #[arg(short, long)]
    debug: bool,

    /// Stop (without executing it) once the PC reaches this address
    /// (use a 0x prefix for hexadecimal)
    #[arg(short, long, value_parser = maybe_hex::<u32>)]
    pc_breakpoint: Option<u32>,

    /// Call `request_irq()` right before the cycle at this index
    #[arg(short = 'n', long, value_parser = maybe_hex::<u64>)]
    irq_at_cycle: Option<u64>,

    /// Print the 8-word data memory region starting at this address
    /// once execution stops (use a 0x prefix for hexadecimal)
    #[arg(short, long, value_parser = maybe_hex::<u32>)]
    memory: Option<u32>,
}

fn print_memory(data_mem: &mut DataMem, base: u32) {
    for n in 0..8u32 {
        let addr = base.wrapping_add(4 * n);
        match data_mem.read(addr, BE_WORD) {
            Ok(word) => println!("{addr:08x}: {word:08x}"),
            Err(e) => println!("{addr:08x}: <{e}>"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let words = load_elf(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let mut instr_mem = InstrMem::new(words);
    let mut data_mem = DataMem::new();
    let mut csr = CsrFile::new();
    let mut rf = RegisterFile::new();
    let extensions = IsaExtensionSet::empty().with(IsaExtension::Zicsr);

    let mut core = Core::new(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, extensions);

    let mut cycle_count: u64 = 0;
    loop {
        if let Some(bp) = args.pc_breakpoint {
            if core.pc() == bp {
                println!("reached breakpoint pc=0x{bp:08x} after {cycle_count} cycles");
                break;
            }
        }

        if args.irq_at_cycle == Some(cycle_count) {
            println!("requesting irq before cycle {cycle_count}");
            core.request_irq();
        }

        if args.debug {
            println!("cycle {cycle_count}: pc=0x{:08x}", core.pc());
        }

        if let Err(e) = core.cycle() {
            println!("stopped at pc=0x{:08x} after {cycle_count} cycles: {e}", core.pc());
            break;
        }

        cycle_count += 1;
    }

    let final_pc = core.pc();
    drop(core);

    println!("final pc = 0x{final_pc:08x}");
    println!("rf[1] = 0x{:08x}", rf.read(1));

    if let Some(base) = args.memory {
        println!("memory from 0x{base:08x}:");
        print_memory(&mut data_mem, base);
    }

    Ok(())
}
