//! Interactive single-step debugger. Completes the `rustyline`
//! dependency into an actual REPL: `step`, `regs`, `mem <addr>`,
//! `irq`, `quit`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rv32i_sim::core::Core;
use rv32i_sim::csr::CsrFile;
use rv32i_sim::data_mem::DataMem;
use rv32i_sim::elf_loader::load_elf;
use rv32i_sim::instr_mem::InstrMem;
use rv32i_sim::isa_ext::{IsaExtension, IsaExtensionSet};
use rv32i_sim::memory::BE_WORD;
use rv32i_sim::registers::RegisterFile;

/// Single-step an RV32I + Zicsr program interactively.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input ELF executable
    input: PathBuf,
}

fn print_regs(rf: &RegisterFile) {
    for (i, value) in rf.contents().iter().enumerate() {
        print!("x{i:<2}=0x{value:08x} ");
        if i % 4 == 3 {
            println!();
        }
    }
    println!();
}

fn print_mem(core: &mut Core<DataMem>, addr: u32) {
    match core.read_data_mem(addr, BE_WORD) {
        Ok(word) => println!("0x{addr:08x}: 0x{word:08x}"),
        Err(e) => println!("0x{addr:08x}: {e}"),
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

    let mut rl = DefaultEditor::new().context("failed to start the line editor")?;

    println!("rvdbg: loaded {}. type 'step', 'regs', 'mem <addr>', 'irq', or 'quit'.", args.input.display());

    loop {
        let line = match rl.readline(&format!("rvdbg [pc=0x{:08x}]> ", core.pc())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("readline failed"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        let mut words = line.split_whitespace();
        match words.next() {
            Some("step") => match core.cycle() {
                Ok(()) => println!("ok, pc=0x{:08x}", core.pc()),
                Err(e) => println!("error: {e}"),
            },
            Some("irq") => {
                core.request_irq();
                println!("interrupt requested");
            }
            Some("regs") => print_regs(core.registers()),
            Some("mem") => match words.next().and_then(|s| {
                let s = s.trim_start_matches("0x");
                u32::from_str_radix(s, 16).ok()
            }) {
                Some(addr) => print_mem(&mut core, addr),
                None => println!("usage: mem <hex addr>"),
            },
            Some("quit") | Some("exit") => break,
            _ => println!("unrecognised command: {line}"),
        }
    }

    Ok(())
}
