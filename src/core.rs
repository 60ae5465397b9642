//! Execute dispatch and the per-cycle fetch/decode/execute/writeback
//! loop.
//!
//! `Core` holds four concrete memories as generic type parameters
//! (static dispatch at this monomorphic boundary, per the design note
//! on uniform memory polymorphism) plus a [`Decoder`] fixed at
//! construction and the pending-interrupt flag. One call to
//! [`Core::cycle`] either services a pending interrupt or executes
//! exactly one instruction.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::alu::{self, alu};
use crate::csr::{self, CsrFile};
use crate::decode::{ConcreteInstruction, Decoder, InstructionInfo};
use crate::error::{Error, Result};
use crate::instr_mem::InstrMem;
use crate::isa_ext::IsaExtensionSet;
use crate::lsu;
use crate::memory::{Memory, BE_WORD};
use crate::registers::RegisterFile;
use crate::Uxlen;

/// Coarse dispatch class a [`ConcreteInstruction`] resolves to. Every
/// variant of `ConcreteInstruction` maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerType {
    CalcReg,
    CalcImm,
    Load,
    Store,
    Branch,
    CsrImm,
    CsrReg,
    Jal,
    Jalr,
    Lui,
    Auipc,
    Mret,
    Fence,
}

impl HandlerType {
    fn of(kind: ConcreteInstruction) -> Self {
        use ConcreteInstruction::*;
        match kind {
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => HandlerType::CalcReg,
            Addi | Slti | Sltiu | Xori | Ori | Andi | Slli | Srli | Srai => HandlerType::CalcImm,
            Lb | Lh | Lw | Lbu | Lhu => HandlerType::Load,
            Sb | Sh | Sw => HandlerType::Store,
            Beq | Bne | Blt | Bge | Bltu | Bgeu => HandlerType::Branch,
            Csrrwi | Csrrsi | Csrrci => HandlerType::CsrImm,
            Csrrw | Csrrs | Csrrc => HandlerType::CsrReg,
            Jal => HandlerType::Jal,
            Jalr => HandlerType::Jalr,
            Lui => HandlerType::Lui,
            Auipc => HandlerType::Auipc,
            Mret => HandlerType::Mret,
            Fence => HandlerType::Fence,
        }
    }
}

fn alu_op(kind: ConcreteInstruction) -> alu::Op {
    use alu::Op as A;
    use ConcreteInstruction::*;
    match kind {
        Add | Addi => A::Add,
        Sub => A::Sub,
        Xor | Xori => A::Xor,
        Or | Ori => A::Or,
        And | Andi => A::And,
        Sll | Slli => A::Sll,
        Srl | Srli => A::Srl,
        Sra | Srai => A::Sra,
        Slt | Slti => A::Slts,
        Sltu | Sltiu => A::Sltu,
        other => unreachable!("{other:?} has no ALU op"),
    }
}

fn branch_alu_op(kind: ConcreteInstruction) -> alu::Op {
    use alu::Op as A;
    use ConcreteInstruction::*;
    match kind {
        Beq => A::Eq,
        Bne => A::Ne,
        Blt => A::Lts,
        Bge => A::Ges,
        Bltu => A::Ltu,
        Bgeu => A::Geu,
        other => unreachable!("{other:?} is not a branch"),
    }
}

fn lsu_op(kind: ConcreteInstruction) -> lsu::Op {
    use lsu::Op as L;
    use ConcreteInstruction::*;
    match kind {
        Lb | Sb => L::B,
        Lbu => L::Bu,
        Lh | Sh => L::H,
        Lhu => L::Hu,
        Lw | Sw => L::W,
        other => unreachable!("{other:?} is not a load/store"),
    }
}

fn csr_rmw_op(kind: ConcreteInstruction) -> csr::Op {
    use csr::Op as C;
    use ConcreteInstruction::*;
    match kind {
        Csrrw | Csrrwi => C::Rw,
        Csrrs | Csrrsi => C::Rs,
        Csrrc | Csrrci => C::Rc,
        other => unreachable!("{other:?} is not a csr instruction"),
    }
}

/// No-op host callback: discards the PC the core suggests saving to
/// MEPC, and performs no MTVEC redirection.
fn noop_irq_entry(_pc: Uxlen) {}

/// No-op host callback invoked on `mret`.
fn noop_irq_return() {}

/// The simulator core: fetch/decode/execute/writeback over four host-
/// owned memories, plus interrupt servicing between instructions.
///
/// The data memory is a generic parameter `D`, not `&mut dyn Memory`:
/// the call site is monomorphic per host configuration (one `Core<D>`
/// instantiation per concrete `D`), so this stays static dispatch even
/// though a host is free to instantiate `D` as [`crate::data_mem::DataMem`],
/// a [`crate::memory::Bus`], or a [`crate::trace::TracingMemory`]
/// wrapper around either. `instr_mem`, `csr`, and `rf` are always the
/// concrete types since nothing else in this crate implements their
/// roles.
///
/// `on_irq_entry`/`on_irq_return` are plain function pointers rather
/// than boxed closures, since the host harness (`emulate`, `rvdbg`,
/// tests) needs nothing more expressive than "notify me, I'll poke
/// the CSR file myself before the next `cycle()`".
pub struct Core<'a, D: Memory + ?Sized> {
    instr_mem: &'a mut InstrMem,
    data_mem: &'a mut D,
    csr: &'a mut CsrFile,
    rf: &'a mut RegisterFile,
    decoder: Decoder,
    pc: Uxlen,
    irq_req: AtomicBool,
    on_irq_entry: fn(Uxlen),
    on_irq_return: fn(),
}

impl<'a, D: Memory + ?Sized> Core<'a, D> {
    pub fn new(
        instr_mem: &'a mut InstrMem,
        data_mem: &'a mut D,
        csr: &'a mut CsrFile,
        rf: &'a mut RegisterFile,
        isa_extensions: IsaExtensionSet,
    ) -> Self {
        Self {
            instr_mem,
            data_mem,
            csr,
            rf,
            decoder: Decoder::new(isa_extensions),
            pc: 0,
            irq_req: AtomicBool::new(false),
            on_irq_entry: noop_irq_entry,
            on_irq_return: noop_irq_return,
        }
    }

    pub fn pc(&self) -> Uxlen {
        self.pc
    }

    /// The register file, for host/test inspection. `Core` holds the
    /// only remaining handle to it once constructed (it was moved in
    /// as `&mut`), so callers read registers through this accessor
    /// rather than keeping their own reference alive.
    pub fn registers(&self) -> &RegisterFile {
        self.rf
    }

    /// Reads `addr` from the data memory through the `Core`'s held
    /// reference. Takes `&mut self` because [`Memory::read`] does,
    /// even though a read is conceptually side-effect free.
    pub fn read_data_mem(&mut self, addr: Uxlen, byte_en: crate::memory::ByteEnable) -> Result<Uxlen> {
        self.data_mem.read(addr, byte_en)
    }

    /// Reads a CSR through the `Core`'s held reference.
    pub fn read_csr(&mut self, addr: Uxlen) -> Result<Uxlen> {
        self.csr.read(addr, BE_WORD)
    }

    pub fn set_on_irq_entry(&mut self, callback: fn(Uxlen)) {
        self.on_irq_entry = callback;
    }

    pub fn set_on_irq_return(&mut self, callback: fn()) {
        self.on_irq_return = callback;
    }

    /// Sets the pending-interrupt flag, observable by the next
    /// `cycle()`. Safe to call from another thread: the flag is an
    /// `AtomicBool`, so no memory-barrier gymnastics are required of
    /// the caller.
    pub fn request_irq(&self) {
        self.irq_req.store(true, Ordering::SeqCst);
    }

    /// Advances the simulator by one cycle: services a pending
    /// interrupt, or fetches, decodes, and executes one instruction.
    ///
    /// On `Err`, the cycle is aborted: no register, memory, or PC
    /// mutation from the failed instruction is observable, and the PC
    /// is left pointing at the instruction that failed to execute.
    pub fn cycle(&mut self) -> Result<()> {
        if self.irq_req.swap(false, Ordering::SeqCst) {
            log::trace!("core: servicing pending irq at pc=0x{:08x}", self.pc);
            (self.on_irq_entry)(self.pc);
            return Ok(());
        }

        let instruction = self.instr_mem.read(self.pc, BE_WORD)?;
        let info = match self.decoder.decode(instruction) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("core: decode failed at pc=0x{:08x}: {e}", self.pc);
                return Err(e);
            }
        };

        log::trace!(
            "core: pc=0x{:08x} instruction=0x{instruction:08x} kind={:?}",
            self.pc,
            info.kind
        );

        match self.dispatch(&info) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("core: execute failed at pc=0x{:08x}: {e}", self.pc);
                Err(e)
            }
        }
    }

    /// Reads register `index` through the inherent [`RegisterFile::read`],
    /// bypassing the blanket [`Memory`] impl also in scope here (both
    /// have a method named `read`; a bare `self.rf.read(..)` would
    /// resolve to the trait's 3-argument `Memory::read` since `self.rf`
    /// is already `&mut RegisterFile`, not to the 1-argument inherent
    /// method one autoderef further in).
    fn reg(&self, index: u8) -> Uxlen {
        RegisterFile::read(self.rf, index)
    }

    /// Writes register `index` through the inherent
    /// [`RegisterFile::write`]; see [`Core::reg`] for why this can't be
    /// spelled `self.rf.write(..)`.
    fn set_reg(&mut self, index: u8, value: Uxlen) {
        RegisterFile::write(self.rf, index, value)
    }

    fn dispatch(&mut self, info: &InstructionInfo) -> Result<()> {
        match HandlerType::of(info.kind) {
            HandlerType::CalcImm => {
                let a = self.reg(info.rs1);
                let out = alu(alu_op(info.kind), a, info.imm);
                self.set_reg(info.rd, out.result);
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::CalcReg => {
                let a = self.reg(info.rs1);
                let b = self.reg(info.rs2);
                let out = alu(alu_op(info.kind), a, b);
                self.set_reg(info.rd, out.result);
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::Load => {
                let op = lsu_op(info.kind);
                let addr = self.reg(info.rs1).wrapping_add(info.imm);
                if lsu::is_misaligned(op, addr) {
                    return Err(Error::misalignment(addr, "load width exceeds address alignment"));
                }
                let word = self.data_mem.read(addr, lsu::byte_enable(op, addr))?;
                self.set_reg(info.rd, lsu::transform(op, addr, word));
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::Store => {
                let op = lsu_op(info.kind);
                let addr = self.reg(info.rs1).wrapping_add(info.imm);
                if lsu::is_misaligned(op, addr) {
                    return Err(Error::misalignment(addr, "store width exceeds address alignment"));
                }
                let data = self.reg(info.rs2);
                self.data_mem.write(addr, data, lsu::byte_enable(op, addr))?;
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::Branch => {
                let a = self.reg(info.rs1);
                let b = self.reg(info.rs2);
                if alu(branch_alu_op(info.kind), a, b).flag {
                    self.pc = self.pc.wrapping_add(info.imm);
                } else {
                    self.pc = self.pc.wrapping_add(4);
                }
            }
            HandlerType::Jal => {
                self.set_reg(info.rd, self.pc.wrapping_add(4));
                self.pc = self.pc.wrapping_add(info.imm);
            }
            HandlerType::Jalr => {
                let base = self.reg(info.rs1);
                let target = base.wrapping_add(info.imm) & !1;
                self.set_reg(info.rd, self.pc.wrapping_add(4));
                self.pc = target;
            }
            HandlerType::Lui => {
                self.set_reg(info.rd, info.imm << 12);
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::Auipc => {
                self.set_reg(info.rd, self.pc.wrapping_add(info.imm << 12));
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::CsrReg => {
                let data = self.reg(info.rs1);
                let old = csr::csr_op(self.csr, csr_rmw_op(info.kind), info.imm, data)?;
                self.set_reg(info.rd, old);
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::CsrImm => {
                let data = info.rs1 as Uxlen;
                let old = csr::csr_op(self.csr, csr_rmw_op(info.kind), info.imm, data)?;
                self.set_reg(info.rd, old);
                self.pc = self.pc.wrapping_add(4);
            }
            HandlerType::Mret => {
                self.pc = self.csr.read(crate::csr::MEPC as Uxlen, BE_WORD)?;
                (self.on_irq_return)();
            }
            HandlerType::Fence => {
                self.pc = self.pc.wrapping_add(4);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_mem::DataMem;
    use crate::isa_ext::IsaExtension;

    fn new_core<'a>(
        instr_mem: &'a mut InstrMem,
        data_mem: &'a mut DataMem,
        csr: &'a mut CsrFile,
        rf: &'a mut RegisterFile,
        extensions: IsaExtensionSet,
    ) -> Core<'a, DataMem> {
        Core::new(instr_mem, data_mem, csr, rf, extensions)
    }

    #[test]
    fn addi_x1_x0_1() {
        let mut instr_mem = InstrMem::new(vec![0x0010_0093]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        core.cycle().unwrap();
        assert_eq!(core.registers().read(1), 1);
        assert_eq!(core.pc(), 4);
    }

    #[test]
    fn store_word_sequence() {
        let mut instr_mem =
            InstrMem::new(vec![0xfff0_0193, 0x0040_0213, 0x0032_2023]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        core.cycle().unwrap();
        core.cycle().unwrap();
        core.cycle().unwrap();

        assert_eq!(core.registers().read(3), 0xFFFF_FFFF);
        assert_eq!(core.registers().read(4), 4);
        assert_eq!(core.read_data_mem(4, BE_WORD).unwrap(), 0xFFFF_FFFF);
        assert_eq!(core.pc(), 12);
    }

    #[test]
    fn csrrw_writes_mtvec_and_x0_is_observable() {
        let mut instr_mem = InstrMem::new(vec![0x3052_9073]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        rf.write(5, 0x1234);
        let extensions = IsaExtensionSet::empty().with(IsaExtension::Zicsr);
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, extensions);

        core.cycle().unwrap();

        assert_eq!(core.read_csr(crate::csr::MTVEC as Uxlen).unwrap(), 0x1234);
        // Not hard-wired: the CSR read-back is written through to x0.
        assert_eq!(core.registers().read(0), 0x1234);
    }

    #[test]
    fn csrrw_without_zicsr_fails_and_does_not_advance_pc() {
        let mut instr_mem = InstrMem::new(vec![0x3052_9073]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        let err = core.cycle().unwrap_err();
        assert!(matches!(err, Error::IllegalInstruction { .. }));
        assert_eq!(core.pc(), 0);
    }

    #[test]
    fn lui_x27_50() {
        let mut instr_mem = InstrMem::new(vec![0x0003_2db7]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        core.cycle().unwrap();
        assert_eq!(core.registers().read(27), 0x0003_2000);
    }

    #[test]
    fn misaligned_halfword_store_fails_and_leaves_memory_untouched() {
        // sh x1, 1(x0)
        let mut instr_mem = InstrMem::new(vec![0x0010_10a3]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        rf.write(1, 0xFFFF);
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        let err = core.cycle().unwrap_err();
        assert!(matches!(err, Error::Misalignment { addr: 1, .. }));
        assert!(core.read_data_mem(1, BE_WORD).is_err());
    }

    #[test]
    fn pending_irq_is_serviced_without_executing_an_instruction() {
        let mut instr_mem = InstrMem::new(vec![0x0010_0093]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());

        core.request_irq();
        core.cycle().unwrap();

        // The pending instruction (addi x1, x0, 1) was not executed.
        assert_eq!(core.registers().read(1), 0);
        assert_eq!(core.pc(), 0);

        // The next cycle executes it normally.
        core.cycle().unwrap();
        assert_eq!(core.registers().read(1), 1);
    }

    #[test]
    fn on_irq_entry_callback_is_invoked_with_the_interrupted_pc() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static SEEN_PC: AtomicU32 = AtomicU32::new(u32::MAX);
        fn record(pc: Uxlen) {
            SEEN_PC.store(pc, Ordering::SeqCst);
        }

        let mut instr_mem = InstrMem::new(vec![0x0010_0093]);
        let mut data_mem = DataMem::new();
        let mut csr = CsrFile::new();
        let mut rf = RegisterFile::new();
        let mut core = new_core(&mut instr_mem, &mut data_mem, &mut csr, &mut rf, IsaExtensionSet::empty());
        core.set_on_irq_entry(record);

        core.request_irq();
        core.cycle().unwrap();

        assert_eq!(SEEN_PC.load(Ordering::SeqCst), 0);
    }
}
