//! Two-stage decoder: a raw 32-bit instruction word, plus the ISA
//! extension set fixed at construction, is resolved first to a
//! concrete mnemonic (with its legality checked against the opcode/
//! funct3/funct7 tables below) and then to a structured
//! [`InstructionInfo`] by instruction format. Both stages are pure
//! and the decoder is re-entrant; it holds nothing but its configured
//! [`IsaExtensionSet`].

use crate::bits::{extract, extract_concat, BitRange};
use crate::error::{Error, Result};
use crate::isa_ext::{IsaExtension, IsaExtensionSet};
use crate::Uxlen;

/// One tag per distinct RV32I/Zicsr mnemonic this simulator executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteInstruction {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Sb,
    Sh,
    Sw,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Fence,
    Mret,
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
}

/// Instruction format class. A pure function of [`ConcreteInstruction`]
/// (see [`ConcreteInstruction::instruction_type`]); governs which
/// operand fields of [`InstructionInfo`] are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionType {
    R,
    I,
    S,
    U,
    J,
    B,
    Ish5,
    None,
}

impl ConcreteInstruction {
    pub const fn instruction_type(self) -> InstructionType {
        use ConcreteInstruction::*;
        use InstructionType as T;
        match self {
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => T::R,
            Lb | Lh | Lw | Lbu | Lhu | Jalr | Addi | Slti | Sltiu | Xori | Ori | Andi | Csrrw
            | Csrrs | Csrrc | Csrrwi | Csrrsi | Csrrci => T::I,
            Slli | Srli | Srai => T::Ish5,
            Sb | Sh | Sw => T::S,
            Beq | Bne | Blt | Bge | Bltu | Bgeu => T::B,
            Lui | Auipc => T::U,
            Jal => T::J,
            Fence | Mret => T::None,
        }
    }

    /// `true` for the CSR-register forms (`csrrw`/`csrrs`/`csrrc`)
    /// whose `rs1` field holds a register to read, as opposed to the
    /// CSR-immediate forms whose `rs1` field holds a raw 5-bit uimm.
    pub const fn is_csr_reg_form(self) -> bool {
        matches!(self, ConcreteInstruction::Csrrw | ConcreteInstruction::Csrrs | ConcreteInstruction::Csrrc)
    }

    pub const fn is_csr_imm_form(self) -> bool {
        matches!(
            self,
            ConcreteInstruction::Csrrwi | ConcreteInstruction::Csrrsi | ConcreteInstruction::Csrrci
        )
    }

    pub const fn is_csr_form(self) -> bool {
        self.is_csr_reg_form() || self.is_csr_imm_form()
    }
}

/// Structured decode of an instruction word. Unused fields (given the
/// instruction's format) are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    pub rs1: u8,
    pub rs2: u8,
    pub rd: u8,
    pub imm: Uxlen,
    pub kind: ConcreteInstruction,
}

#[derive(Debug, Clone, Copy)]
#[repr(u32)]
enum Opcode {
    Load = 0b00000,
    MiscMem = 0b00011,
    OpImm = 0b00100,
    Auipc = 0b00101,
    Store = 0b01000,
    Op = 0b01100,
    Lui = 0b01101,
    Branch = 0b11000,
    Jalr = 0b11001,
    Jal = 0b11011,
    System = 0b11100,
}

impl Opcode {
    fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            0b00000 => Opcode::Load,
            0b00011 => Opcode::MiscMem,
            0b00100 => Opcode::OpImm,
            0b00101 => Opcode::Auipc,
            0b01000 => Opcode::Store,
            0b01100 => Opcode::Op,
            0b01101 => Opcode::Lui,
            0b11000 => Opcode::Branch,
            0b11001 => Opcode::Jalr,
            0b11011 => Opcode::Jal,
            0b11100 => Opcode::System,
            _ => return None,
        })
    }
}

fn funct3(word: Uxlen) -> u32 {
    extract(word, BitRange::new(14, 12), false)
}

fn funct7(word: Uxlen) -> u32 {
    extract(word, BitRange::new(31, 25), false)
}

/// A decoder configured with a fixed ISA extension set. Pure and
/// re-entrant: `decode` takes `&self` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    extensions: IsaExtensionSet,
}

impl Decoder {
    pub fn new(extensions: IsaExtensionSet) -> Self {
        Self { extensions }
    }

    pub fn decode(&self, instruction: Uxlen) -> Result<InstructionInfo> {
        let kind = self.decode_concrete(instruction)?;
        Ok(decode_fields(kind, instruction))
    }

    fn decode_concrete(&self, instruction: Uxlen) -> Result<ConcreteInstruction> {
        use ConcreteInstruction::*;

        if instruction & 0b11 != 0b11 {
            return Err(Error::illegal_instruction(
                instruction,
                "low two bits are not 0b11; only standard 32-bit instructions are supported",
            ));
        }

        let opcode_bits = extract(instruction, BitRange::new(6, 2), false);
        let opcode = Opcode::from_bits(opcode_bits).ok_or_else(|| {
            Error::illegal_instruction(instruction, format!("unrecognised opcode 0b{opcode_bits:05b}"))
        })?;
        let f3 = funct3(instruction);
        let f7 = funct7(instruction);

        let resolved = match opcode {
            Opcode::Load => match f3 {
                0 => Some(Lb),
                1 => Some(Lh),
                2 => Some(Lw),
                4 => Some(Lbu),
                5 => Some(Lhu),
                _ => None,
            },
            Opcode::OpImm => match f3 {
                0 => Some(Addi),
                1 if f7 == 0 => Some(Slli),
                2 => Some(Slti),
                3 => Some(Sltiu),
                4 => Some(Xori),
                5 => match f7 {
                    0 => Some(Srli),
                    0x20 => Some(Srai),
                    _ => None,
                },
                6 => Some(Ori),
                7 => Some(Andi),
                _ => None,
            },
            Opcode::Auipc => Some(Auipc),
            Opcode::Store => match f3 {
                0 => Some(Sb),
                1 => Some(Sh),
                2 => Some(Sw),
                _ => None,
            },
            Opcode::Op => match f3 {
                0 => match f7 {
                    0 => Some(Add),
                    0x20 => Some(Sub),
                    _ => None,
                },
                1 if f7 == 0 => Some(Sll),
                2 if f7 == 0 => Some(Slt),
                3 if f7 == 0 => Some(Sltu),
                4 if f7 == 0 => Some(Xor),
                5 => match f7 {
                    0 => Some(Srl),
                    0x20 => Some(Sra),
                    _ => None,
                },
                6 if f7 == 0 => Some(Or),
                7 if f7 == 0 => Some(And),
                _ => None,
            },
            Opcode::Lui => Some(Lui),
            Opcode::Branch => match f3 {
                0 => Some(Beq),
                1 => Some(Bne),
                4 => Some(Blt),
                5 => Some(Bge),
                6 => Some(Bltu),
                7 => Some(Bgeu),
                _ => None,
            },
            Opcode::Jalr if f3 == 0 => Some(Jalr),
            Opcode::Jalr => None,
            Opcode::Jal => Some(Jal),
            Opcode::MiscMem if f3 == 0 => Some(Fence),
            Opcode::MiscMem => None,
            Opcode::System => {
                if f3 == 0 && extract(instruction, BitRange::new(31, 7), false) == (0x3020_0000 >> 7) {
                    Some(Mret)
                } else if f3 == 0 || f3 == 4 {
                    None
                } else if self.extensions.contains(IsaExtension::Zicsr) {
                    match f3 {
                        1 => Some(Csrrw),
                        2 => Some(Csrrs),
                        3 => Some(Csrrc),
                        5 => Some(Csrrwi),
                        6 => Some(Csrrsi),
                        7 => Some(Csrrci),
                        _ => None,
                    }
                } else {
                    return Err(Error::illegal_instruction(
                        instruction,
                        format!("From extension {}", IsaExtension::Zicsr.name()),
                    ));
                }
            }
        };

        resolved.ok_or_else(|| {
            Error::illegal_instruction(
                instruction,
                format!("no legal instruction for opcode=0b{opcode_bits:05b} funct3={f3} funct7=0b{f7:07b}"),
            )
        })
    }
}

fn decode_fields(kind: ConcreteInstruction, instr: Uxlen) -> InstructionInfo {
    let mut info = InstructionInfo { rs1: 0, rs2: 0, rd: 0, imm: 0, kind };

    let rd_field = |w: Uxlen| extract(w, BitRange::new(11, 7), false) as u8;
    let rs1_field = |w: Uxlen| extract(w, BitRange::new(19, 15), false) as u8;
    let rs2_field = |w: Uxlen| extract(w, BitRange::new(24, 20), false) as u8;

    match kind.instruction_type() {
        InstructionType::R => {
            info.rd = rd_field(instr);
            info.rs1 = rs1_field(instr);
            info.rs2 = rs2_field(instr);
        }
        InstructionType::I => {
            info.rd = rd_field(instr);
            info.rs1 = rs1_field(instr);
            // CSR forms: the [31:20] field is the zero-extended CSR
            // address, not a sign-extended immediate.
            let sext = !kind.is_csr_form();
            info.imm = extract(instr, BitRange::new(31, 20), sext);
        }
        InstructionType::Ish5 => {
            info.rd = rd_field(instr);
            info.rs1 = rs1_field(instr);
            info.imm = extract(instr, BitRange::new(24, 20), false);
        }
        InstructionType::S => {
            info.rs1 = rs1_field(instr);
            info.rs2 = rs2_field(instr);
            info.imm = extract_concat(instr, &[BitRange::new(31, 25), BitRange::new(11, 7)], true);
        }
        InstructionType::B => {
            info.rs1 = rs1_field(instr);
            info.rs2 = rs2_field(instr);
            let unshifted = extract_concat(
                instr,
                &[BitRange::bit(31), BitRange::bit(7), BitRange::new(30, 25), BitRange::new(11, 8)],
                false,
            );
            info.imm = crate::bits::sign_extend(unshifted << 1, 12);
        }
        InstructionType::U => {
            info.rd = rd_field(instr);
            info.imm = extract(instr, BitRange::new(31, 12), false);
        }
        InstructionType::J => {
            info.rd = rd_field(instr);
            info.imm = extract_concat(
                instr,
                &[BitRange::bit(31), BitRange::new(19, 12), BitRange::bit(20), BitRange::new(30, 21)],
                false,
            ) << 1;
            info.imm = crate::bits::sign_extend(info.imm, 20);
        }
        InstructionType::None => {}
    }

    info
}
