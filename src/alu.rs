//! Pure arithmetic/logic/comparison unit: `alu(op, a, b) -> (result,
//! flag)`. All 32-bit, wrapping where applicable; shifts use `b &
//! 0x1F` as the shift amount. Callers pick which of `result`/`flag`
//! is meaningful by operation class (calc ops populate `result`,
//! compare ops populate `flag`).

use crate::{Sxlen, Uxlen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Xor,
    Or,
    And,
    Sll,
    Srl,
    Sra,
    Slts,
    Sltu,
    Lts,
    Ltu,
    Ges,
    Geu,
    Eq,
    Ne,
}

/// Output of an ALU evaluation: a 32-bit `result` for calculation
/// operations, and a boolean `flag` for comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Output {
    pub result: Uxlen,
    pub flag: bool,
}

pub fn alu(op: Op, a: Uxlen, b: Uxlen) -> Output {
    let shamt = b & 0x1F;
    let a_signed = a as Sxlen;
    let b_signed = b as Sxlen;

    match op {
        Op::Add => Output { result: a.wrapping_add(b), flag: false },
        Op::Sub => Output { result: a.wrapping_sub(b), flag: false },
        Op::Xor => Output { result: a ^ b, flag: false },
        Op::Or => Output { result: a | b, flag: false },
        Op::And => Output { result: a & b, flag: false },
        Op::Sll => Output { result: a.wrapping_shl(shamt), flag: false },
        Op::Srl => Output { result: a.wrapping_shr(shamt), flag: false },
        Op::Sra => Output { result: a_signed.wrapping_shr(shamt) as Uxlen, flag: false },
        Op::Slts => Output { result: (a_signed < b_signed) as Uxlen, flag: false },
        Op::Sltu => Output { result: (a < b) as Uxlen, flag: false },
        Op::Lts => Output { result: 0, flag: a_signed < b_signed },
        Op::Ltu => Output { result: 0, flag: a < b },
        Op::Ges => Output { result: 0, flag: a_signed >= b_signed },
        Op::Geu => Output { result: 0, flag: a >= b },
        Op::Eq => Output { result: 0, flag: a == b },
        Op::Ne => Output { result: 0, flag: a != b },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps() {
        assert_eq!(alu(Op::Add, u32::MAX, 1).result, 0);
        assert_eq!(alu(Op::Add, 1, 2).result, 3);
        assert_eq!(alu(Op::Add, 1, (-2i32) as u32).result, u32::MAX);
    }

    #[test]
    fn sub_wraps() {
        assert_eq!(alu(Op::Sub, 0, 1).result, u32::MAX);
    }

    #[test]
    fn shifts_mask_shift_amount_to_5_bits() {
        // shamt = 33 & 0x1F = 1
        assert_eq!(alu(Op::Sll, 1, 33).result, 2);
    }

    #[test]
    fn sra_is_arithmetic() {
        let a = 0x8000_0000u32; // INT_MIN
        assert_eq!(alu(Op::Sra, a, 4).result, 0xF800_0000);
    }

    #[test]
    fn srl_is_logical() {
        let a = 0x8000_0000u32;
        assert_eq!(alu(Op::Srl, a, 4).result, 0x0800_0000);
    }

    #[test]
    fn slts_signed_compare() {
        assert_eq!(alu(Op::Slts, (-1i32) as u32, 0).result, 1);
        assert_eq!(alu(Op::Slts, 0, (-1i32) as u32).result, 0);
    }

    #[test]
    fn sltu_unsigned_compare() {
        assert_eq!(alu(Op::Sltu, (-1i32) as u32, 0).result, 0);
    }

    #[test]
    fn compare_ops_set_flag_not_result() {
        let out = alu(Op::Eq, 5, 5);
        assert!(out.flag);
        assert_eq!(out.result, 0);
        let out = alu(Op::Ne, 5, 5);
        assert!(!out.flag);
    }

    #[test]
    fn ge_signed_and_unsigned() {
        assert!(alu(Op::Ges, 0, (-1i32) as u32).flag);
        assert!(!alu(Op::Geu, 0, (-1i32) as u32).flag);
    }

    #[test]
    fn alu_is_pure() {
        let a = alu(Op::Add, 7, 9);
        let b = alu(Op::Add, 7, 9);
        assert_eq!(a, b);
    }
}
