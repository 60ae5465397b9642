//! Uniform byte-addressable memory interface shared by instruction
//! memory, data memory, the CSR file, the register file, and any
//! composite (bus, ranged view, tracing wrapper).
//!
//! The core holds four concrete memory references and dispatches to
//! them statically (no trait object, no vtable indirection on the hot
//! path). Composite memories that must hold heterogeneous children —
//! [`Bus`] — dispatch dynamically through `&mut dyn Memory`, matching
//! the design note in the distilled spec: static dispatch at the
//! monomorphic core boundary, dynamic dispatch only at composite
//! boundaries.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::Uxlen;

/// A 4-bit per-byte enable mask for a 32-bit access. Bit `i` gates
/// byte lane `[(i*8+7):(i*8)]`.
pub type ByteEnable = u8;

/// All four bytes enabled (a full aligned word access).
pub const BE_WORD: ByteEnable = 0b1111;

/// Uniform read/write contract. `write` touches only the byte lanes
/// selected by `byte_en`, leaving others untouched; `read` returns
/// zero in lanes not selected by `byte_en` that the implementation
/// chooses not to populate (most implementations always populate all
/// four and let the caller mask).
pub trait Memory {
    fn write(&mut self, addr: Uxlen, data: Uxlen, byte_en: ByteEnable) -> Result<()>;
    fn read(&mut self, addr: Uxlen, byte_en: ByteEnable) -> Result<Uxlen>;
}

/// Address-decoded bus: routes each access to the child memory whose
/// base address is the largest base `<= addr`, rebasing the address to
/// the local offset `addr - base`. Does not validate that attached
/// ranges don't overlap beyond rejecting a duplicate base.
#[derive(Default)]
pub struct Bus<'a> {
    nodes: BTreeMap<Uxlen, &'a mut dyn Memory>,
}

impl<'a> Bus<'a> {
    pub fn new() -> Self {
        Self { nodes: BTreeMap::new() }
    }

    /// Attaches `node` at `base_addr`. Fails if a node is already
    /// attached at that exact base.
    pub fn attach(&mut self, base_addr: Uxlen, node: &'a mut dyn Memory) -> Result<()> {
        if self.nodes.contains_key(&base_addr) {
            return Err(Error::Error(format!(
                "bus: failed to attach at base_addr=0x{base_addr:08x}, already occupied"
            )));
        }
        self.nodes.insert(base_addr, node);
        Ok(())
    }

    fn find_node(&mut self, addr: Uxlen) -> Result<(Uxlen, &mut &'a mut dyn Memory)> {
        if self.nodes.is_empty() {
            return Err(Error::Error("bus: no node attached to the bus".into()));
        }
        self.nodes
            .range_mut(..=addr)
            .next_back()
            .map(|(base, node)| (*base, node))
            .ok_or_else(|| {
                Error::illegal_addr(addr, "bus: no node covers this address")
            })
    }
}

impl<'a> Memory for Bus<'a> {
    fn write(&mut self, addr: Uxlen, data: Uxlen, byte_en: ByteEnable) -> Result<()> {
        let (base, node) = self.find_node(addr)?;
        node.write(addr - base, data, byte_en)
    }

    fn read(&mut self, addr: Uxlen, byte_en: ByteEnable) -> Result<Uxlen> {
        let (base, node) = self.find_node(addr)?;
        node.read(addr - base, byte_en)
    }
}

/// Restricts an underlying memory to `[start, start + size)`, rebasing
/// offsets so the wrapped memory only ever sees addresses relative to
/// `start`.
pub struct RangedView<'a, M: Memory + ?Sized> {
    inner: &'a mut M,
    start: Uxlen,
    size: Uxlen,
}

impl<'a, M: Memory + ?Sized> RangedView<'a, M> {
    pub fn new(inner: &'a mut M, start: Uxlen, size: Uxlen) -> Self {
        Self { inner, start, size }
    }

    fn assert_inside_range(&self, addr: Uxlen) -> Result<()> {
        if addr < self.start || addr >= self.start.saturating_add(self.size) {
            return Err(Error::illegal_addr(
                addr,
                format!(
                    "address is out of range: start=0x{:08x}, size=0x{:08x}",
                    self.start, self.size
                ),
            ));
        }
        Ok(())
    }
}

impl<'a, M: Memory + ?Sized> Memory for RangedView<'a, M> {
    fn write(&mut self, addr: Uxlen, data: Uxlen, byte_en: ByteEnable) -> Result<()> {
        self.assert_inside_range(addr)?;
        self.inner.write(addr - self.start, data, byte_en)
    }

    fn read(&mut self, addr: Uxlen, byte_en: ByteEnable) -> Result<Uxlen> {
        self.assert_inside_range(addr)?;
        self.inner.read(addr - self.start, byte_en)
    }
}
