//! Tracing wrapper: forwards to an underlying memory and logs a trace
//! record per operation, at `log::Level::Trace`. Logging happens
//! around the delegated call, so a trace observes the operand values
//! that led to a failure as well as a success (the underlying call's
//! `Result` is just forwarded).

use crate::error::Result;
use crate::memory::{ByteEnable, Memory};
use crate::Uxlen;

pub struct TracingMemory<'a, M: Memory + ?Sized> {
    inner: &'a mut M,
    label: &'a str,
}

impl<'a, M: Memory + ?Sized> TracingMemory<'a, M> {
    pub fn new(inner: &'a mut M, label: &'a str) -> Self {
        Self { inner, label }
    }
}

impl<'a, M: Memory + ?Sized> Memory for TracingMemory<'a, M> {
    fn write(&mut self, addr: Uxlen, data: Uxlen, byte_en: ByteEnable) -> Result<()> {
        let result = self.inner.write(addr, data, byte_en);
        match &result {
            Ok(()) => log::trace!(
                "{} write addr=0x{addr:08x} data=0x{data:08x} byte_en=0x{byte_en:x}",
                self.label
            ),
            Err(e) => log::trace!(
                "{} write addr=0x{addr:08x} data=0x{data:08x} byte_en=0x{byte_en:x} failed: {e}",
                self.label
            ),
        }
        result
    }

    fn read(&mut self, addr: Uxlen, byte_en: ByteEnable) -> Result<Uxlen> {
        let result = self.inner.read(addr, byte_en);
        match &result {
            Ok(data) => log::trace!(
                "{} read addr=0x{addr:08x} data=0x{data:08x} byte_en=0x{byte_en:x}",
                self.label
            ),
            Err(e) => log::trace!(
                "{} read addr=0x{addr:08x} byte_en=0x{byte_en:x} failed: {e}",
                self.label
            ),
        }
        result
    }
}
