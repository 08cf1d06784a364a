use std::mem;

use bytemuck::Pod;

/// Packs constant data of a single dispatch into bytes.
///
/// Values are appended in call order with no padding other than what the
/// types themselves carry, so the order of [`Self::add()`] calls has to match
/// the layout the kernel expects.
#[derive(Clone, Debug, Default)]
pub struct ConstantWriter {
    buf: Vec<u8>,
    max_size: usize,
}

impl ConstantWriter {
    pub fn add<T>(&mut self, value: T) -> &mut Self
    where
        T: Pod,
    {
        self.buf.extend_from_slice(bytemuck::bytes_of(&value));
        self.max_size = self.max_size.max(self.buf.len());
        self
    }

    /// Registers a dispatch that will write `size` bytes, without writing
    /// anything.
    pub fn declare(&mut self, size: usize) {
        self.max_size = self.max_size.max(size);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the largest dispatch declared or written so far; that's how
    /// large the constant buffer has to be.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the bytes written so far, preparing the writer for the next
    /// dispatch.
    pub fn finish(&mut self) -> Vec<u8> {
        mem::take(&mut self.buf)
    }
}
