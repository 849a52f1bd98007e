use std::collections::HashMap;

use anyhow::ensure;
use bytes::{BufMut, Bytes, BytesMut};

use crate::domain_name::DomainName;

/// Largest offset a compression pointer can address (14 bits).
const MAX_POINTER_OFFSET: usize = 0x3FFF;

pub struct DnsMessageWriter {
    buf: BytesMut,
    max_len: usize,
    /// Offsets of names already written, keyed by their lowercased wire suffix.
    names: HashMap<Vec<u8>, u16>,
    compress: bool,
}

impl DnsMessageWriter {
    /// Create a new DNS message writer with a custom maximum message length.
    pub fn new_with_max(max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_len.min(512)), // 512 is min dns message payload size.
            max_len,
            names: HashMap::new(),
            compress: true,
        }
    }

    /// Create a new DNS message writer bounded by the largest possible DNS message.
    pub fn new() -> Self {
        Self::new_with_max(u16::MAX as usize)
    }

    /// Enable or disable name compression. Enabled by default.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[inline]
    fn ensure_space(&mut self, need: usize, what: &str) -> anyhow::Result<()> {
        let cur = self.buf.len();
        let new_len = cur
            .checked_add(need)
            .ok_or_else(|| anyhow::anyhow!("length overflow"))?;
        ensure!(
            new_len <= self.max_len,
            "buffer overflow while writing {}: need={} current_len={} max_len={}",
            what,
            need,
            cur,
            self.max_len
        );
        if new_len > self.buf.capacity() {
            // grow but never beyond max_len
            self.buf.reserve(new_len - self.buf.capacity());
        }
        Ok(())
    }

    /// Write a u8 to the buffer.
    pub fn write_u8(&mut self, value: u8) -> anyhow::Result<()> {
        self.ensure_space(std::mem::size_of::<u8>(), "u8")?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Write a u16 to the buffer.
    pub fn write_u16(&mut self, value: u16) -> anyhow::Result<()> {
        self.ensure_space(std::mem::size_of::<u16>(), "u16")?;
        self.buf.put_u16(value);
        Ok(())
    }

    /// Write a u32 to the buffer.
    pub fn write_u32(&mut self, value: u32) -> anyhow::Result<()> {
        self.ensure_space(std::mem::size_of::<u32>(), "u32")?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Write a qname to the buffer, pointing at a previously written suffix when compression is enabled.
    pub fn write_qname(&mut self, qname: &DomainName) -> anyhow::Result<()> {
        self.write_name(qname, self.compress)
    }

    /// Write a qname without compression, as required for SRV targets and EDNS.
    pub fn write_qname_uncompressed(&mut self, qname: &DomainName) -> anyhow::Result<()> {
        self.write_name(qname, false)
    }

    fn write_name(&mut self, qname: &DomainName, compress: bool) -> anyhow::Result<()> {
        let mut suffix = qname.wire();

        // each pass writes one label, `suffix` is always the remaining wire form
        while suffix.len() > 1 {
            if compress {
                let key = suffix.to_ascii_lowercase();
                if let Some(&offset) = self.names.get(&key) {
                    return self.write_u16(0xC000 | offset);
                }

                let pos = self.buf.len();
                if pos <= MAX_POINTER_OFFSET {
                    self.names.insert(key, pos as u16);
                }
            }

            let label_end = 1 + suffix[0] as usize;
            self.write_bytes(&suffix[..label_end])?;
            suffix = &suffix[label_end..];
        }

        // root terminator
        self.write_u8(0)
    }

    /// Write raw bytes to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.ensure_space(data.len(), "raw bytes")?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Overwrite already written bytes at `pos`.
    pub fn overwrite_bytes(&mut self, pos: usize, data: &[u8]) -> anyhow::Result<()> {
        let end = pos
            .checked_add(data.len())
            .ok_or_else(|| anyhow::anyhow!("length overflow"))?;
        ensure!(
            end <= self.buf.len(),
            "overwrite out of bounds: pos={} len={} buf_len={}",
            pos,
            data.len(),
            self.buf.len()
        );
        self.buf[pos..end].copy_from_slice(data);
        Ok(())
    }

    /// Current write position.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Get the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for DnsMessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub trait DnsWritable {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()>;
}
