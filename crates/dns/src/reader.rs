use anyhow::{bail, ensure};

use crate::domain_name::DomainName;

/// A reader for DNS messages that allows reading various components
pub struct DnsMessageReader<'a> {
    /// Internal buffer containing the DNS message.
    buffer: &'a [u8],
    /// Position in bytes.
    position: usize,
}

impl<'a> DnsMessageReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Seek to a position inside the buffer.
    pub fn seek(&mut self, pos: usize) -> anyhow::Result<()> {
        let len = self.buffer.len();
        ensure!(pos <= len, "seek out of bounds: pos={} len={}", pos, len);
        self.position = pos;
        Ok(())
    }

    #[inline]
    fn need(&self, need: usize, what: &str) -> anyhow::Result<()> {
        let rem = self.remaining();
        ensure!(
            need <= rem,
            "buffer underflow at pos {} while reading {}: need {} bytes, have {}",
            self.position,
            what,
            need,
            rem
        );
        Ok(())
    }

    #[inline]
    fn need_at(&self, upto_exclusive: usize, what: &str) -> anyhow::Result<()> {
        ensure!(
            upto_exclusive <= self.buffer.len(),
            "buffer underflow while reading {}: need bytes up to {}, len {} (pos {})",
            what,
            upto_exclusive,
            self.buffer.len(),
            self.position
        );
        Ok(())
    }

    /// Read a single byte from the DNS message.
    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        self.need(std::mem::size_of::<u8>(), "u8")?;
        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(byte)
    }

    /// Read a u16 from the DNS message.
    pub fn read_u16(&mut self) -> anyhow::Result<u16> {
        self.need(std::mem::size_of::<u16>(), "u16")?;

        let bytes = &self.buffer[self.position..self.position + 2];
        let word = u16::from_be_bytes([bytes[0], bytes[1]]);

        self.position += 2;

        Ok(word)
    }

    /// Read a u32 from the DNS message.
    pub fn read_u32(&mut self) -> anyhow::Result<u32> {
        self.need(std::mem::size_of::<u32>(), "u32")?;

        let data = &self.buffer[self.position..self.position + 4];
        let qword = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);

        self.position += 4;
        Ok(qword)
    }

    /// Read a DNS name (qname) from the message, following compression pointers.
    ///
    /// Label bytes are kept as they are. Every pointer must land before the previous jump target, so a
    /// name can never revisit bytes it already read.
    pub fn read_qname(&mut self) -> anyhow::Result<DomainName> {
        let mut labels: Vec<&'a [u8]> = Vec::new();
        let mut cursor = self.position;
        let mut floor = self.position;
        let mut resume = None;

        loop {
            let Some(&len) = self.buffer.get(cursor) else {
                bail!("name runs past the end of the message at pos {}", cursor);
            };

            match len & 0xC0 {
                0x00 if len == 0 => {
                    cursor += 1;
                    break;
                }
                0x00 => {
                    let start = cursor + 1;
                    let end = start + len as usize;
                    self.need_at(end, "label")?;
                    labels.push(&self.buffer[start..end]);
                    cursor = end;
                }
                0xC0 => {
                    self.need_at(cursor + 2, "compression pointer")?;
                    let target = (usize::from(len & 0x3F) << 8) | usize::from(self.buffer[cursor + 1]);
                    ensure!(
                        target < floor,
                        "compression pointer at pos {} to {} does not point backwards",
                        cursor,
                        target
                    );
                    resume.get_or_insert(cursor + 2);
                    floor = target;
                    cursor = target;
                }
                _ => bail!("unsupported label type {:#04x} at pos {}", len, cursor),
            }
        }

        self.position = resume.unwrap_or(cursor);
        DomainName::from_labels(labels)
    }

    /// Read a length-prefixed character string.
    pub fn read_character_string(&mut self) -> anyhow::Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// Read a specified number of bytes from the DNS message.
    pub fn read_bytes(&mut self, length: usize) -> anyhow::Result<&'a [u8]> {
        self.need(length, "raw bytes")?;
        let data = &self.buffer[self.position..self.position + length];
        self.position += length;
        Ok(data)
    }

    #[inline]
    /// Current reading position in the buffer.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Return the number of unread bytes remaining in the reader's buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use pfdns_dns::reader::DnsMessageReader;
    /// let buf = [0u8, 1, 2];
    /// let mut r = DnsMessageReader::new(&buf);
    /// assert_eq!(r.remaining(), 3);
    /// r.seek(1).unwrap();
    /// assert_eq!(r.remaining(), 2);
    /// ```
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

/// Trait for types that can be directly parsed from a DNS message.
pub trait DnsReadable: Sized {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self>;
}
