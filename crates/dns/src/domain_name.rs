use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use anyhow::{bail, ensure};
use idna::AsciiDenyList;

/// Longest single label on the wire.
const MAX_LABEL_LEN: usize = 63;

/// Longest name on the wire, length octets and the root terminator included.
const MAX_WIRE_LEN: usize = 255;

/// Label bytes that are printable but need a backslash in presentation form.
const SPECIAL: &[u8] = b".\\\"();@$";

/// A domain name, held both as its wire labels and as escaped presentation text.
///
/// Labels are arbitrary bytes: a literal `.` inside a label is shown as `\.` and bytes outside printable
/// ASCII as `\DDD`, so decoding and re-encoding a name never changes it. The spelling the client used is
/// preserved, comparisons and hashing are ASCII case-insensitive. The trailing root dot is not shown.
#[derive(Clone)]
pub struct DomainName(Arc<Repr>);

#[derive(Debug)]
struct Repr {
    text: String,
    /// Uncompressed wire form, ending with the zero-length root label.
    wire: Box<[u8]>,
}

impl DomainName {
    /// The root domain (`.`).
    pub fn root() -> Self {
        Self(Arc::new(Repr {
            text: ".".to_string(),
            wire: Box::new([0]),
        }))
    }

    /// Build a name from raw wire labels, most specific first. No labels means the root.
    pub fn from_labels<L: AsRef<[u8]>>(labels: impl IntoIterator<Item = L>) -> anyhow::Result<Self> {
        let mut text = String::new();
        let mut wire = Vec::new();

        for label in labels {
            let label = label.as_ref();
            ensure!(!label.is_empty(), "empty domain label after '{}'", text);
            ensure!(
                label.len() <= MAX_LABEL_LEN,
                "domain label longer than {} bytes after '{}'",
                MAX_LABEL_LEN,
                text
            );

            if !wire.is_empty() {
                text.push('.');
            }
            escape_label(label, &mut text);

            wire.push(label.len() as u8);
            wire.extend_from_slice(label);
            ensure!(wire.len() < MAX_WIRE_LEN, "domain name too long: {}", text);
        }

        if wire.is_empty() {
            return Ok(Self::root());
        }

        wire.push(0);
        Ok(Self(Arc::new(Repr {
            text,
            wire: wire.into_boxed_slice(),
        })))
    }

    /// Parse a name in ASCII presentation form, where `\.`, `\\` and `\DDD` escapes stand for raw label bytes.
    /// Lengths are validated according to RFC 1035.
    ///
    /// NOTE: This function does not support Unicode domain names and should only be called with ASCII input.
    pub fn from_ascii(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();

        if input == "." || input.is_empty() {
            return Ok(Self::root());
        }

        ensure!(input.is_ascii(), "domain name is not ASCII: {}", input);

        let mut labels = Vec::new();
        let mut current = Vec::new();
        let mut bytes = input.bytes();
        while let Some(b) = bytes.next() {
            match b {
                b'.' => labels.push(std::mem::take(&mut current)),
                b'\\' => current.push(unescape(&mut bytes, input)?),
                _ => current.push(b),
            }
        }

        // an unescaped trailing dot only marks the name as fully qualified
        if !current.is_empty() {
            labels.push(current);
        }

        Self::from_labels(&labels)
    }

    /// Create a new DomainName from a user input string.
    /// This function supports Unicode domain names and performs IDNA conversion.
    pub fn from_user(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();

        if input == "." {
            return Ok(Self::root());
        }

        let name = input.strip_suffix('.').unwrap_or(input);

        // IDNA to ASCII
        let ascii = idna::domain_to_ascii_cow(name.as_bytes(), AsciiDenyList::URL)
            .map_err(|_| anyhow::anyhow!("invalid IDNA domain: {}", input))?;

        Self::from_ascii(&ascii)
    }

    /// Whether this is the root domain.
    pub fn is_root(&self) -> bool {
        self.0.wire.len() == 1
    }

    /// Presentation form without the trailing dot.
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Fully qualified representation, always dot-terminated.
    pub fn to_fqdn(&self) -> String {
        if self.is_root() {
            return ".".to_string();
        }
        format!("{}.", self.0.text)
    }

    /// Uncompressed wire form, root label included.
    pub fn wire(&self) -> &[u8] {
        &self.0.wire
    }

    /// Raw label bytes, most specific first.
    pub fn labels(&self) -> Labels<'_> {
        Labels { rest: &self.0.wire }
    }
}

/// Iterator over the labels of a [`DomainName`].
pub struct Labels<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, tail) = self.rest.split_first()?;
        if len == 0 {
            return None;
        }
        let (label, rest) = tail.split_at(len as usize);
        self.rest = rest;
        Some(label)
    }
}

fn escape_label(label: &[u8], out: &mut String) {
    for &b in label {
        if SPECIAL.contains(&b) {
            out.push('\\');
            out.push(b as char);
        } else if b.is_ascii_graphic() {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:03}", b));
        }
    }
}

/// Decode the escape following a backslash: either `\DDD` or a single literal character.
fn unescape(bytes: &mut std::str::Bytes<'_>, input: &str) -> anyhow::Result<u8> {
    let Some(first) = bytes.next() else {
        bail!("dangling escape at end of domain name: {}", input);
    };
    if !first.is_ascii_digit() {
        return Ok(first);
    }

    let mut value = u16::from(first - b'0');
    for _ in 0..2 {
        match bytes.next() {
            Some(d) if d.is_ascii_digit() => value = value * 10 + u16::from(d - b'0'),
            _ => bail!("escape needs three decimal digits in: {}", input),
        }
    }
    u8::try_from(value).map_err(|_| anyhow::anyhow!("escaped value {} out of range in: {}", value, input))
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.wire.eq_ignore_ascii_case(&other.0.wire)
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.wire.iter() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl Deref for DomainName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0.text
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.text)
    }
}

impl std::fmt::Debug for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DomainName").field(&self.0.text).finish()
    }
}
