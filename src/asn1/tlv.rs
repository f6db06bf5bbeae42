//! BER-TLV data objects as used in command and response data fields,
//! ISO/IEC 7816-4 section 5.2.
//!
//! Only the definite length form is supported. Lengths are parsed with the
//! [`Icao9303Codec`] rules, so non-minimal length encodings follow its
//! [`Leniency`] setting.
use {
    crate::crypto::codec::{BerSize, BufMutCodec, Codec, Icao9303Codec, Leniency},
    anyhow::{anyhow, ensure, Result},
    bytes::{Buf, BufMut},
    std::fmt::{self, Debug, Formatter},
};

/// Nesting limit for constructed objects.
const MAX_DEPTH: usize = 16;

/// A BER tag of one to four bytes, stored big-endian.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(u32);

/// A decoded data object. Constructed tags hold their children.
#[derive(Clone, PartialEq, Eq)]
pub struct Tlv {
    tag:   Tag,
    value: TlvValue,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TlvValue {
    Primitive(Vec<u8>),
    Constructed(Vec<Tlv>),
}

/// Decoding options for [`Tlv`].
#[derive(Clone, Copy, Debug)]
pub struct TlvCodec {
    pub non_minimal_length: Leniency,
}

impl Default for TlvCodec {
    fn default() -> Self {
        Self {
            non_minimal_length: Leniency::Warn,
        }
    }
}

impl Tag {
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes();
        let skip = bytes.iter().take(3).take_while(|&&b| b == 0).count();
        bytes[skip..].to_vec()
    }

    fn first_byte(self) -> u8 {
        self.to_bytes()[0]
    }

    /// Bit 6 of the first byte.
    pub fn is_constructed(self) -> bool {
        self.first_byte() & 0x20 != 0
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", hex::encode_upper(self.to_bytes()))
    }
}

impl Tlv {
    /// Data object holding raw content bytes, whatever the tag.
    pub fn new(tag: impl Into<Tag>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag:   tag.into(),
            value: TlvValue::Primitive(value.into()),
        }
    }

    pub fn constructed(tag: impl Into<Tag>, children: Vec<Self>) -> Self {
        Self {
            tag:   tag.into(),
            value: TlvValue::Constructed(children),
        }
    }

    pub const fn tag(&self) -> Tag {
        self.tag
    }

    pub const fn value(&self) -> &TlvValue {
        &self.value
    }

    /// Content bytes, re-encoding children of constructed objects.
    pub fn value_bytes(&self) -> Vec<u8> {
        match &self.value {
            TlvValue::Primitive(bytes) => bytes.clone(),
            TlvValue::Constructed(children) => {
                let mut buffer = Vec::new();
                for child in children {
                    child.write(&mut buffer);
                }
                buffer
            }
        }
    }

    /// Direct children, empty for primitive objects.
    pub fn all_children(&self) -> &[Self] {
        match &self.value {
            TlvValue::Primitive(_) => &[],
            TlvValue::Constructed(children) => children,
        }
    }

    pub fn children(&self, tag: impl Into<Tag>) -> impl Iterator<Item = &Self> {
        let tag = tag.into();
        self.all_children().iter().filter(move |c| c.tag == tag)
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: impl Into<Tag>) -> Option<&Self> {
        self.children(tag).next()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.write(&mut buffer);
        buffer
    }

    fn write<B: BufMut>(&self, buffer: &mut B) {
        let value = self.value_bytes();
        buffer.put_slice(&self.tag.to_bytes());
        buffer.put_codec(&Icao9303Codec::default(), BerSize(value.len()));
        buffer.put_slice(&value);
    }
}

impl Debug for Tlv {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            TlvValue::Primitive(bytes) => {
                write!(f, "{:?} {}", self.tag, hex::encode_upper(bytes))
            }
            TlvValue::Constructed(children) => {
                f.debug_map().entry(&self.tag, children).finish()
            }
        }
    }
}

/// Encodes `tag || length || value`.
pub fn make_tag(tag: impl Into<Tag>, value: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(value.len() + 6);
    buffer.put_slice(&tag.into().to_bytes());
    buffer.put_codec(&Icao9303Codec::default(), BerSize(value.len()));
    buffer.put_slice(value);
    buffer
}

impl TlvCodec {
    /// Parses exactly one data object spanning all of `bytes`.
    pub fn parse(&self, bytes: &[u8]) -> Result<Tlv> {
        let mut buffer = bytes;
        let tlv = self.decode_nested(&mut buffer, 0)?;
        ensure!(
            !buffer.has_remaining(),
            "{} trailing bytes after data object",
            buffer.remaining()
        );
        Ok(tlv)
    }

    /// Parses a concatenation of data objects.
    pub fn parse_all(&self, bytes: &[u8]) -> Result<Vec<Tlv>> {
        let mut buffer = bytes;
        self.decode_sequence(&mut buffer, 0)
    }

    fn length_codec(&self) -> Icao9303Codec {
        Icao9303Codec {
            non_minimal_length: self.non_minimal_length,
            ..Icao9303Codec::default()
        }
    }

    fn decode_sequence<B: Buf>(&self, buffer: &mut B, depth: usize) -> Result<Vec<Tlv>> {
        let mut result = Vec::new();
        while buffer.has_remaining() {
            result.push(self.decode_nested(buffer, depth)?);
        }
        Ok(result)
    }

    fn decode_nested<B: Buf>(&self, buffer: &mut B, depth: usize) -> Result<Tlv> {
        ensure!(depth < MAX_DEPTH, "Data objects nested too deeply");
        let tag: Tag = self.decode(buffer, ())?;
        let size: BerSize = self.length_codec().decode(buffer, ())?;
        let len = size.0;
        ensure!(
            buffer.remaining() >= len,
            "Length {len} of {tag:?} exceeds remaining {} bytes",
            buffer.remaining()
        );
        let mut content = buffer.copy_to_bytes(len);
        let value = if tag.is_constructed() {
            TlvValue::Constructed(self.decode_sequence(&mut content, depth + 1)?)
        } else {
            TlvValue::Primitive(content.to_vec())
        };
        Ok(Tlv { tag, value })
    }
}

impl Codec<Tag> for TlvCodec {
    type Parent = ();

    fn encode<B: BufMut>(&self, buffer: &mut B, value: Tag) {
        buffer.put_slice(&value.to_bytes());
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<Tag> {
        ensure!(buffer.has_remaining(), "EOF when reading tag");
        let first = buffer.get_u8();
        let mut tag = u32::from(first);
        if first & 0x1f == 0x1f {
            loop {
                ensure!(buffer.has_remaining(), "EOF in multi-byte tag");
                ensure!(tag <= 0x00ff_ffff, "Tag longer than four bytes");
                let next = buffer.get_u8();
                tag = (tag << 8) | u32::from(next);
                if next & 0x80 == 0 {
                    break;
                }
            }
        }
        Ok(Tag(tag))
    }
}

impl Codec<Tlv> for TlvCodec {
    type Parent = ();

    fn encode<B: BufMut>(&self, buffer: &mut B, value: Tlv) {
        value.write(buffer);
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<Tlv> {
        self.decode_nested(buffer, 0)
    }
}

impl TlvValue {
    pub fn as_primitive(&self) -> Result<&[u8]> {
        match self {
            Self::Primitive(bytes) => Ok(bytes),
            Self::Constructed(_) => Err(anyhow!("Expected primitive data object")),
        }
    }
}
