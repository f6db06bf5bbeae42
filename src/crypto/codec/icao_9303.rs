//! ICAO 9303-11 section 9.4 and TR-03110-3 appendix D.3
use {
    super::{BsiTr031111Codec, Codec},
    crate::crypto::{
        groups::{EllipticCurve, EllipticCurvePoint},
        mod_ring::UintMod,
    },
    anyhow::{anyhow, ensure, Result},
    bytes::{Buf, BufMut},
    const_oid::ObjectIdentifier,
    ruint::Uint,
    tracing::warn,
};

/// How to handle correctable errors when decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leniency {
    /// Correct errors
    Allow,

    /// Correct, but log a warning.
    Warn,

    /// Be strict and return an error.
    Strict,
}

/// The encodings from ICAO 9303-11 section 9.4 and TR-03110-3 appendix D.3.
#[derive(Clone, Copy, Debug)]
pub struct Icao9303Codec {
    /// Non-canonical length encoding.
    pub non_minimal_length: Leniency,

    /// Leading zeros in integers.
    pub leading_zeros: Leniency,

    /// How to handle unknown tags.
    pub unknown_tag: Leniency,
}

/// Default behaviour is to warn.
impl Default for Icao9303Codec {
    fn default() -> Self {
        Self {
            non_minimal_length: Leniency::Warn,
            leading_zeros:      Leniency::Warn,
            unknown_tag:        Leniency::Strict,
        }
    }
}

/// Length octets of a BER-TLV data object (definite form only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BerSize(pub usize);

/// Elliptic curve public key data object, tag `7F49`.
///
/// The full structure carries the domain parameters (`81`-`85`, `87`) next
/// to the public point (`86`); the reduced one only the object identifier
/// and the point.
#[derive(Clone, Copy, Debug)]
pub struct EcPublicKeyObject<'a, U: UintMod> {
    pub oid:            ObjectIdentifier,
    pub point:          EllipticCurvePoint<'a, U>,
    pub full_structure: bool,
}

pub(crate) fn lenient(leniency: Leniency, msg: &'static str) -> Result<()> {
    match leniency {
        Leniency::Strict => Err(anyhow!(msg)),
        Leniency::Warn => {
            warn!(msg);
            Ok(())
        }
        Leniency::Allow => Ok(()),
    }
}

impl Codec<BerSize> for Icao9303Codec {
    type Parent = ();

    fn encoded_size(&self, value: BerSize) -> usize {
        if value.0 < 0x80 {
            1
        } else {
            1 + (usize::BITS - value.0.leading_zeros()).div_ceil(8) as usize
        }
    }

    fn encode<B: BufMut>(&self, buffer: &mut B, value: BerSize) {
        if value.0 < 128 {
            buffer.put_u8(value.0 as u8);
        } else {
            let be = value.0.to_be_bytes();
            let trim = be.iter().position(|&b| b != 0).unwrap_or(0);
            let trimmed = &be[trim..];
            buffer.put_u8(0x80 | trimmed.len() as u8);
            buffer.put_slice(trimmed);
        }
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<BerSize> {
        ensure!(buffer.remaining() >= 1, "EOF when reading BerSize");
        let first = buffer.get_u8();
        if first < 128 {
            Ok(BerSize(first as usize))
        } else {
            const BYTES: usize = usize::BITS as usize / 8;
            let mut bytes = [0; BYTES];
            let len = (first & 0x7f) as usize;
            ensure!(len != 0, "Indefinite length not supported");
            ensure!(len != 127, "Reserved length not supported");
            ensure!(len <= BYTES, "Length too large");
            ensure!(buffer.remaining() >= len, "EOF when reading long BerSize");
            let trim = BYTES - len;
            buffer.copy_to_slice(&mut bytes[trim..]);
            if bytes[trim] == 0 || (len == 1 && bytes[trim] < 0x80) {
                lenient(self.non_minimal_length, "Length encoding is non-canonical.")?;
            }
            Ok(BerSize(usize::from_be_bytes(bytes)))
        }
    }
}

impl Codec<ObjectIdentifier> for Icao9303Codec {
    type Parent = ();

    fn encoded_size(&self, value: ObjectIdentifier) -> usize {
        value.as_bytes().len()
    }

    fn encode<B: BufMut>(&self, buffer: &mut B, value: ObjectIdentifier) {
        buffer.put_slice(value.as_bytes());
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<ObjectIdentifier> {
        let bytes = buffer.copy_to_bytes(buffer.remaining());
        let oid = ObjectIdentifier::from_bytes(bytes.as_ref()).map_err(|e| anyhow!(e))?;
        Ok(oid)
    }
}

/// ICAO 9303-11 section 9.4.1 Data Object Encoding
///
/// An unsigned integer SHALL be converted to an octet string using the binary
/// representation of the integer in big-endian format. The minimum number of
/// octets SHALL be used, i.e. leading octets of value 0x00 MUST NOT be used.
impl<const BITS: usize, const LIMBS: usize> Codec<Uint<BITS, LIMBS>> for Icao9303Codec {
    type Parent = ();

    fn encoded_size(&self, value: Uint<BITS, LIMBS>) -> usize {
        value.byte_len()
    }

    fn encode<B: BufMut>(&self, buffer: &mut B, value: Uint<BITS, LIMBS>) {
        buffer.put_slice(&value.to_be_bytes_trimmed_vec());
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<Uint<BITS, LIMBS>> {
        let bytes = buffer.copy_to_bytes(buffer.remaining());
        let trim = bytes.iter().position(|&b| b != 0).unwrap_or(0);
        if trim > 0 {
            lenient(self.leading_zeros, "Leading zeros in integer.")?;
        }
        let bytes = &bytes[trim..];
        Uint::try_from_be_slice(bytes).ok_or_else(|| anyhow!("Value to large for target Uint"))
    }
}

/// ICAO 9303-11 section 9.4.1 Data Object Encoding
///
/// To encode elliptic curve points, uncompressed encoding according to
/// [TR-03111] SHALL be used.
impl<'a, const BITS: usize, const LIMBS: usize> Codec<EllipticCurvePoint<'a, Uint<BITS, LIMBS>>>
    for Icao9303Codec
{
    type Parent = &'a EllipticCurve<Uint<BITS, LIMBS>>;

    fn encoded_size(&self, value: EllipticCurvePoint<'a, Uint<BITS, LIMBS>>) -> usize {
        BsiTr031111Codec::default().encoded_size(value)
    }

    fn encode<B: BufMut>(&self, buffer: &mut B, value: EllipticCurvePoint<'a, Uint<BITS, LIMBS>>) {
        BsiTr031111Codec::default().encode(buffer, value);
    }

    fn decode<B: Buf>(
        &self,
        buffer: &mut B,
        parent: Self::Parent,
    ) -> Result<EllipticCurvePoint<'a, Uint<BITS, LIMBS>>> {
        BsiTr031111Codec::default().decode(buffer, parent)
    }
}

macro_rules! ber_encoder {
    ($buffer:expr, $codec:expr; $($tag:literal $value:expr)+) => {
        // Data must be written in specifc tag order.
        $(
            $buffer.put_u8($tag);
            $codec.encode($buffer, BerSize($codec.encoded_size($value)));
            $codec.encode($buffer, $value);
        )+
    };
}

/// TR-03110-3 D.3.3 Elliptic Curve Public Keys
impl<'a, const BITS: usize, const LIMBS: usize> Codec<EcPublicKeyObject<'a, Uint<BITS, LIMBS>>>
    for Icao9303Codec
{
    type Parent = &'a EllipticCurve<Uint<BITS, LIMBS>>;

    fn encode<B: BufMut>(&self, buffer: &mut B, value: EcPublicKeyObject<'a, Uint<BITS, LIMBS>>) {
        let curve = value.point.curve();
        let mut body = Vec::new();
        if value.full_structure {
            ber_encoder!(&mut body, self;
                0x06 value.oid
                0x81 curve.modulus()
                0x82 curve.a().to_uint()
                0x83 curve.b().to_uint()
                0x84 curve.generator()
                0x85 curve.order()
                0x86 value.point
                0x87 curve.cofactor()
            );
        } else {
            ber_encoder!(&mut body, self;
                0x06 value.oid
                0x86 value.point
            );
        }
        buffer.put_u16(0x7f49);
        self.encode(buffer, BerSize(body.len()));
        buffer.put_slice(&body);
    }

    fn decode<B: Buf>(
        &self,
        buffer: &mut B,
        parent: Self::Parent,
    ) -> Result<EcPublicKeyObject<'a, Uint<BITS, LIMBS>>> {
        ensure!(buffer.remaining() >= 2, "EOF when reading tag");
        ensure!(buffer.get_u16() == 0x7f49, "Not a public key data object");
        let len: BerSize = self.decode(buffer, ())?;
        ensure!(buffer.remaining() >= len.0, "Length too large");
        let mut body = buffer.copy_to_bytes(len.0);

        let mut oid: Option<ObjectIdentifier> = None;
        let mut point: Option<EllipticCurvePoint<'a, Uint<BITS, LIMBS>>> = None;
        let mut full_structure = false;
        while body.has_remaining() {
            let tag = body.get_u8();
            let len: BerSize = self.decode(&mut body, ())?;
            ensure!(body.remaining() >= len.0, "Length too large");
            let mut value = body.copy_to_bytes(len.0);
            match tag {
                0x06 => oid = Some(self.decode(&mut value, ())?),
                0x81 => {
                    let modulus: Uint<BITS, LIMBS> = self.decode(&mut value, ())?;
                    ensure!(modulus == parent.modulus(), "Domain parameters do not match");
                    full_structure = true;
                }
                0x82..=0x85 | 0x87 => full_structure = true,
                0x86 => point = Some(self.decode(&mut value, parent)?),
                _ => lenient(self.unknown_tag, "Unknown tag")?,
            }
        }
        Ok(EcPublicKeyObject {
            oid: oid.ok_or_else(|| anyhow!("oid missing"))?,
            point: point.ok_or_else(|| anyhow!("point missing"))?,
            full_structure,
        })
    }
}
