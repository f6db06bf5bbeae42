//! Implements the encodings from BSI TR-03111 section 3.
use {
    super::{BufCodec, Codec},
    crate::crypto::{
        groups::{EllipticCurve, EllipticCurvePoint},
        mod_ring::{ModRingElement, RingRef, RingRefExt},
    },
    anyhow::{anyhow, bail, ensure, Result},
    bytes::{Buf, BufMut},
    ruint::Uint,
};

/// The encodings from BSI TR-03111
#[derive(Clone, Copy, Debug)]
pub struct BsiTr031111Codec {
    /// Byte length for uints (defaults to Uint::BYTES).
    pub uint_bytes: Option<usize>,

    /// Whether decoded points must satisfy the curve equation. Without it
    /// coordinates are only reduced into the field.
    pub validate_points: bool,
}

impl Default for BsiTr031111Codec {
    fn default() -> Self {
        Self {
            uint_bytes:      None,
            validate_points: true,
        }
    }
}

/// BSI TR-03111 3.1.2: Conversion between Integers and Octet Strings
impl<const BITS: usize, const LIMBS: usize> Codec<Uint<BITS, LIMBS>> for BsiTr031111Codec {
    type Parent = ();

    fn encode<B: BufMut>(&self, buffer: &mut B, value: Uint<BITS, LIMBS>) {
        let size = self.uint_bytes.unwrap_or(Uint::<BITS, LIMBS>::BYTES);
        assert!(value.byte_len() <= size, "Invalid byte length for uint");
        let bytes = value.to_be_bytes_vec();
        if size > bytes.len() {
            buffer.put_slice(&vec![0; size - bytes.len()]);
        }
        let trim = bytes.len().saturating_sub(size);
        buffer.put_slice(&bytes[trim..]);
    }

    fn decode<B: Buf>(&self, buffer: &mut B, _parent: Self::Parent) -> Result<Uint<BITS, LIMBS>> {
        let size = self.uint_bytes.unwrap_or(Uint::<BITS, LIMBS>::BYTES);
        ensure!(buffer.remaining() >= size, "Insufficient bytes remaining");
        let bytes = buffer.copy_to_bytes(size);
        let trim = bytes.len().saturating_sub(Uint::<BITS, LIMBS>::BYTES);
        ensure!(bytes[..trim].iter().all(|b| *b == 0), "Value to large for target Uint");
        Uint::try_from_be_slice(&bytes[trim..])
            .ok_or_else(|| anyhow!("Value to large for target Uint"))
    }
}

/// BSI TR-03111 3.1.3: Conversion between Field Elements and Octet Strings
impl<R, const BITS: usize, const LIMBS: usize> Codec<ModRingElement<R>> for BsiTr031111Codec
where
    R: RingRef<Uint = Uint<BITS, LIMBS>>,
{
    type Parent = R;

    fn encode<B: BufMut>(&self, buffer: &mut B, value: ModRingElement<R>) {
        let codec = Self {
            uint_bytes: Some(value.ring().byte_len()),
            ..*self
        };
        codec.encode(buffer, value.to_uint());
    }

    fn decode<B: Buf>(&self, buffer: &mut B, parent: Self::Parent) -> Result<ModRingElement<R>> {
        let codec = Self {
            uint_bytes: Some(parent.byte_len()),
            ..*self
        };
        let uint: Uint<BITS, LIMBS> = codec.decode(buffer, ())?;
        if self.validate_points {
            ensure!(uint < parent.modulus(), "Field element not reduced");
        }
        Ok(parent.from(uint))
    }
}

/// BSI TR-03111 3.2: Encoding Elliptic Curve Points
///
/// Points are always written uncompressed. The point at infinity is the
/// single byte `00`.
impl<'a, const BITS: usize, const LIMBS: usize> Codec<EllipticCurvePoint<'a, Uint<BITS, LIMBS>>>
    for BsiTr031111Codec
{
    type Parent = &'a EllipticCurve<Uint<BITS, LIMBS>>;

    fn encode<B: BufMut>(&self, buffer: &mut B, value: EllipticCurvePoint<'a, Uint<BITS, LIMBS>>) {
        match value.coordinates() {
            None => buffer.put_u8(0),
            Some((x, y)) => {
                buffer.put_u8(4);
                self.encode(buffer, x);
                self.encode(buffer, y);
            }
        }
    }

    fn decode<B: Buf>(
        &self,
        buffer: &mut B,
        parent: Self::Parent,
    ) -> Result<EllipticCurvePoint<'a, Uint<BITS, LIMBS>>> {
        ensure!(buffer.has_remaining(), "Empty point encoding");
        match buffer.get_u8() {
            0 => Ok(parent.infinity()),
            2 | 3 => bail!("Compressed points are not supported"),
            4 => {
                let x = buffer.get_codec_parent(self, parent.base_field())?;
                let y = buffer.get_codec_parent(self, parent.base_field())?;
                if self.validate_points {
                    parent.from_affine(x, y)
                } else {
                    parent.from_affine_unchecked(x, y)
                }
            }
            _ => Err(anyhow!("Invalid byte for elliptic curve point")),
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> EllipticCurve<Uint<BITS, LIMBS>> {
    /// Uncompressed encoding `04 || X || Y` with both coordinates padded to
    /// [`EllipticCurve::field_size`] bytes.
    pub fn point_to_bytes(&self, point: EllipticCurvePoint<'_, Uint<BITS, LIMBS>>) -> Vec<u8> {
        BsiTr031111Codec::default().to_vec(point)
    }

    /// Inverse of [`EllipticCurve::point_to_bytes`]. The input must be
    /// exactly `2 * field_size + 1` bytes.
    pub fn point_from_bytes(
        &self,
        bytes: &[u8],
        validate: bool,
    ) -> Result<EllipticCurvePoint<'_, Uint<BITS, LIMBS>>> {
        ensure!(
            bytes.len() == 2 * self.field_size() + 1,
            "Point encoding has length {}, expected {}",
            bytes.len(),
            2 * self.field_size() + 1
        );
        let codec = BsiTr031111Codec {
            validate_points: validate,
            ..Default::default()
        };
        let mut buffer = bytes;
        buffer.get_codec_exact(&codec, self)
    }

    /// Affine X coordinate padded to [`EllipticCurve::field_size`] bytes.
    pub fn x_to_bytes(&self, point: EllipticCurvePoint<'_, Uint<BITS, LIMBS>>) -> Result<Vec<u8>> {
        let x = point
            .x()
            .ok_or_else(|| anyhow!("Point at infinity has no x coordinate"))?;
        Ok(BsiTr031111Codec::default().to_vec(x))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::crypto::{
            groups::named::{brainpool_p256r1, secp256r1},
            groups::CryptoGroup,
        },
        hex_literal::hex,
    };

    // Example from BSI Worked Example for Extended Access Control (EAC) section 3.3
    #[test]
    fn test_codec() -> Result<()> {
        let codec = BsiTr031111Codec::default();
        let curve = brainpool_p256r1()?;
        let sk_pcd = hex!(
            "75 22 87 F5 B0 2D E3 C4 BC 3E 17 94 51 18 C5 1B 23 C9 72 78 E4 CD 74 80 48 AC 56 BA \
             5B DC 3D 46"
        );
        let pk_pcd = hex!(
            "04 3D D2 9B BE 59 07 FD 21 A1 52 AD A4 89 5F AA E7 AC C5 5F 5E 50 EF BF DE 5A B0 C6 \
             EB 54 F1 98 D6 15 91 36 35 F0 FD F5 BE B3 83 E0 03 55 F8 2D 3C 41 ED 0D F2 E2 83 63 \
             43 3D FB 73 85 6A 15 DC 9F"
        );
        let sk_pcd: ModRingElement<_> = sk_pcd
            .as_ref()
            .get_codec_parent(&codec, curve.scalar_field())?;
        let pk: EllipticCurvePoint<_> = pk_pcd.as_ref().get_codec_parent(&codec, &curve)?;
        assert_eq!(curve.generator() * sk_pcd, pk);
        assert_eq!(curve.point_to_bytes(pk), pk_pcd);
        Ok(())
    }

    #[test]
    fn test_point_round_trip_padding() -> Result<()> {
        let curve = secp256r1()?;
        let rng = &mut rand::thread_rng();
        let mut point = curve.generator() * curve.random_scalar(rng);
        let mut seen_padding = false;
        // About one in 128 points has a coordinate with a leading zero byte.
        for _ in 0..4096 {
            let bytes = curve.point_to_bytes(point);
            assert_eq!(bytes.len(), 65);
            assert_eq!(curve.point_from_bytes(&bytes, true)?, point);
            if bytes[1] == 0 || bytes[33] == 0 {
                seen_padding = true;
                break;
            }
            point += curve.generator();
        }
        assert!(seen_padding);
        Ok(())
    }

    #[test]
    fn test_leading_zero_coordinate() -> Result<()> {
        // Off-curve, so only accepted without validation.
        let curve = brainpool_p256r1()?;
        let field = curve.base_field();
        let x = field.from(ruint::uint!(0x1234_U576));
        let point = curve.from_affine_unchecked(x, field.one())?;
        let bytes = curve.point_to_bytes(point);
        assert_eq!(bytes.len(), 65);
        assert_eq!(&bytes[1..31], &[0; 30]);
        assert_eq!(&bytes[31..33], &hex!("12 34"));
        let decoded = curve.point_from_bytes(&bytes, false)?;
        assert_eq!(decoded.x(), Some(x));
        assert!(curve.point_from_bytes(&bytes, true).is_err());
        Ok(())
    }

    #[test]
    fn test_point_length() -> Result<()> {
        let curve = secp256r1()?;
        let bytes = curve.point_to_bytes(curve.generator());
        assert!(curve.point_from_bytes(&bytes[..64], true).is_err());
        assert!(curve.point_from_bytes(&[bytes.as_slice(), &[0]].concat(), true).is_err());
        let mut compressed = bytes.clone();
        compressed[0] = 2;
        assert!(curve.point_from_bytes(&compressed, true).is_err());
        assert_eq!(
            curve.x_to_bytes(curve.generator())?,
            hex!("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296")
        );
        assert!(curve.x_to_bytes(curve.infinity()).is_err());
        Ok(())
    }
}
