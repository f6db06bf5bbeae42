//! Implements the required cryptography.
//!
//! Elliptic curve arithmetic follows TR-03111, key derivation and the
//! authentication token follow TR-03110 part 3 appendix A.

pub mod codec;
mod digest;
pub mod groups;
mod kdf;
mod key_handler;
mod mac;
pub mod mod_ring;

pub use self::{
    digest::DigestAlgorithm,
    groups::{EllipticCurve, EllipticCurvePoint, FieldUint},
    kdf::{KdfPurpose, KeyDerivation, SecretKey},
    key_handler::{
        EcKeyHandler, KeyAlgorithm, KeyHandler, KeyPair, PointValidation, PrivateKey, PublicKey,
    },
    mac::{cmac_aes, AUTH_TOKEN_LENGTH},
};
use {
    anyhow::{ensure, Result},
    rand::{CryptoRng, RngCore},
    ruint::Uint,
};

pub trait CryptoCoreRng: CryptoRng + RngCore {}

impl<T> CryptoCoreRng for T where T: CryptoRng + RngCore {}

/// Parses an unsigned big-endian integer, ignoring leading zero bytes such as
/// the sign byte of a DER `INTEGER`.
pub fn parse_uint<const B: usize, const L: usize>(big_endian: &[u8]) -> Result<Uint<B, L>> {
    let trim = big_endian.iter().position(|&b| b != 0).unwrap_or(big_endian.len());
    let bytes = &big_endian[trim..];
    ensure!(bytes.len() <= Uint::<B, L>::BYTES, "Integer is too large");
    Uint::try_from_be_slice(bytes).ok_or_else(|| anyhow::anyhow!("Integer is too large"))
}

/// Strips a single leading zero byte, as found in front of keys carried in
/// an ASN.1 `BIT STRING` with explicit unused-bits octet.
pub fn remove_leading_zero(bytes: &[u8]) -> &[u8] {
    match bytes {
        [0, rest @ ..] => rest,
        _ => bytes,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex, ruint::aliases::U64};

    #[test]
    fn test_parse_uint() -> Result<()> {
        let value: U64 = parse_uint(&hex!("00 00 01 02"))?;
        assert_eq!(value, U64::from(0x0102));
        let value: U64 = parse_uint(&[])?;
        assert_eq!(value, U64::ZERO);
        assert!(parse_uint::<64, 1>(&hex!("01 00 00 00 00 00 00 00 00")).is_err());
        Ok(())
    }

    #[test]
    fn test_remove_leading_zero() {
        assert_eq!(remove_leading_zero(&hex!("00 04 01")), hex!("04 01"));
        assert_eq!(remove_leading_zero(&hex!("04 01")), hex!("04 01"));
        assert_eq!(remove_leading_zero(&[]), &[] as &[u8]);
    }
}
