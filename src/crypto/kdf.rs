//! TR-03110 part 3 appendix A.2.3 key derivation.
use {
    super::DigestAlgorithm,
    anyhow::{bail, ensure, Result},
    num_enum::{IntoPrimitive, TryFromPrimitive},
    std::fmt::{self, Debug, Formatter},
    subtle::ConstantTimeEq,
};

/// The 32-bit counter `c` appended to the shared secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum KdfPurpose {
    Enc = 1,
    Mac = 2,
    Pin = 3,
}

/// AES key derivation `KDF(K, [r,] c) = H(K || r || c)` truncated to the key
/// length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDerivation {
    key_bits: usize,
    digest:   DigestAlgorithm,
}

/// Derived AES key, only alive for one protocol run.
#[derive(Clone)]
pub struct SecretKey {
    bits:  usize,
    bytes: Vec<u8>,
}

impl KeyDerivation {
    /// SHA-1 for AES-128, SHA-256 for AES-192 and AES-256.
    pub fn new(key_bits: usize) -> Result<Self> {
        let digest = match key_bits {
            128 => DigestAlgorithm::Sha1,
            192 | 256 => DigestAlgorithm::Sha256,
            _ => bail!("Unsupported AES key length {key_bits}"),
        };
        Ok(Self { key_bits, digest })
    }

    pub const fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn derive(
        &self,
        purpose: KdfPurpose,
        secret: &[u8],
        nonce: Option<&[u8]>,
    ) -> Result<SecretKey> {
        ensure!(!secret.is_empty(), "Empty shared secret");
        let counter = u32::from(purpose).to_be_bytes();
        let hash = self
            .digest
            .digest(&[secret, nonce.unwrap_or_default(), &counter]);
        Ok(SecretKey {
            bits:  self.key_bits,
            bytes: hash[..self.key_bits / 8].to_vec(),
        })
    }

    pub fn derive_enc(&self, secret: &[u8], nonce: Option<&[u8]>) -> Result<SecretKey> {
        self.derive(KdfPurpose::Enc, secret, nonce)
    }

    pub fn derive_mac(&self, secret: &[u8], nonce: Option<&[u8]>) -> Result<SecretKey> {
        self.derive(KdfPurpose::Mac, secret, nonce)
    }

    /// Key from a CAN, PIN or PUK.
    pub fn derive_pin(&self, password: &[u8]) -> Result<SecretKey> {
        self.derive(KdfPurpose::Pin, password, None)
    }
}

impl SecretKey {
    pub const fn bits(&self) -> usize {
        self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SecretKey(AES-{}, <redacted>)", self.bits)
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for SecretKey {}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    const SECRET: [u8; 32] =
        hex!("28768D20701247DAE81804C9E780EDE582A9996DB4A315020B2733197DB84925");

    #[test]
    fn test_unsupported_length() {
        assert!(KeyDerivation::new(112).is_err());
        assert!(KeyDerivation::new(0).is_err());
        assert!(KeyDerivation::new(129).is_err());
    }

    #[test]
    fn test_digest_selection() -> Result<()> {
        let kdf = KeyDerivation::new(128)?;
        let key = kdf.derive_enc(&SECRET, None)?;
        let expected = DigestAlgorithm::Sha1.digest(&[&SECRET, &hex!("00000001")]);
        assert_eq!(key.as_bytes(), &expected[..16]);

        let kdf = KeyDerivation::new(192)?;
        let key = kdf.derive_mac(&SECRET, Some(b"nonce"))?;
        let expected = DigestAlgorithm::Sha256.digest(&[&SECRET, b"nonce", &hex!("00000002")]);
        assert_eq!(key.as_bytes(), &expected[..24]);

        let kdf = KeyDerivation::new(256)?;
        assert_eq!(kdf.derive_pin(b"123456")?.as_bytes().len(), 32);
        Ok(())
    }

    #[test]
    fn test_purposes_differ() -> Result<()> {
        for bits in [128, 192, 256] {
            let kdf = KeyDerivation::new(bits)?;
            let nonce = Some(&b"0123456789abcdef"[..]);
            let enc = kdf.derive(KdfPurpose::Enc, &SECRET, nonce)?;
            let mac = kdf.derive(KdfPurpose::Mac, &SECRET, nonce)?;
            let pin = kdf.derive(KdfPurpose::Pin, &SECRET, nonce)?;
            assert_ne!(enc, mac);
            assert_ne!(mac, pin);
            assert_ne!(enc, pin);
            assert_eq!(enc, kdf.derive(KdfPurpose::Enc, &SECRET, nonce)?);
            assert_eq!(enc.bits(), bits);
        }
        Ok(())
    }

    #[test]
    fn test_empty_secret() -> Result<()> {
        let kdf = KeyDerivation::new(128)?;
        assert!(kdf.derive_enc(&[], None).is_err());
        Ok(())
    }

    #[test]
    fn test_redacted_debug() -> Result<()> {
        let key = KeyDerivation::new(128)?.derive_enc(&SECRET, None)?;
        assert_eq!(format!("{key:?}"), "SecretKey(AES-128, <redacted>)");
        Ok(())
    }

    #[test]
    fn test_purpose_counter() {
        assert_eq!(u32::from(KdfPurpose::Pin), 3);
        assert!(matches!(KdfPurpose::try_from(2_u32), Ok(KdfPurpose::Mac)));
        assert!(KdfPurpose::try_from(4_u32).is_err());
    }
}
