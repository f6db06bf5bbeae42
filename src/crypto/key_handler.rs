//! Algorithm specific key operations behind an object safe capability.
//!
//! Protocol code only talks to [`KeyHandler`]; which algorithm sits behind
//! it is decided once by [`KeyAlgorithm::key_handler`].
use {
    super::{
        codec::{BsiTr031111Codec, Codec, EcPublicKeyObject, Icao9303Codec},
        groups::{EllipticCurve, EllipticCurvePoint, FieldUint},
        mod_ring::RingRefExt,
        parse_uint, CryptoCoreRng,
    },
    anyhow::{anyhow, ensure, Result},
    const_oid::ObjectIdentifier,
    std::{
        fmt::{self, Debug, Formatter},
        ops::Deref,
    },
    subtle::ConstantTimeEq,
};

/// Whether public keys received from the card are checked before use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointValidation {
    /// Accept any well formed encoding, reducing coordinates into the field.
    Trust,

    /// Require the curve equation (and subgroup membership for curves with
    /// a cofactor).
    #[default]
    OnCurve,
}

/// Encoded public key. For elliptic curves this is `04 || X || Y`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

/// Fixed width big-endian private scalar. Never printed.
#[derive(Clone)]
pub struct PrivateKey(Vec<u8>);

#[derive(Clone, Debug)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public:  PublicKey,
}

/// Key operations needed by the EAC sub-protocols.
pub trait KeyHandler: Send + Sync {
    /// Byte length of one field element.
    fn field_size(&self) -> usize;

    fn generate_key_pair(&self, rng: &mut dyn CryptoCoreRng) -> KeyPair;

    fn key_pair_from_private(&self, private: &[u8]) -> Result<KeyPair>;

    /// Parses an encoded public key, applying the configured validation.
    fn build_public_key(&self, encoded: &[u8]) -> Result<PublicKey>;

    fn shared_secret(&self, private: &PrivateKey, public: &PublicKey) -> Result<Vec<u8>>;

    /// `Comp()` from TR-03110-3 A.2.2.3.
    fn compress_key(&self, public: &PublicKey) -> Result<Vec<u8>>;

    /// Public key data object (`7F49`) as input to the authentication token.
    fn convert_public_key(
        &self,
        public: &PublicKey,
        oid: ObjectIdentifier,
        full_structure: bool,
    ) -> Result<Vec<u8>>;
}

/// Supported key agreement algorithms.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyAlgorithm {
    Ec(EllipticCurve<FieldUint>),
}

impl KeyAlgorithm {
    pub fn key_handler(&self) -> Box<dyn KeyHandler> {
        self.key_handler_with(PointValidation::default())
    }

    pub fn key_handler_with(&self, validation: PointValidation) -> Box<dyn KeyHandler> {
        match self {
            Self::Ec(curve) => Box::new(EcKeyHandler::new(*curve).with_validation(validation)),
        }
    }
}

/// [`KeyHandler`] over a short Weierstrass curve.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EcKeyHandler {
    curve:      EllipticCurve<FieldUint>,
    validation: PointValidation,
}

impl PublicKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for PublicKey {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0))
    }
}

impl PrivateKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PrivateKey {}

impl EcKeyHandler {
    pub const fn new(curve: EllipticCurve<FieldUint>) -> Self {
        Self {
            curve,
            validation: PointValidation::OnCurve,
        }
    }

    #[must_use]
    pub const fn with_validation(mut self, validation: PointValidation) -> Self {
        self.validation = validation;
        self
    }

    pub const fn curve(&self) -> &EllipticCurve<FieldUint> {
        &self.curve
    }

    pub const fn validation(&self) -> PointValidation {
        self.validation
    }

    fn point(&self, public: &[u8]) -> Result<EllipticCurvePoint<'_, FieldUint>> {
        self.curve
            .point_from_bytes(public, self.validation == PointValidation::OnCurve)
    }

    fn scalar(&self, private: &[u8]) -> Result<FieldUint> {
        let scalar: FieldUint = parse_uint(private)?;
        ensure!(!scalar.is_zero(), "Private key is zero");
        ensure!(scalar < self.curve.order(), "Private key out of range");
        Ok(scalar)
    }

    fn pair(&self, scalar: FieldUint) -> KeyPair {
        let d = self.curve.scalar_field().from(scalar);
        let codec = BsiTr031111Codec::default();
        KeyPair {
            private: PrivateKey(codec.to_vec(d)),
            public:  PublicKey(self.curve.point_to_bytes(self.curve.generator() * d)),
        }
    }
}

impl KeyHandler for EcKeyHandler {
    fn field_size(&self) -> usize {
        self.curve.field_size()
    }

    fn generate_key_pair(&self, rng: &mut dyn CryptoCoreRng) -> KeyPair {
        let (d, _) = self.curve.generate_key_pair(rng);
        self.pair(d.to_uint())
    }

    fn key_pair_from_private(&self, private: &[u8]) -> Result<KeyPair> {
        Ok(self.pair(self.scalar(private)?))
    }

    fn build_public_key(&self, encoded: &[u8]) -> Result<PublicKey> {
        let point = self.point(encoded)?;
        ensure!(!point.is_infinity(), "Public key is the point at infinity");
        Ok(PublicKey(self.curve.point_to_bytes(point)))
    }

    fn shared_secret(&self, private: &PrivateKey, public: &PublicKey) -> Result<Vec<u8>> {
        let d = self.scalar(&private.0)?;
        let shared = self.point(public)?.mul_uint(d);
        self.curve
            .x_to_bytes(shared)
            .map_err(|_| anyhow!("Shared secret is the point at infinity"))
    }

    fn compress_key(&self, public: &PublicKey) -> Result<Vec<u8>> {
        self.curve.x_to_bytes(self.point(public)?)
    }

    fn convert_public_key(
        &self,
        public: &PublicKey,
        oid: ObjectIdentifier,
        full_structure: bool,
    ) -> Result<Vec<u8>> {
        let point = self.point(public)?;
        ensure!(!point.is_infinity(), "Public key is the point at infinity");
        Ok(Icao9303Codec::default().to_vec(EcPublicKeyObject {
            oid,
            point,
            full_structure,
        }))
    }
}
