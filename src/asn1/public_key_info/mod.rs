//! Algorithm identifiers, subject public keys and elliptic curve domain
//! parameters (TR-03110-3 appendix A.1.2, TR-03111 section 5.1).

use {
    super::oid::{ID_EC_PUBLIC_KEY, ID_PK_ECDH, ID_PK_PS_ECDH_ECSCHNORR, ID_PRIME_FIELD,
        STANDARDIZED_DOMAIN_PARAMETERS},
    crate::crypto::{
        groups::named::{self, standardized},
        parse_uint, EllipticCurve, FieldUint,
    },
    anyhow::{anyhow, bail, ensure, Result},
    der::{
        asn1::{BitString, Null, ObjectIdentifier as Oid, OctetString, Uint as DerUint},
        Any, Choice, Decode, Encode, Sequence, ValueOrd,
    },
};

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct AlgorithmIdentifier {
    pub algorithm:  Oid,
    pub parameters: Option<Any>,
}

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct SubjectPublicKeyInfo {
    pub algorithm:          AlgorithmIdentifier,
    pub subject_public_key: BitString,
}

/// Elliptic Curve Algorithm Parameters.
///
/// **Note**: This deviates from RFC 5480 by allowing for explicit
/// parameters using `EcParameters` in addition to named curves, as
/// required by TR-03110.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Choice, ValueOrd)]
pub enum EcAlgoParameters {
    EcParameters(EcParameters),
    NamedCurve(Oid),
    ImplicitlyCa(Null),
}

/// Explicit domain parameters, TR-03111 section 5.1.1.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct EcParameters {
    pub version:  u64,
    pub field_id: FieldId,
    pub curve:    Curve,
    pub base:     OctetString,
    pub order:    DerUint,
    pub cofactor: Option<DerUint>,
}

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct FieldId {
    pub field_type: Oid,
    pub parameters: Any,
}

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct Curve {
    pub a:    OctetString,
    pub b:    OctetString,
    pub seed: Option<BitString>,
}

const NAMED_CURVES: [(Oid, fn() -> Result<EllipticCurve<FieldUint>>); 6] = [
    (Oid::new_unwrap("1.2.840.10045.3.1.1"), named::secp192r1),
    (Oid::new_unwrap("1.3.132.0.33"), named::secp224r1),
    (Oid::new_unwrap("1.2.840.10045.3.1.7"), named::secp256r1),
    (Oid::new_unwrap("1.3.36.3.3.2.8.1.1.7"), named::brainpool_p256r1),
    (Oid::new_unwrap("1.3.36.3.3.2.8.1.1.11"), named::brainpool_p384r1),
    (Oid::new_unwrap("1.3.36.3.3.2.8.1.1.13"), named::brainpool_p512r1),
];

impl AlgorithmIdentifier {
    /// `standardizedDomainParameters` with the given parameter ID.
    pub fn standardized(id: u64) -> der::Result<Self> {
        Ok(Self {
            algorithm:  STANDARDIZED_DOMAIN_PARAMETERS,
            parameters: Some(Any::encode_from(&id)?),
        })
    }

    /// `id-ecPublicKey` with explicit domain parameters.
    pub fn explicit(curve: &EllipticCurve<FieldUint>) -> der::Result<Self> {
        Ok(Self {
            algorithm:  ID_EC_PUBLIC_KEY,
            parameters: Some(Any::encode_from(&EcParameters::from_curve(curve)?)?),
        })
    }

    /// Resolves elliptic curve domain parameters.
    ///
    /// Accepts `standardizedDomainParameters`, `id-ecPublicKey` and the
    /// `id-PK-*` key types that wrap either of those.
    pub fn domain_parameters(&self) -> Result<EllipticCurve<FieldUint>> {
        let parameters = self
            .parameters
            .as_ref()
            .ok_or_else(|| anyhow!("Algorithm identifier without domain parameters"))?;
        match self.algorithm {
            STANDARDIZED_DOMAIN_PARAMETERS => standardized(parameters.decode_as::<u64>()?),
            ID_EC_PUBLIC_KEY => match EcAlgoParameters::from_der(&parameters.to_der()?)? {
                EcAlgoParameters::EcParameters(params) => params.to_curve(),
                EcAlgoParameters::NamedCurve(oid) => named_curve(&oid),
                EcAlgoParameters::ImplicitlyCa(_) => bail!("Implicit domain parameters"),
            },
            ID_PK_ECDH | ID_PK_PS_ECDH_ECSCHNORR => parameters
                .decode_as::<Self>()?
                .domain_parameters(),
            oid => bail!("Unsupported domain parameter algorithm {oid}"),
        }
    }
}

pub fn named_curve(oid: &Oid) -> Result<EllipticCurve<FieldUint>> {
    let (_, curve) = NAMED_CURVES
        .iter()
        .find(|(entry, _)| entry == oid)
        .ok_or_else(|| anyhow!("Unsupported named curve {oid}"))?;
    curve()
}

impl EcParameters {
    pub fn to_curve(&self) -> Result<EllipticCurve<FieldUint>> {
        ensure!(self.version == 1, "Unsupported EcParameters version");
        ensure!(self.field_id.field_type == ID_PRIME_FIELD, "Only prime fields are supported");
        let prime = self.field_id.parameters.decode_as::<DerUint>()?;
        let modulus: FieldUint = parse_uint(prime.as_bytes())?;
        let a = parse_uint(self.curve.a.as_bytes())?;
        let b = parse_uint(self.curve.b.as_bytes())?;

        let base = self.base.as_bytes();
        ensure!(
            base.first() == Some(&4) && base.len() % 2 == 1,
            "Base point must be uncompressed"
        );
        let (x, y) = base[1..].split_at(base.len() / 2);
        let cofactor = match &self.cofactor {
            Some(h) => parse_uint(h.as_bytes())?,
            None => FieldUint::from(1),
        };
        EllipticCurve::new(
            modulus,
            a,
            b,
            parse_uint(x)?,
            parse_uint(y)?,
            parse_uint(self.order.as_bytes())?,
            cofactor,
        )
    }

    pub fn from_curve(curve: &EllipticCurve<FieldUint>) -> der::Result<Self> {
        let size = curve.field_size();
        let trimmed = |value: FieldUint| value.to_be_bytes_trimmed_vec();
        let padded = |value: FieldUint| {
            let bytes = value.to_be_bytes_vec();
            bytes[bytes.len() - size..].to_vec()
        };
        Ok(Self {
            version:  1,
            field_id: FieldId {
                field_type: ID_PRIME_FIELD,
                parameters: Any::encode_from(&DerUint::new(&trimmed(curve.modulus()))?)?,
            },
            curve:    Curve {
                a:    OctetString::new(padded(curve.a().to_uint()))?,
                b:    OctetString::new(padded(curve.b().to_uint()))?,
                seed: None,
            },
            base:     OctetString::new(curve.point_to_bytes(curve.generator()))?,
            order:    DerUint::new(&trimmed(curve.order()))?,
            cofactor: Some(DerUint::new(&trimmed(curve.cofactor()))?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardized() -> Result<()> {
        let alg = AlgorithmIdentifier::standardized(13)?;
        let der = alg.to_der()?;
        assert_eq!(der, hex_literal::hex!("30 0c 06 07 04 00 7f 00 07 01 02 02 01 0d"));
        let decoded = AlgorithmIdentifier::from_der(&der)?;
        assert_eq!(decoded.domain_parameters()?, named::brainpool_p256r1()?);
        assert!(AlgorithmIdentifier::standardized(9)?.domain_parameters().is_err());
        Ok(())
    }

    #[test]
    fn test_explicit_round_trip() -> Result<()> {
        for curve in [named::brainpool_p256r1()?, named::secp224r1()?] {
            let alg = AlgorithmIdentifier::explicit(&curve)?;
            let decoded = AlgorithmIdentifier::from_der(&alg.to_der()?)?;
            assert_eq!(decoded.domain_parameters()?, curve);
        }
        Ok(())
    }

    #[test]
    fn test_named_curve() -> Result<()> {
        let alg = AlgorithmIdentifier {
            algorithm:  ID_EC_PUBLIC_KEY,
            parameters: Some(Any::encode_from(&Oid::new_unwrap("1.2.840.10045.3.1.7"))?),
        };
        assert_eq!(alg.domain_parameters()?, named::secp256r1()?);
        let wrapped = AlgorithmIdentifier {
            algorithm:  ID_PK_ECDH,
            parameters: Some(Any::encode_from(&AlgorithmIdentifier::standardized(12)?)?),
        };
        assert_eq!(wrapped.domain_parameters()?, named::secp256r1()?);
        Ok(())
    }
}
