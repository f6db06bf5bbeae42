//! `SecurityInfo` records from EF.CardAccess / EF.CardSecurity that the
//! EAC sub-protocols are configured from (TR-03110-3 appendix A.1).
//!
//! Parsing is tolerant: records with an unknown protocol or a body that does
//! not match the expected structure are kept as [`SecurityInfo::Unknown`].
use {
    super::{
        oid::{is_under, ID_CA, ID_PACE, ID_PK_DH, ID_PK_ECDH, ID_PK_PS_ECDH_ECSCHNORR, ID_PS,
            ID_RI},
        public_key_info::{AlgorithmIdentifier, SubjectPublicKeyInfo},
    },
    anyhow::Result,
    der::{
        asn1::{BitString, ObjectIdentifier as Oid, OctetString},
        Any, Decode, Encode, Header, Reader, Sequence, SliceReader, Tag,
    },
    tracing::warn,
};

/// Generic shape shared by all security infos.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AnySecurityInfo {
    pub protocol:      Oid,
    pub required_data: Any,
    pub optional_data: Option<Any>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PaceInfo {
    pub protocol:     Oid,
    pub version:      u64,
    pub parameter_id: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ChipAuthenticationInfo {
    pub protocol: Oid,
    pub version:  u64,
    pub key_id:   Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ChipAuthenticationDomainParameterInfo {
    pub protocol:         Oid,
    pub domain_parameter: AlgorithmIdentifier,
    pub key_id:           Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ChipAuthenticationPublicKeyInfo {
    pub protocol:                       Oid,
    pub chip_authentication_public_key: SubjectPublicKeyInfo,
    pub key_id:                         Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RestrictedIdentificationInfo {
    pub protocol:    Oid,
    pub params:      ProtocolParams,
    pub max_key_len: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProtocolParams {
    pub version:         u64,
    pub key_id:          u64,
    pub authorized_only: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsInfo {
    pub protocol:      Oid,
    pub required_data: PsRequiredData,
    pub key_id:        u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsRequiredData {
    pub version:       u64,
    pub ps1_auth_info: u64,
    pub ps2_auth_info: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsPublicKeyInfo {
    pub protocol:      Oid,
    pub required_data: PsPublicKeyRequiredData,
    pub optional_data: Option<PsPublicKeyOptionalData>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsPublicKeyRequiredData {
    pub ps_public_key: PsPublicKey,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsPublicKeyOptionalData {
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub ps_parameter_id: Option<u64>,
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", optional = "true")]
    pub key_id:          Option<u64>,
}

/// `SubjectPublicKeyInfo` shaped group key of a pseudonymous signature.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsPublicKey {
    pub algorithm: PsAlgorithm,
    /// The group public key `PK_ICC`.
    pub pk_icc:    BitString,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PsAlgorithm {
    pub algorithm:         Oid,
    pub domain_parameters: AlgorithmIdentifier,
    /// The second group key `PK_M`, uncompressed.
    pub pk_m:              OctetString,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SecurityInfo {
    Pace(PaceInfo),
    ChipAuthentication(ChipAuthenticationInfo),
    ChipAuthenticationDomainParameter(ChipAuthenticationDomainParameterInfo),
    ChipAuthenticationPublicKey(ChipAuthenticationPublicKeyInfo),
    RestrictedIdentification(RestrictedIdentificationInfo),
    PseudonymousSignature(PsInfo),
    PseudonymousSignaturePublicKey(PsPublicKeyInfo),
    Unknown(AnySecurityInfo),
}

/// Collection of security infos in card order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SecurityInfos(pub Vec<SecurityInfo>);

impl PsPublicKeyInfo {
    pub fn key_id(&self) -> Option<u64> {
        self.optional_data.as_ref().and_then(|data| data.key_id)
    }
}

impl SecurityInfo {
    /// Classifies a record by its protocol OID.
    ///
    /// The info kinds under one arc are told apart by OID depth: concrete
    /// algorithm OIDs carry one more arc than the key agreement families
    /// used by the domain parameter records.
    pub fn from_any(info: AnySecurityInfo) -> Self {
        let protocol = info.protocol;
        let depth = protocol.arcs().count();
        let classified = if is_under(&protocol, &ID_PACE) && depth == 11 {
            reparse(&info).map(Self::Pace)
        } else if is_under(&protocol, &ID_CA) && depth == 11 {
            reparse(&info).map(Self::ChipAuthentication)
        } else if is_under(&protocol, &ID_CA) && depth == 10 {
            reparse(&info).map(Self::ChipAuthenticationDomainParameter)
        } else if protocol == ID_PK_ECDH || protocol == ID_PK_DH {
            reparse(&info).map(Self::ChipAuthenticationPublicKey)
        } else if protocol == ID_PK_PS_ECDH_ECSCHNORR {
            reparse(&info).map(Self::PseudonymousSignaturePublicKey)
        } else if is_under(&protocol, &ID_RI) && depth == 11 {
            reparse(&info).map(Self::RestrictedIdentification)
        } else if is_under(&protocol, &ID_PS) && depth == 12 {
            reparse(&info).map(Self::PseudonymousSignature)
        } else {
            return Self::Unknown(info);
        };
        classified.unwrap_or_else(|error| {
            warn!("Could not parse security info {protocol}: {error}");
            Self::Unknown(info)
        })
    }

    pub fn protocol(&self) -> &Oid {
        match self {
            Self::Pace(info) => &info.protocol,
            Self::ChipAuthentication(info) => &info.protocol,
            Self::ChipAuthenticationDomainParameter(info) => &info.protocol,
            Self::ChipAuthenticationPublicKey(info) => &info.protocol,
            Self::RestrictedIdentification(info) => &info.protocol,
            Self::PseudonymousSignature(info) => &info.protocol,
            Self::PseudonymousSignaturePublicKey(info) => &info.protocol,
            Self::Unknown(info) => &info.protocol,
        }
    }
}

fn reparse<T: for<'a> Decode<'a>>(info: &AnySecurityInfo) -> Result<T> {
    Ok(T::from_der(&info.to_der()?)?)
}

impl SecurityInfos {
    /// Parses a DER `SET OF SecurityInfo`.
    ///
    /// Element order is kept as found; DER set ordering is not enforced.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = SliceReader::new(bytes)?;
        let header = Header::decode(&mut reader)?;
        header.tag.assert_eq(Tag::Set)?;
        let infos = reader.read_nested(header.length, |reader| {
            let mut infos = Vec::new();
            while !reader.is_finished() {
                infos.push(AnySecurityInfo::decode(reader)?);
            }
            Ok(infos)
        })?;
        let infos = reader.finish(infos)?;
        Ok(Self(infos.into_iter().map(SecurityInfo::from_any).collect()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecurityInfo> {
        self.0.iter()
    }

    pub fn chip_authentication(&self) -> impl Iterator<Item = &ChipAuthenticationInfo> {
        self.iter().filter_map(|info| match info {
            SecurityInfo::ChipAuthentication(info) => Some(info),
            _ => None,
        })
    }

    /// Domain parameters for a chip authentication key, matched by key id
    /// when one is given.
    pub fn chip_authentication_domain(
        &self,
        key_id: Option<u64>,
    ) -> Option<&ChipAuthenticationDomainParameterInfo> {
        self.iter().find_map(|info| match info {
            SecurityInfo::ChipAuthenticationDomainParameter(info)
                if key_id.is_none() || info.key_id == key_id =>
            {
                Some(info)
            }
            _ => None,
        })
    }

    pub fn chip_authentication_public_key(
        &self,
        key_id: Option<u64>,
    ) -> Option<&ChipAuthenticationPublicKeyInfo> {
        self.iter().find_map(|info| match info {
            SecurityInfo::ChipAuthenticationPublicKey(info)
                if key_id.is_none() || info.key_id == key_id =>
            {
                Some(info)
            }
            _ => None,
        })
    }

    pub fn pace_version(&self) -> Option<u64> {
        self.iter().find_map(|info| match info {
            SecurityInfo::Pace(info) => Some(info.version),
            _ => None,
        })
    }

    pub fn restricted_identification(&self) -> impl Iterator<Item = &RestrictedIdentificationInfo> {
        self.iter().filter_map(|info| match info {
            SecurityInfo::RestrictedIdentification(info) => Some(info),
            _ => None,
        })
    }

    pub fn pseudonymous_signature(&self) -> impl Iterator<Item = &PsInfo> {
        self.iter().filter_map(|info| match info {
            SecurityInfo::PseudonymousSignature(info) => Some(info),
            _ => None,
        })
    }

    pub fn pseudonymous_signature_public_key(&self, key_id: u64) -> Option<&PsPublicKeyInfo> {
        self.iter().find_map(|info| match info {
            SecurityInfo::PseudonymousSignaturePublicKey(info)
                if info.key_id().map_or(true, |id| id == key_id) =>
            {
                Some(info)
            }
            _ => None,
        })
    }
}
