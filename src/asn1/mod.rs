//! Pure ASN1 types, no application logic.
//!
//! Card responses and command payloads are BER-TLV trees ([`Tlv`]), while the
//! security infos published by the card are DER and parsed with `der` derive
//! types. A `SecurityInfo` is parsed into an enum of the known OIDs with a
//! catch-all for unimplemented cases, so every valid input still parses.

pub mod oid;
pub mod public_key_info;
pub mod security_info;
mod tlv;

pub use self::{
    public_key_info::{AlgorithmIdentifier, SubjectPublicKeyInfo},
    security_info::{
        ChipAuthenticationDomainParameterInfo, ChipAuthenticationInfo,
        ChipAuthenticationPublicKeyInfo, PaceInfo, PsInfo, PsPublicKeyInfo,
        RestrictedIdentificationInfo, SecurityInfo, SecurityInfos,
    },
    tlv::{make_tag, Tag, Tlv, TlvCodec, TlvValue},
};
