//! Object identifiers from BSI TR-03110-3 appendix A.1.1 and the static
//! algorithm tables keyed by them.
//!
//! Lookups compare the DER content bytes exactly.
use {
    crate::crypto::DigestAlgorithm,
    der::asn1::ObjectIdentifier as Oid,
};

pub const ID_EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");
pub const ID_PRIME_FIELD: Oid = Oid::new_unwrap("1.2.840.10045.1.1");

pub const BSI_DE: Oid = Oid::new_unwrap("0.4.0.127.0.7");
pub const STANDARDIZED_DOMAIN_PARAMETERS: Oid = Oid::new_unwrap("0.4.0.127.0.7.1.2");

pub const ID_PK_DH: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.1.1");
pub const ID_PK_ECDH: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.1.2");
pub const ID_PK_PS_ECDH_ECSCHNORR: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.1.3.2");

pub const ID_CA: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3");
pub const ID_CA_ECDH: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2");
pub const ID_CA_ECDH_3DES_CBC_CBC: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.1");
pub const ID_CA_ECDH_AES_CBC_CMAC_128: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.2");
pub const ID_CA_ECDH_AES_CBC_CMAC_192: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.3");
pub const ID_CA_ECDH_AES_CBC_CMAC_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.4");

pub const ID_PACE: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.4");

pub const ID_RI: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5");
pub const ID_RI_DH_SHA_1: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.1.1");
pub const ID_RI_DH_SHA_224: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.1.2");
pub const ID_RI_DH_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.1.3");
pub const ID_RI_DH_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.1.4");
pub const ID_RI_DH_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.1.5");
pub const ID_RI_ECDH_SHA_1: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.2.1");
pub const ID_RI_ECDH_SHA_224: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.2.2");
pub const ID_RI_ECDH_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.2.3");
pub const ID_RI_ECDH_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.2.4");
pub const ID_RI_ECDH_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.5.2.5");

pub const ID_PS: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11");
pub const ID_PSA_ECDH_ECSCHNORR_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.1.2.3");
pub const ID_PSA_ECDH_ECSCHNORR_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.1.2.4");
pub const ID_PSA_ECDH_ECSCHNORR_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.1.2.5");
pub const ID_PSM_ECDH_ECSCHNORR_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.2.2.3");
pub const ID_PSM_ECDH_ECSCHNORR_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.2.2.4");
pub const ID_PSM_ECDH_ECSCHNORR_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.2.2.5");
pub const ID_PSC_ECDH_ECSCHNORR_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.3.2.3");
pub const ID_PSC_ECDH_ECSCHNORR_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.3.2.4");
pub const ID_PSC_ECDH_ECSCHNORR_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.11.3.2.5");

/// Pseudonymous signature flavours, TR-03110-2 section 3.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PsVariant {
    /// Authentication (`PSA`), run through GENERAL AUTHENTICATE.
    Authentication,
    /// Message (`PSM`), signs caller supplied input.
    Message,
    /// Credentials (`PSC`), signs the content of selected files.
    Credentials,
}

/// Restricted identification algorithm parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiAlgorithm {
    pub digest:          DigestAlgorithm,
    /// Expected length of the GENERAL AUTHENTICATE response data.
    pub response_length: usize,
}

static CA_KEY_BITS: [(Oid, usize); 3] = [
    (ID_CA_ECDH_AES_CBC_CMAC_128, 128),
    (ID_CA_ECDH_AES_CBC_CMAC_192, 192),
    (ID_CA_ECDH_AES_CBC_CMAC_256, 256),
];

static RI_ALGORITHMS: [(Oid, DigestAlgorithm, usize); 10] = [
    (ID_RI_DH_SHA_1, DigestAlgorithm::Sha1, 0x18),
    (ID_RI_DH_SHA_224, DigestAlgorithm::Sha224, 0x20),
    (ID_RI_DH_SHA_256, DigestAlgorithm::Sha256, 0x24),
    (ID_RI_DH_SHA_384, DigestAlgorithm::Sha384, 0x34),
    (ID_RI_DH_SHA_512, DigestAlgorithm::Sha512, 0x44),
    (ID_RI_ECDH_SHA_1, DigestAlgorithm::Sha1, 0x18),
    (ID_RI_ECDH_SHA_224, DigestAlgorithm::Sha224, 0x20),
    (ID_RI_ECDH_SHA_256, DigestAlgorithm::Sha256, 0x24),
    (ID_RI_ECDH_SHA_384, DigestAlgorithm::Sha384, 0x34),
    (ID_RI_ECDH_SHA_512, DigestAlgorithm::Sha512, 0x44),
];

static PS_ALGORITHMS: [(Oid, PsVariant, DigestAlgorithm); 9] = [
    (ID_PSA_ECDH_ECSCHNORR_SHA_256, PsVariant::Authentication, DigestAlgorithm::Sha256),
    (ID_PSA_ECDH_ECSCHNORR_SHA_384, PsVariant::Authentication, DigestAlgorithm::Sha384),
    (ID_PSA_ECDH_ECSCHNORR_SHA_512, PsVariant::Authentication, DigestAlgorithm::Sha512),
    (ID_PSM_ECDH_ECSCHNORR_SHA_256, PsVariant::Message, DigestAlgorithm::Sha256),
    (ID_PSM_ECDH_ECSCHNORR_SHA_384, PsVariant::Message, DigestAlgorithm::Sha384),
    (ID_PSM_ECDH_ECSCHNORR_SHA_512, PsVariant::Message, DigestAlgorithm::Sha512),
    (ID_PSC_ECDH_ECSCHNORR_SHA_256, PsVariant::Credentials, DigestAlgorithm::Sha256),
    (ID_PSC_ECDH_ECSCHNORR_SHA_384, PsVariant::Credentials, DigestAlgorithm::Sha384),
    (ID_PSC_ECDH_ECSCHNORR_SHA_512, PsVariant::Credentials, DigestAlgorithm::Sha512),
];

static NAMES: [(Oid, &str); 27] = [
    (ID_EC_PUBLIC_KEY, "id-ecPublicKey"),
    (ID_PK_ECDH, "id-PK-ECDH"),
    (ID_PK_PS_ECDH_ECSCHNORR, "id-PK-PS-ECDH-ECSchnorr"),
    (ID_CA_ECDH_3DES_CBC_CBC, "id-CA-ECDH-3DES-CBC-CBC"),
    (ID_CA_ECDH_AES_CBC_CMAC_128, "id-CA-ECDH-AES-CBC-CMAC-128"),
    (ID_CA_ECDH_AES_CBC_CMAC_192, "id-CA-ECDH-AES-CBC-CMAC-192"),
    (ID_CA_ECDH_AES_CBC_CMAC_256, "id-CA-ECDH-AES-CBC-CMAC-256"),
    (ID_RI_DH_SHA_1, "id-RI-DH-SHA-1"),
    (ID_RI_DH_SHA_224, "id-RI-DH-SHA-224"),
    (ID_RI_DH_SHA_256, "id-RI-DH-SHA-256"),
    (ID_RI_DH_SHA_384, "id-RI-DH-SHA-384"),
    (ID_RI_DH_SHA_512, "id-RI-DH-SHA-512"),
    (ID_RI_ECDH_SHA_1, "id-RI-ECDH-SHA-1"),
    (ID_RI_ECDH_SHA_224, "id-RI-ECDH-SHA-224"),
    (ID_RI_ECDH_SHA_256, "id-RI-ECDH-SHA-256"),
    (ID_RI_ECDH_SHA_384, "id-RI-ECDH-SHA-384"),
    (ID_RI_ECDH_SHA_512, "id-RI-ECDH-SHA-512"),
    (ID_PSA_ECDH_ECSCHNORR_SHA_256, "id-PSA-ECDH-ECSchnorr-SHA-256"),
    (ID_PSA_ECDH_ECSCHNORR_SHA_384, "id-PSA-ECDH-ECSchnorr-SHA-384"),
    (ID_PSA_ECDH_ECSCHNORR_SHA_512, "id-PSA-ECDH-ECSchnorr-SHA-512"),
    (ID_PSM_ECDH_ECSCHNORR_SHA_256, "id-PSM-ECDH-ECSchnorr-SHA-256"),
    (ID_PSM_ECDH_ECSCHNORR_SHA_384, "id-PSM-ECDH-ECSchnorr-SHA-384"),
    (ID_PSM_ECDH_ECSCHNORR_SHA_512, "id-PSM-ECDH-ECSchnorr-SHA-512"),
    (ID_PSC_ECDH_ECSCHNORR_SHA_256, "id-PSC-ECDH-ECSchnorr-SHA-256"),
    (ID_PSC_ECDH_ECSCHNORR_SHA_384, "id-PSC-ECDH-ECSchnorr-SHA-384"),
    (ID_PSC_ECDH_ECSCHNORR_SHA_512, "id-PSC-ECDH-ECSchnorr-SHA-512"),
    (STANDARDIZED_DOMAIN_PARAMETERS, "standardizedDomainParameters"),
];

fn lookup<T: Copy>(table: &[(Oid, T)], oid: &Oid) -> Option<T> {
    table
        .iter()
        .find(|(entry, _)| entry.as_bytes() == oid.as_bytes())
        .map(|(_, value)| *value)
}

/// AES key length in bits for a chip authentication protocol.
pub fn ca_key_bits(oid: &Oid) -> Option<usize> {
    lookup(&CA_KEY_BITS, oid)
}

pub fn ri_algorithm(oid: &Oid) -> Option<RiAlgorithm> {
    RI_ALGORITHMS
        .iter()
        .find(|(entry, ..)| entry.as_bytes() == oid.as_bytes())
        .map(|&(_, digest, response_length)| RiAlgorithm {
            digest,
            response_length,
        })
}

pub fn ps_algorithm(oid: &Oid) -> Option<(PsVariant, DigestAlgorithm)> {
    PS_ALGORITHMS
        .iter()
        .find(|(entry, ..)| entry.as_bytes() == oid.as_bytes())
        .map(|&(_, variant, digest)| (variant, digest))
}

/// Whether `oid` lies in the arc of `parent`.
pub fn is_under(oid: &Oid, parent: &Oid) -> bool {
    oid.as_bytes().len() > parent.as_bytes().len() && oid.as_bytes().starts_with(parent.as_bytes())
}

/// Human readable name for logging, falling back to the `const-oid` database.
pub fn oid_name(oid: &Oid) -> Option<&'static str> {
    lookup(&NAMES, oid).or_else(|| const_oid::db::DB.by_oid(oid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables() {
        assert_eq!(ca_key_bits(&ID_CA_ECDH_AES_CBC_CMAC_192), Some(192));
        assert_eq!(ca_key_bits(&ID_CA_ECDH_3DES_CBC_CBC), None);
        assert_eq!(
            ri_algorithm(&ID_RI_ECDH_SHA_256),
            Some(RiAlgorithm {
                digest:          DigestAlgorithm::Sha256,
                response_length: 0x24,
            })
        );
        assert_eq!(ri_algorithm(&ID_RI_DH_SHA_1).map(|a| a.response_length), Some(0x18));
        assert_eq!(ri_algorithm(&ID_CA_ECDH_AES_CBC_CMAC_128), None);
        assert_eq!(
            ps_algorithm(&ID_PSC_ECDH_ECSCHNORR_SHA_384),
            Some((PsVariant::Credentials, DigestAlgorithm::Sha384))
        );
        assert_eq!(ps_algorithm(&ID_RI_ECDH_SHA_256), None);
    }

    #[test]
    fn test_response_length_covers_digest() {
        for (_, digest, length) in &RI_ALGORITHMS {
            assert_eq!(*length, digest.output_len() + 4);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(oid_name(&ID_RI_ECDH_SHA_256), Some("id-RI-ECDH-SHA-256"));
        assert!(oid_name(&Oid::new_unwrap("1.2.840.10045.3.1.7")).is_some());
        assert!(is_under(&ID_RI_ECDH_SHA_1, &ID_RI));
        assert!(!is_under(&ID_RI, &ID_RI));
        assert!(!is_under(&ID_CA_ECDH_AES_CBC_CMAC_128, &ID_RI));
    }
}
