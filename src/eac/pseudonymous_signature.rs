//! Pseudonymous Signatures, TR-03110-2 section 3.6.
//!
//! The chip signs with one of two private keys whose group public key
//! `PK_ICC` is shared by many chips. Next to the signature it returns the
//! sector specific pseudonyms `I1` and `I2` of its private keys. Three
//! flavours exist: authentication (`PSA`), message signature (`PSM`) and
//! credential signature over the contents of files (`PSC`).
//!
//! The terminal side builds the commands and evaluates the responses, the
//! server side checks the resulting signature against the group key with
//! [`PseudonymousSignature::check_signature`].
use {
    super::{
        general_authenticate, key_reference, manage_security_environment,
        restricted_identification::dynamic_authentication_data, select_responses, Command,
        ProtocolError, ProtocolStep, StepResult, TransmitResult,
    },
    crate::{
        asn1::{
            make_tag,
            oid::{oid_name, ps_algorithm, PsVariant},
            PsInfo, PsPublicKeyInfo,
        },
        crypto::{parse_uint, remove_leading_zero, DigestAlgorithm, EllipticCurve, FieldUint},
        iso7816::{CommandApdu, StatusWord},
    },
    anyhow::{anyhow, ensure, Result},
    der::asn1::ObjectIdentifier as Oid,
    subtle::ConstantTimeEq,
    tracing::{debug, warn},
};

const SECTOR_KEY_TAG: u32 = 0x80;
const INPUT_TAG: u32 = 0x81;
const FIRST_KEY_TAG: u32 = 0x82;
const SECOND_KEY_TAG: u32 = 0x83;
const SIGNATURE_TAG: u32 = 0x84;
const FILE_REFERENCE_TAG: u32 = 0xe1;
const DISCRETIONARY_DATA_TAG: u32 = 0x73;
const FILE_ID_TAG: u32 = 0x04;
const SPECIFIC_ATTRIBUTES_TAG: u32 = 0x53;

/// Response length of the signing command, extended.
const SIGNATURE_NE: usize = 0x1_0000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PseudonymousSignature {
    protocol: Oid,
    key_id:   u64,
    variant:  PsVariant,
    digest:   DigestAlgorithm,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PsParameter {
    /// Uncompressed sector public key `PK_sector`.
    pub sector_key:                  Vec<u8>,
    /// Message to sign with `PSM`. With `PSC` the concatenated contents of
    /// the referenced files, used only for verification.
    pub signature_input:             Option<Vec<u8>>,
    /// Files signed with `PSC`.
    pub file_ids:                    Vec<[u8; 2]>,
    /// Also sign the specific attributes with `PSC`.
    pub include_specific_attributes: bool,
}

/// Pseudonyms and signature returned by the chip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PsOutput {
    pub first_key:  Option<Vec<u8>>,
    pub second_key: Option<Vec<u8>>,
    pub signature:  Vec<u8>,
}

/// Group public keys and domain parameters to verify against.
#[derive(Clone, Debug)]
pub struct PsVerificationKey {
    curve:  EllipticCurve<FieldUint>,
    pk_icc: Vec<u8>,
    pk_m:   Vec<u8>,
}

impl PseudonymousSignature {
    pub fn new(protocol: Oid, key_id: u64) -> Result<Self> {
        let (variant, digest) = ps_algorithm(&protocol)
            .ok_or_else(|| anyhow!("Unsupported protocol for pseudonymous signature"))?;
        Ok(Self {
            protocol,
            key_id,
            variant,
            digest,
        })
    }

    pub fn from_info(info: &PsInfo) -> Result<Self> {
        Self::new(info.protocol, info.key_id)
    }

    pub const fn variant(&self) -> PsVariant {
        self.variant
    }

    pub const fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    fn mse_data(&self, parameter: &PsParameter) -> Vec<u8> {
        let mut data = make_tag(0x80u32, self.protocol.as_bytes());
        if self.variant == PsVariant::Credentials {
            data.extend(make_tag(FILE_REFERENCE_TAG, &make_tag(
                DISCRETIONARY_DATA_TAG,
                &file_references(parameter),
            )));
        }
        data.extend(make_tag(0x84u32, &key_reference(self.key_id)));
        data
    }

    fn signing_command(&self, parameter: &PsParameter) -> Result<CommandApdu> {
        let sector_key = make_tag(SECTOR_KEY_TAG, &parameter.sector_key);
        Ok(match self.variant {
            PsVariant::Authentication => {
                general_authenticate(make_tag(0x7cu32, &sector_key), SIGNATURE_NE)
            }
            PsVariant::Message => {
                let input = parameter
                    .signature_input
                    .as_deref()
                    .ok_or_else(|| anyhow!("Message signature requires a signature input"))?;
                let data = [sector_key, make_tag(INPUT_TAG, input)].concat();
                compute_signature(make_tag(DISCRETIONARY_DATA_TAG, &data))
            }
            PsVariant::Credentials => {
                compute_signature(make_tag(DISCRETIONARY_DATA_TAG, &sector_key))
            }
        })
    }

    /// Checks `output` against the group key in `key`.
    ///
    /// The signature is `c || s1 || s2` with `c` as long as the digest and
    /// `s1` as long as the field elements. The verifier recomputes
    ///
    /// ```text
    /// Q1 = c * PK_ICC + s1 * G + s2 * PK_M
    /// A1 = c * I1 + s1 * PK_sector
    /// A2 = c * I2 + s2 * PK_sector
    /// ```
    ///
    /// and accepts when `c` equals the hash of the x coordinates of `Q1`,
    /// the present pseudonyms with their `A` points and `PK_sector`, followed
    /// by the protocol identifier and the signature input.
    pub fn check_signature(
        &self,
        key: &PsVerificationKey,
        parameter: &PsParameter,
        output: &PsOutput,
    ) -> bool {
        match self.verify(key, parameter, output) {
            Ok(valid) => {
                debug!("Pseudonymous signature valid: {valid}");
                valid
            }
            Err(error) => {
                warn!("Pseudonymous signature not verifiable: {error:#}");
                false
            }
        }
    }

    fn verify(
        &self,
        key: &PsVerificationKey,
        parameter: &PsParameter,
        output: &PsOutput,
    ) -> Result<bool> {
        let curve = &key.curve;
        let field_size = curve.field_size();
        let digest_len = self.digest.output_len();
        let signature = &output.signature;
        ensure!(
            signature.len() > digest_len + field_size,
            "Signature of {} bytes too short",
            signature.len()
        );
        let (c, rest) = signature.split_at(digest_len);
        let (s1, s2) = rest.split_at(field_size);
        let c: FieldUint = parse_uint(c)?;
        let s1: FieldUint = parse_uint(s1)?;
        let s2: FieldUint = parse_uint(s2)?;

        let point = |bytes: &[u8]| curve.point_from_bytes(bytes, true);
        let pk_icc = point(key.pk_icc.as_slice())?;
        let pk_m = point(key.pk_m.as_slice())?;
        let pk_sector = point(parameter.sector_key.as_slice())?;

        let q1 = pk_icc.mul_uint(c) + curve.generator().mul_uint(s1) + pk_m.mul_uint(s2);
        let mut input = curve.x_to_bytes(q1)?;
        for (pseudonym, s) in [(&output.first_key, s1), (&output.second_key, s2)] {
            let Some(pseudonym) = pseudonym else {
                continue;
            };
            let pseudonym = point(pseudonym.as_slice())?;
            let a = pseudonym.mul_uint(c) + pk_sector.mul_uint(s);
            input.extend(curve.x_to_bytes(pseudonym)?);
            input.extend(curve.x_to_bytes(a)?);
        }
        input.extend(curve.x_to_bytes(pk_sector)?);
        input.extend(make_tag(0x06u32, self.protocol.as_bytes()));
        input.extend(parameter.signature_input.as_deref().unwrap_or_default());

        let expected = self.digest.digest(&[&input]);
        Ok(bool::from(expected.ct_eq(&signature[..digest_len])))
    }
}

impl PsVerificationKey {
    /// Group keys as uncompressed points on `curve`.
    pub fn new(curve: EllipticCurve<FieldUint>, pk_icc: Vec<u8>, pk_m: Vec<u8>) -> Self {
        Self {
            curve,
            pk_icc,
            pk_m,
        }
    }

    pub fn from_info(info: &PsPublicKeyInfo) -> Result<Self> {
        let public_key = &info.required_data.ps_public_key;
        let curve = public_key.algorithm.domain_parameters.domain_parameters()?;
        let pk_icc = public_key
            .pk_icc
            .as_bytes()
            .ok_or_else(|| anyhow!("Group public key with unused bits"))?;
        Ok(Self::new(
            curve,
            remove_leading_zero(pk_icc).to_vec(),
            public_key.algorithm.pk_m.as_bytes().to_vec(),
        ))
    }

    pub const fn curve(&self) -> &EllipticCurve<FieldUint> {
        &self.curve
    }
}

/// `73 { 73 { 04 fid .. } [53 00FF] }` inner content for `PSC`.
fn file_references(parameter: &PsParameter) -> Vec<u8> {
    let ids: Vec<u8> = parameter
        .file_ids
        .iter()
        .flat_map(|fid| make_tag(FILE_ID_TAG, fid))
        .collect();
    let mut references = make_tag(DISCRETIONARY_DATA_TAG, &ids);
    if parameter.include_specific_attributes {
        references.extend(make_tag(SPECIFIC_ATTRIBUTES_TAG, &[0x00, 0xff]));
    }
    references
}

/// PSO: COMPUTE DIGITAL SIGNATURE in its proprietary form.
fn compute_signature(data: Vec<u8>) -> CommandApdu {
    CommandApdu::new(0x80, 0x2a, 0xae, 0xac)
        .with_data(data)
        .with_ne(SIGNATURE_NE)
}

impl ProtocolStep for PseudonymousSignature {
    type Output = PsOutput;
    type Parameter = PsParameter;

    fn minimum_count(&self) -> usize {
        2
    }

    fn maximum_count(&self) -> usize {
        2
    }

    fn build_commands(&self, parameter: &PsParameter) -> Result<Vec<Command>> {
        ensure!(!parameter.sector_key.is_empty(), "No sector public key given");
        if self.variant == PsVariant::Credentials {
            ensure!(
                !parameter.file_ids.is_empty(),
                "Credential signature requires at least one file"
            );
        }
        debug!(
            "Pseudonymous signature with {}",
            oid_name(&self.protocol).unwrap_or("unknown protocol")
        );
        let p2 = match self.variant {
            PsVariant::Authentication => 0xa4,
            PsVariant::Message | PsVariant::Credentials => 0xb6,
        };
        let mse = manage_security_environment(0x41, p2, self.mse_data(parameter));
        Ok(vec![
            Command::new(&mse, None)?,
            Command::new(&self.signing_command(parameter)?, None)?,
        ])
    }

    /// The signing response.
    fn default_indices(&self, available: usize) -> Vec<usize> {
        vec![available.saturating_sub(1).min(1)]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<PsOutput> {
        let mut first_key = None;
        let mut second_key = None;
        let mut signature = None;
        for response in select_responses(self, result, indices)? {
            if response.status != StatusWord::SUCCESS {
                return Err(ProtocolError::Card {
                    status:  response.status,
                    context: "pseudonymous signature not performed",
                });
            }
            if response.data.is_empty() {
                continue;
            }
            let objects =
                dynamic_authentication_data(&response.data).map_err(ProtocolError::Malformed)?;
            for object in objects {
                let slot = match object.tag().value() {
                    FIRST_KEY_TAG => &mut first_key,
                    SECOND_KEY_TAG => &mut second_key,
                    SIGNATURE_TAG => &mut signature,
                    _ => continue,
                };
                let value = object.value().as_primitive().map_err(ProtocolError::Malformed)?;
                *slot = Some(value.to_vec());
            }
        }
        let signature = signature
            .ok_or(ProtocolError::Verification("pseudonymous signature not performed"))?;
        Ok(PsOutput {
            first_key,
            second_key,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::asn1::oid::{
            ID_PSA_ECDH_ECSCHNORR_SHA_256, ID_PSC_ECDH_ECSCHNORR_SHA_256,
            ID_PSM_ECDH_ECSCHNORR_SHA_384, ID_RI_ECDH_SHA_256,
        },
        hex_literal::hex,
    };

    fn parameter() -> PsParameter {
        PsParameter {
            sector_key: hex!("04 01 02").to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_construction() -> Result<()> {
        let ps = PseudonymousSignature::new(ID_PSM_ECDH_ECSCHNORR_SHA_384, 1)?;
        assert_eq!(ps.variant(), PsVariant::Message);
        assert_eq!(ps.digest(), DigestAlgorithm::Sha384);
        assert!(PseudonymousSignature::new(ID_RI_ECDH_SHA_256, 1).is_err());
        Ok(())
    }

    #[test]
    fn test_authentication_commands() -> Result<()> {
        let ps = PseudonymousSignature::new(ID_PSA_ECDH_ECSCHNORR_SHA_256, 2)?;
        let commands = ps.build_commands(&parameter())?;
        assert_eq!(
            commands[0].apdu,
            hex!("00 22 41 a4 10 80 0b 04 00 7f 00 07 02 02 0b 01 02 03 84 01 02")
        );
        assert_eq!(
            commands[1].apdu,
            hex!("00 86 00 00 00 00 07 7c 05 80 03 04 01 02 00 00")
        );
        assert!(commands.iter().all(|command| command.accepted.is_none()));
        assert!(ps.build_commands(&PsParameter::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_message_commands() -> Result<()> {
        let ps = PseudonymousSignature::new(ID_PSM_ECDH_ECSCHNORR_SHA_384, 1)?;
        assert!(ps.build_commands(&parameter()).is_err());
        let parameter = PsParameter {
            signature_input: Some(hex!("ab cd").to_vec()),
            ..parameter()
        };
        let commands = ps.build_commands(&parameter)?;
        assert_eq!(commands[0].apdu[..4], hex!("00 22 41 b6"));
        assert_eq!(
            commands[1].apdu,
            hex!("80 2a ae ac 00 00 0b 73 09 80 03 04 01 02 81 02 ab cd 00 00")
        );
        Ok(())
    }

    #[test]
    fn test_credential_commands() -> Result<()> {
        let ps = PseudonymousSignature::new(ID_PSC_ECDH_ECSCHNORR_SHA_256, 1)?;
        assert!(ps.build_commands(&parameter()).is_err());
        let parameter = PsParameter {
            file_ids: vec![hex!("01 01"), hex!("01 02")],
            include_specific_attributes: true,
            ..parameter()
        };
        let commands = ps.build_commands(&parameter)?;
        assert_eq!(
            commands[0].apdu,
            hex!(
                "00 22 41 b6 22"
                "80 0b 04 00 7f 00 07 02 02 0b 03 02 03"
                "e1 10 73 0e 73 08 04 02 01 01 04 02 01 02 53 02 00 ff"
                "84 01 01"
            )
        );
        assert_eq!(
            commands[1].apdu,
            hex!("80 2a ae ac 00 00 07 73 05 80 03 04 01 02 00 00")
        );
        Ok(())
    }

    #[test]
    fn test_evaluate() -> Result<()> {
        let ps = PseudonymousSignature::new(ID_PSA_ECDH_ECSCHNORR_SHA_256, 1)?;
        let result: TransmitResult = Ok(vec![
            hex!("9000").to_vec(),
            hex!("7c 0c 82 02 04 01 83 02 04 02 84 02 ca fe 9000").to_vec(),
        ]);
        let output = ps.evaluate(&result, None)?;
        assert_eq!(output.first_key.as_deref(), Some(&hex!("04 01")[..]));
        assert_eq!(output.second_key.as_deref(), Some(&hex!("04 02")[..]));
        assert_eq!(output.signature, hex!("ca fe"));

        let unsigned: TransmitResult =
            Ok(vec![hex!("9000").to_vec(), hex!("7c 04 82 02 04 01 9000").to_vec()]);
        assert!(matches!(
            ps.evaluate(&unsigned, None),
            Err(ProtocolError::Verification(_))
        ));
        let refused: TransmitResult = Ok(vec![hex!("9000").to_vec(), hex!("6985").to_vec()]);
        assert!(matches!(ps.evaluate(&refused, None), Err(ProtocolError::Card { .. })));
        let single: TransmitResult = Ok(vec![hex!("9000").to_vec()]);
        assert!(matches!(ps.evaluate(&single, None), Err(ProtocolError::Contract(_))));
        Ok(())
    }
}
