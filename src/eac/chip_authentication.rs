//! Chip Authentication, TR-03110-2 section 3.4 and TR-03110-3 appendix B.
//!
//! The terminal sends an ephemeral public key, the chip answers with a nonce
//! and an authentication token. Both sides derive the session keys from the
//! static chip key and the ephemeral terminal key; a matching token proves
//! the chip holds the static private key.
//!
//! Only the version 2 response path is implemented. Version 3 (chip key
//! agreement with a dynamically obtained chip key) can be configured, but its
//! responses are rejected by [`ChipAuthentication::process_response`].
use {
    super::{
        general_authenticate, key_reference, manage_security_environment, Command, ProtocolError,
        StepResult, TransmitResult,
    },
    crate::{
        asn1::{
            make_tag,
            oid::{ca_key_bits, oid_name},
            ChipAuthenticationDomainParameterInfo, ChipAuthenticationInfo,
            ChipAuthenticationPublicKeyInfo, TlvCodec,
        },
        crypto::{
            cmac_aes, remove_leading_zero, CryptoCoreRng, KeyAlgorithm, KeyDerivation, KeyHandler,
            KeyPair, PointValidation, PublicKey, SecretKey,
        },
        iso7816::{ResponseApdu, StatusWord},
    },
    anyhow::{anyhow, ensure, Result},
    der::asn1::ObjectIdentifier as Oid,
    std::fmt::{self, Debug, Formatter},
    subtle::ConstantTimeEq,
    tracing::{debug, warn},
};

/// PACE version assumed when none is known.
const DEFAULT_PACE_VERSION: u64 = 2;

/// Secure messaging keys established by a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    pub enc: SecretKey,
    pub mac: SecretKey,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChipAuthenticationState {
    #[default]
    Pending,
    Authenticated(SessionKeys),
    Failed,
}

pub struct ChipAuthentication {
    version:      u64,
    protocol:     Oid,
    key_id:       Option<u64>,
    chip_key:     Option<Vec<u8>>,
    pace_version: u64,
    algorithm:    KeyAlgorithm,
    kdf:          KeyDerivation,
    key_handler:  Box<dyn KeyHandler>,
    state:        ChipAuthenticationState,
}

impl ChipAuthentication {
    /// Configures a run from the card's security infos.
    ///
    /// The chip public key is required for versions 1 and 2. Without a PACE
    /// version, PACE version 2 is assumed.
    pub fn new(
        info: &ChipAuthenticationInfo,
        domain: &ChipAuthenticationDomainParameterInfo,
        chip_key: Option<&ChipAuthenticationPublicKeyInfo>,
        pace_version: Option<u64>,
    ) -> Result<Self> {
        ensure!(
            (1..=3).contains(&info.version),
            "Unknown chip authentication version {}",
            info.version
        );
        ensure!(
            chip_key.is_some() || info.version == 3,
            "Chip authentication version {} requires the chip public key",
            info.version
        );
        let key_bits = ca_key_bits(&info.protocol)
            .ok_or_else(|| anyhow!("Unsupported protocol for chip authentication"))?;
        let curve = domain.domain_parameter.domain_parameters()?;
        let algorithm = KeyAlgorithm::Ec(curve);
        debug!(
            "Chip authentication version {} with {}",
            info.version,
            oid_name(&info.protocol).unwrap_or("unknown protocol")
        );
        let chip_key = chip_key.map(|key| {
            let bits = key.chip_authentication_public_key.subject_public_key.raw_bytes();
            remove_leading_zero(bits).to_vec()
        });
        Ok(Self {
            version: info.version,
            protocol: info.protocol,
            key_id: info.key_id.or(domain.key_id),
            chip_key,
            pace_version: pace_version.unwrap_or(DEFAULT_PACE_VERSION),
            algorithm,
            kdf: KeyDerivation::new(key_bits)?,
            key_handler: algorithm.key_handler(),
            state: ChipAuthenticationState::Pending,
        })
    }

    #[must_use]
    pub fn with_point_validation(mut self, validation: PointValidation) -> Self {
        self.key_handler = self.algorithm.key_handler_with(validation);
        self
    }

    pub const fn version(&self) -> u64 {
        self.version
    }

    pub const fn protocol(&self) -> &Oid {
        &self.protocol
    }

    pub const fn state(&self) -> &ChipAuthenticationState {
        &self.state
    }

    /// Session keys, only available after a successful run.
    pub const fn keys(&self) -> Option<&SessionKeys> {
        match &self.state {
            ChipAuthenticationState::Authenticated(keys) => Some(keys),
            _ => None,
        }
    }

    /// Consumes the run, returning the session keys on success.
    pub fn into_keys(self) -> Option<SessionKeys> {
        match self.state {
            ChipAuthenticationState::Authenticated(keys) => Some(keys),
            _ => None,
        }
    }

    /// Fresh ephemeral terminal key pair on the chip's domain parameters.
    pub fn ephemeral_key_pair(&self, rng: &mut dyn CryptoCoreRng) -> KeyPair {
        self.key_handler.generate_key_pair(rng)
    }

    /// `Comp(PK)` of an ephemeral terminal key, as signed during terminal
    /// authentication.
    pub fn compressed_ephemeral_key(&self, public: &PublicKey) -> Result<Vec<u8>> {
        self.key_handler.compress_key(public)
    }

    /// `MSE:Set AT` and GENERAL AUTHENTICATE carrying the ephemeral key.
    pub fn build_commands(&self, terminal: &PublicKey) -> Result<Vec<Command>> {
        let mut mse = make_tag(0x80u32, self.protocol.as_bytes());
        if let Some(key_id) = self.key_id {
            mse.extend(make_tag(0x84u32, &key_reference(key_id)));
        }
        let data = make_tag(0x7cu32, &make_tag(0x80u32, terminal));
        Ok(vec![
            Command::success_only(&manage_security_environment(0x41, 0xa4, mse))?,
            Command::success_only(&general_authenticate(data, 256))?,
        ])
    }

    /// Processes the card's answer to [`ChipAuthentication::build_commands`].
    ///
    /// Reads nonce (`81`) and token (`82`) from the GENERAL AUTHENTICATE
    /// response, the last response in `result`.
    pub fn evaluate(&mut self, terminal: &KeyPair, result: &TransmitResult) -> StepResult<()> {
        self.ensure_not_completed()?;
        let responses = result.as_ref().map_err(|error| ProtocolError::Transport(error.clone()))?;
        let response = responses
            .last()
            .ok_or_else(|| ProtocolError::Contract("no response to chip authentication".into()))?;
        let response = ResponseApdu::parse(response).map_err(ProtocolError::Malformed)?;
        if response.status != StatusWord::SUCCESS {
            self.state = ChipAuthenticationState::Failed;
            return Err(ProtocolError::Card {
                status:  response.status,
                context: "chip authentication not performed",
            });
        }
        let (nonce, token) = parse_response(&response.data).map_err(ProtocolError::Malformed)?;
        self.process_response(terminal, &nonce, &token)
    }

    /// Derives the session keys and checks the chip's authentication token.
    pub fn process_response(
        &mut self,
        terminal: &KeyPair,
        nonce: &[u8],
        auth_token: &[u8],
    ) -> StepResult<()> {
        self.ensure_not_completed()?;
        if self.version != 2 {
            return Err(ProtocolError::Contract(format!(
                "responses of chip authentication version {} are not supported",
                self.version
            )));
        }
        if nonce.is_empty() || auth_token.is_empty() {
            return Err(ProtocolError::Contract("nonce and authentication token required".into()));
        }
        let chip_key = self
            .chip_key
            .as_deref()
            .ok_or_else(|| ProtocolError::Contract("chip public key missing".into()))?;

        match self.derive(terminal, chip_key, nonce, auth_token) {
            Ok(Some(keys)) => {
                debug!("Chip authentication successful");
                self.state = ChipAuthenticationState::Authenticated(keys);
                Ok(())
            }
            Ok(None) => {
                warn!("Chip authentication failed: token mismatch");
                self.state = ChipAuthenticationState::Failed;
                Err(ProtocolError::Verification("chip authentication failed"))
            }
            Err(error) => {
                warn!("Chip authentication failed: {error}");
                self.state = ChipAuthenticationState::Failed;
                Err(ProtocolError::Malformed(error))
            }
        }
    }

    fn ensure_not_completed(&self) -> StepResult<()> {
        if matches!(self.state, ChipAuthenticationState::Authenticated(_)) {
            return Err(ProtocolError::Contract("chip authentication already completed".into()));
        }
        Ok(())
    }

    fn derive(
        &self,
        terminal: &KeyPair,
        chip_key: &[u8],
        nonce: &[u8],
        auth_token: &[u8],
    ) -> Result<Option<SessionKeys>> {
        debug!("Chip public key: {}", hex::encode(chip_key));
        let chip_key = self.key_handler.build_public_key(chip_key)?;
        let shared = self.key_handler.shared_secret(&terminal.private, &chip_key)?;
        let enc = self.kdf.derive_enc(&shared, Some(nonce))?;
        let mac = self.kdf.derive_mac(&shared, Some(nonce))?;

        let full_structure = self.pace_version == 1;
        let input =
            self.key_handler
                .convert_public_key(&terminal.public, self.protocol, full_structure)?;
        let expected = cmac_aes(&mac, &input)?;
        let matches = expected.len() == auth_token.len() && bool::from(expected.ct_eq(auth_token));
        Ok(matches.then_some(SessionKeys { enc, mac }))
    }
}

impl Debug for ChipAuthentication {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChipAuthentication")
            .field("version", &self.version)
            .field("protocol", &self.protocol)
            .field("key_id", &self.key_id)
            .field("pace_version", &self.pace_version)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Nonce (`81`) and authentication token (`82`) from a `7C` template.
pub fn parse_response(data: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let template = TlvCodec::default().parse(data)?;
    ensure!(template.tag().value() == 0x7c, "Expected dynamic authentication data");
    let nonce = template
        .child(0x81u32)
        .ok_or_else(|| anyhow!("Nonce missing"))?
        .value()
        .as_primitive()?
        .to_vec();
    let token = template
        .child(0x82u32)
        .ok_or_else(|| anyhow!("Authentication token missing"))?
        .value()
        .as_primitive()?
        .to_vec();
    Ok((nonce, token))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::asn1::{
            oid::{ID_CA_ECDH, ID_CA_ECDH_AES_CBC_CMAC_128, ID_PK_ECDH},
            AlgorithmIdentifier, SubjectPublicKeyInfo,
        },
        der::{asn1::BitString, Any},
        hex_literal::hex,
    };

    fn infos(
        version: u64,
        chip_public: &[u8],
    ) -> Result<(
        ChipAuthenticationInfo,
        ChipAuthenticationDomainParameterInfo,
        ChipAuthenticationPublicKeyInfo,
    )> {
        let domain = AlgorithmIdentifier::standardized(13)?;
        Ok((
            ChipAuthenticationInfo {
                protocol: ID_CA_ECDH_AES_CBC_CMAC_128,
                version,
                key_id: Some(0x41),
            },
            ChipAuthenticationDomainParameterInfo {
                protocol:         ID_CA_ECDH,
                domain_parameter: domain.clone(),
                key_id:           Some(0x41),
            },
            ChipAuthenticationPublicKeyInfo {
                protocol:                       ID_PK_ECDH,
                chip_authentication_public_key: SubjectPublicKeyInfo {
                    algorithm:          AlgorithmIdentifier {
                        algorithm:  ID_PK_ECDH,
                        parameters: Some(Any::encode_from(&domain)?),
                    },
                    subject_public_key: BitString::from_bytes(chip_public)?,
                },
                key_id:                         Some(0x41),
            },
        ))
    }

    #[test]
    fn test_construction() -> Result<()> {
        let (info, domain, key) = infos(2, &hex!("04 01"))?;
        assert!(ChipAuthentication::new(&info, &domain, Some(&key), None).is_ok());
        assert!(ChipAuthentication::new(&info, &domain, None, None).is_err());

        let v3 = ChipAuthenticationInfo { version: 3, ..info.clone() };
        assert!(ChipAuthentication::new(&v3, &domain, None, None).is_ok());
        let v4 = ChipAuthenticationInfo { version: 4, ..info.clone() };
        assert!(ChipAuthentication::new(&v4, &domain, Some(&key), None).is_err());

        let des = ChipAuthenticationInfo {
            protocol: Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.1"),
            ..info
        };
        let error = ChipAuthentication::new(&des, &domain, Some(&key), None).err();
        assert_eq!(
            error.map(|e| e.to_string()).as_deref(),
            Some("Unsupported protocol for chip authentication")
        );
        Ok(())
    }

    #[test]
    fn test_build_commands() -> Result<()> {
        let (info, domain, key) = infos(2, &hex!("04 01"))?;
        let ca = ChipAuthentication::new(&info, &domain, Some(&key), None)?;
        let terminal = ca.ephemeral_key_pair(&mut rand::thread_rng());
        let commands = ca.build_commands(&terminal.public)?;
        assert_eq!(
            commands[0].apdu,
            hex!("00 22 41 a4 0f 80 0a 04 00 7f 00 07 02 02 03 02 02 84 01 41")
        );
        assert_eq!(commands[1].apdu[..9], hex!("00 86 00 00 45 7c 43 80 41"));
        assert_eq!(commands[1].apdu[9..74], terminal.public[..]);
        assert_eq!(commands[1].apdu[74..], [0x00]);
        assert_eq!(ca.compressed_ephemeral_key(&terminal.public)?, terminal.public[1..33]);
        Ok(())
    }

    #[test]
    fn test_parse_response() -> Result<()> {
        let (nonce, token) = parse_response(&hex!("7c 0a 81 02 01 02 82 04 0a 0b 0c 0d"))?;
        assert_eq!(nonce, [1, 2]);
        assert_eq!(token, hex!("0a 0b 0c 0d"));
        assert!(parse_response(&hex!("7c 04 81 02 01 02")).is_err());
        assert!(parse_response(&hex!("7d 04 81 02 01 02")).is_err());
        Ok(())
    }

    #[test]
    fn test_version_three_response() -> Result<()> {
        let (info, domain, _) = infos(3, &hex!("04 01"))?;
        let mut ca = ChipAuthentication::new(&info, &domain, None, None)?;
        let terminal = ca.ephemeral_key_pair(&mut rand::thread_rng());
        assert!(matches!(
            ca.process_response(&terminal, &[1], &[2]),
            Err(ProtocolError::Contract(_))
        ));
        assert_eq!(ca.state(), &ChipAuthenticationState::Pending);
        Ok(())
    }
}
