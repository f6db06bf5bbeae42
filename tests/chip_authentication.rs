
use {
    anyhow::Result,
    der::{
        asn1::{BitString, ObjectIdentifier as Oid},
        Any,
    },
    eid_eac::{
        asn1::{
            make_tag,
            oid::{ID_CA_ECDH, ID_CA_ECDH_AES_CBC_CMAC_128, ID_PK_ECDH},
            AlgorithmIdentifier, ChipAuthenticationDomainParameterInfo, ChipAuthenticationInfo,
            ChipAuthenticationPublicKeyInfo, SubjectPublicKeyInfo,
        },
        crypto::{cmac_aes, KeyAlgorithm, KeyDerivation, KeyHandler, KeyPair, PointValidation},
        eac::{
            chip_authentication::{ChipAuthentication, ChipAuthenticationState},
            ProtocolError, TransmitResult,
        },
    },
    fixtures::success,
    hex_literal::hex,
};

// ICAO Doc 9303 part 11 appendix G.1, the final key agreement of PACE
// ECDH-GM with AES-128 on brainpoolP256r1. It runs the same ECDH, KDF and
// token computation as chip authentication, without a nonce.
const PACE_ECDH_GM_AES_128: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.4.2.2");
const TERMINAL_SK: [u8; 32] = hex!(
    "A73FB703 AC1436A1 8E0CFA5A BB3F7BEC 7A070E7A 6788486B EE230C4A 22762595"
);
const TERMINAL_PK: [u8; 65] = hex!(
    "04 2D B7 A6 4C 03 55 04 4E C9 DF 19 05 14 C6 25 CB A2 CE A4 87 54 88 71 22 F3 A5 EF 0D"
    "5E DD 30 1C 35 56 F3 B3 B1 86 DF 10 B8 57 B5 8F 6A 7E B8 0F 20 BA 5D C7 BE 1D 43 D9 BF"
    "85 01 49 FB B3 64 62"
);
const CHIP_PK: [u8; 65] = hex!(
    "04 9E 88 0F 84 29 05 B8 B3 18 1F 7A F7 CA A9 F0 EF B7 43 84 7F 44 A3 06 D2 D2 8C 1D 9E"
    "C6 5D F6 DB 77 64 B2 22 77 A2 ED DC 3C 26 5A 9F 01 8F 9C B8 52 E1 11 B7 68 B3 26 90 4B"
    "59 A0 19 37 76 F0 94"
);
const SHARED_SECRET: [u8; 32] = hex!(
    "28768D20 701247DA E81804C9 E780EDE5 82A9996D B4A31502 0B273319 7DB84925"
);
const K_ENC: [u8; 16] = hex!("F5F0E35C 0D7161EE 6724EE51 3A0D9A7F");
const K_MAC: [u8; 16] = hex!("FE251C78 58B356B2 4514B3BD 5F4297D1");
/// Token over the terminal key, sent by the chip.
const CHIP_TOKEN: [u8; 8] = hex!("3A BB 96 74 BC E9 3C 08");
/// Token over the chip key, sent by the terminal.
const TERMINAL_TOKEN: [u8; 8] = hex!("C2 B0 BD 78 D9 4B A8 66");

struct Chip {
    handler:  Box<dyn KeyHandler>,
    key_pair: KeyPair,
}

impl Chip {
    fn new() -> Result<Self> {
        let curve = AlgorithmIdentifier::standardized(13)?.domain_parameters()?;
        let handler = KeyAlgorithm::Ec(curve).key_handler();
        let key_pair = handler.generate_key_pair(&mut rand::thread_rng());
        Ok(Self { handler, key_pair })
    }

    /// Nonce and token for the terminal's ephemeral key.
    fn respond(&self, terminal: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        let terminal = self.handler.build_public_key(terminal)?;
        let shared = self.handler.shared_secret(&self.key_pair.private, &terminal)?;
        let mac = KeyDerivation::new(128)?.derive_mac(&shared, Some(nonce))?;
        let input =
            self.handler
                .convert_public_key(&terminal, ID_CA_ECDH_AES_CBC_CMAC_128, false)?;
        let token = cmac_aes(&mac, &input)?;
        let body = [make_tag(0x81u32, nonce), make_tag(0x82u32, &token)].concat();
        Ok(make_tag(0x7cu32, &body))
    }

    fn ca(&self) -> Result<ChipAuthentication> {
        chip_authentication(&self.key_pair.public)
    }
}

/// CA version 2 with AES-128 on brainpoolP256r1 against `chip_public`.
fn chip_authentication(chip_public: &[u8]) -> Result<ChipAuthentication> {
    let domain = AlgorithmIdentifier::standardized(13)?;
    let info = ChipAuthenticationInfo {
        protocol: ID_CA_ECDH_AES_CBC_CMAC_128,
        version:  2,
        key_id:   None,
    };
    let domain_info = ChipAuthenticationDomainParameterInfo {
        protocol:         ID_CA_ECDH,
        domain_parameter: domain.clone(),
        key_id:           None,
    };
    let public_key = ChipAuthenticationPublicKeyInfo {
        protocol:                       ID_PK_ECDH,
        chip_authentication_public_key: SubjectPublicKeyInfo {
            algorithm:          AlgorithmIdentifier {
                algorithm:  ID_PK_ECDH,
                parameters: Some(Any::encode_from(&domain)?),
            },
            subject_public_key: BitString::from_bytes(chip_public)?,
        },
        key_id:                         None,
    };
    ChipAuthentication::new(&info, &domain_info, Some(&public_key), None)
}

#[test]
fn test_reference_key_agreement() -> Result<()> {
    let curve = AlgorithmIdentifier::standardized(13)?.domain_parameters()?;
    let handler = KeyAlgorithm::Ec(curve).key_handler();
    let terminal = handler.key_pair_from_private(&TERMINAL_SK)?;
    let chip_key = handler.build_public_key(&CHIP_PK)?;
    let shared = handler.shared_secret(&terminal.private, &chip_key)?;
    assert_eq!(shared, SHARED_SECRET);

    let kdf = KeyDerivation::new(128)?;
    let enc = kdf.derive_enc(&shared, None)?;
    let mac = kdf.derive_mac(&shared, None)?;
    assert_eq!(enc.as_bytes(), K_ENC);
    assert_eq!(mac.as_bytes(), K_MAC);

    let terminal_key = handler.build_public_key(&TERMINAL_PK)?;
    let input = handler.convert_public_key(&terminal_key, PACE_ECDH_GM_AES_128, false)?;
    assert_eq!(input[..4], hex!("7f 49 4f 06"));
    assert_eq!(cmac_aes(&mac, &input)?, CHIP_TOKEN);
    let input = handler.convert_public_key(&chip_key, PACE_ECDH_GM_AES_128, false)?;
    assert_eq!(cmac_aes(&mac, &input)?, TERMINAL_TOKEN);
    Ok(())
}

#[test]
fn test_successful_authentication() -> Result<()> {
    let chip = Chip::new()?;
    let mut ca = chip.ca()?;
    let terminal = ca.ephemeral_key_pair(&mut rand::thread_rng());
    let commands = ca.build_commands(&terminal.public)?;
    assert_eq!(commands.len(), 2);
    assert_eq!(
        commands[0].apdu,
        hex!("00 22 41 a4 0c 80 0a 04 00 7f 00 07 02 02 03 02 02")
    );

    let nonce = hex!("01 02 03 04 05 06 07 08");
    let result: TransmitResult = Ok(vec![
        hex!("9000").to_vec(),
        success(&chip.respond(&terminal.public, &nonce)?),
    ]);
    ca.evaluate(&terminal, &result)?;

    let keys = ca.keys().cloned();
    let shared = chip.handler.shared_secret(
        &chip.key_pair.private,
        &chip.handler.build_public_key(&terminal.public)?,
    )?;
    let kdf = KeyDerivation::new(128)?;
    assert_eq!(
        keys.as_ref().map(|keys| keys.enc.clone()),
        Some(kdf.derive_enc(&shared, Some(&nonce))?)
    );
    assert_eq!(keys.map(|keys| keys.mac), Some(kdf.derive_mac(&shared, Some(&nonce))?));

    assert!(matches!(
        ca.evaluate(&terminal, &result),
        Err(ProtocolError::Contract(_))
    ));
    Ok(())
}

#[test]
fn test_wrong_token() -> Result<()> {
    let chip = Chip::new()?;
    let mut ca = chip.ca()?;
    let terminal = ca.ephemeral_key_pair(&mut rand::thread_rng());
    let mut response = chip.respond(&terminal.public, &hex!("aa bb"))?;
    let last = response.len() - 1;
    response[last] ^= 0x01;
    let result: TransmitResult = Ok(vec![hex!("9000").to_vec(), success(&response)]);
    assert!(matches!(
        ca.evaluate(&terminal, &result),
        Err(ProtocolError::Verification("chip authentication failed"))
    ));
    assert_eq!(ca.state(), &ChipAuthenticationState::Failed);
    assert!(ca.into_keys().is_none());
    Ok(())
}

#[test]
fn test_card_refuses() -> Result<()> {
    let chip = Chip::new()?;
    let mut ca = chip.ca()?;
    let terminal = ca.ephemeral_key_pair(&mut rand::thread_rng());
    let result: TransmitResult = Ok(vec![hex!("9000").to_vec(), hex!("6300").to_vec()]);
    let error = ca.evaluate(&terminal, &result).err();
    assert_eq!(error.and_then(|e| e.status()).map(|s| s.to_bytes()), Some([0x63, 0x00]));
    assert_eq!(ca.state(), &ChipAuthenticationState::Failed);
    Ok(())
}

#[test]
fn test_other_ephemeral_key() -> Result<()> {
    let chip = Chip::new()?;
    let mut ca = chip.ca()?;
    let mut rng = rand::thread_rng();
    let terminal = ca.ephemeral_key_pair(&mut rng);
    let other = ca.ephemeral_key_pair(&mut rng);
    let response = chip.respond(&other.public, &hex!("01"))?;
    let result: TransmitResult = Ok(vec![success(&response)]);
    assert!(ca.evaluate(&terminal, &result).is_err());
    assert!(ca.keys().is_none());
    Ok(())
}

#[test]
fn test_point_validation() -> Result<()> {
    let chip = Chip::new()?;
    let mut off_curve = chip.key_pair.public.to_vec();
    off_curve[64] ^= 0x01;
    let nonce = hex!("01 02 03 04");
    let token = hex!("00 11 22 33 44 55 66 77");

    let mut strict = chip_authentication(&off_curve)?;
    let terminal = strict.ephemeral_key_pair(&mut rand::thread_rng());
    assert!(matches!(
        strict.process_response(&terminal, &nonce, &token),
        Err(ProtocolError::Malformed(_))
    ));

    let mut trusting =
        chip_authentication(&off_curve)?.with_point_validation(PointValidation::Trust);
    assert!(matches!(
        trusting.process_response(&terminal, &nonce, &token),
        Err(ProtocolError::Verification(_))
    ));
    assert_eq!(trusting.state(), &ChipAuthenticationState::Failed);
    Ok(())
}
