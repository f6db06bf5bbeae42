//! GENERATE ASYMMETRIC KEY PAIR, ISO/IEC 7816-8 section 5.1.
//!
//! Asks the chip to generate a key pair for the referenced private key and
//! returns the public key data object the chip answers with.
use {
    super::{key_reference, select_responses, Command, ProtocolError, ProtocolStep, StepResult,
        TransmitResult},
    crate::{
        asn1::make_tag,
        iso7816::{CommandApdu, StatusWord},
    },
    anyhow::Result,
    tracing::debug,
};

const PRIVATE_KEY_REFERENCE_TAG: u32 = 0x84;
const DIGITAL_SIGNATURE_TEMPLATE_TAG: u32 = 0xb6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerateKeyPair;

impl ProtocolStep for GenerateKeyPair {
    /// Public key data object, usually `7F49`.
    type Output = Vec<u8>;
    /// Private key identifier.
    type Parameter = u64;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, key_id: &u64) -> Result<Vec<Command>> {
        let reference = make_tag(PRIVATE_KEY_REFERENCE_TAG, &key_reference(*key_id));
        let apdu = CommandApdu::new(0x00, 0x47, 0x82, 0x00)
            .with_data(make_tag(DIGITAL_SIGNATURE_TEMPLATE_TAG, &reference))
            .with_ne(0x1_0000);
        Ok(vec![Command::new(&apdu, None)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<Vec<u8>> {
        let mut responses = select_responses(self, result, indices)?;
        let response = responses
            .pop()
            .ok_or_else(|| ProtocolError::Contract("no response to key generation".into()))?;
        if response.status != StatusWord::SUCCESS {
            return Err(ProtocolError::Card {
                status:  response.status,
                context: "key pair not generated",
            });
        }
        debug!("Generated public key of {} bytes", response.data.len());
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_commands() -> Result<()> {
        let commands = GenerateKeyPair.build_commands(&3)?;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].apdu, hex!("00 47 82 00 00 00 05 b6 03 84 01 03 00 00"));
        let commands = GenerateKeyPair.build_commands(&0x81)?;
        assert_eq!(commands[0].apdu[7..13], hex!("b6 04 84 02 00 81"));
        Ok(())
    }

    #[test]
    fn test_evaluate() {
        let ok: TransmitResult = Ok(vec![hex!("7f 49 03 86 01 04 9000").to_vec()]);
        assert_eq!(
            GenerateKeyPair.evaluate(&ok, None).ok(),
            Some(hex!("7f 49 03 86 01 04").to_vec())
        );
        let refused: TransmitResult = Ok(vec![hex!("6a 88").to_vec()]);
        let error = GenerateKeyPair.evaluate(&refused, None).err();
        assert_eq!(
            error.and_then(|e| e.status()),
            Some(StatusWord::REFERENCED_DATA_NOT_FOUND)
        );
        let none: TransmitResult = Ok(Vec::new());
        assert!(matches!(
            GenerateKeyPair.evaluate(&none, None),
            Err(ProtocolError::Contract(_))
        ));
    }
}
