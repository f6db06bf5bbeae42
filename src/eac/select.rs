//! SELECT of applications and elementary files, ISO/IEC 7816-4 section 11.2.2.
use {
    super::{select_responses, Command, ProtocolStep, StepResult, TransmitResult},
    crate::{
        asn1::{Tlv, TlvCodec},
        iso7816::{CommandApdu, StatusWord},
    },
    anyhow::{ensure, Result},
    tracing::debug,
};

/// Selects a dedicated file by DF name or application identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectApplication;

/// Selects an elementary file by its two byte file identifier, optionally
/// asking for the file control parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectFile {
    pub fcp: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectResult {
    pub selected: bool,
    /// Raw FCP template, only present when requested and selected.
    pub fcp:      Option<Vec<u8>>,
}

impl SelectResult {
    /// Parses the FCP template (`62`).
    pub fn fcp_template(&self) -> Option<Result<Tlv>> {
        self.fcp.as_deref().map(|fcp| TlvCodec::default().parse(fcp))
    }
}

impl ProtocolStep for SelectApplication {
    type Output = bool;
    /// DF name or application identifier.
    type Parameter = Vec<u8>;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, id: &Vec<u8>) -> Result<Vec<Command>> {
        ensure!(
            (1..=16).contains(&id.len()),
            "Application identifier must be 1 to 16 bytes"
        );
        let apdu = CommandApdu::new(0x00, 0xa4, 0x04, 0x0c).with_data(id.clone());
        Ok(vec![Command::new(&apdu, None)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<bool> {
        let responses = select_responses(self, result, indices)?;
        let selected = responses.iter().all(|response| response.status == StatusWord::SUCCESS);
        debug!("Application selected: {selected}");
        Ok(selected)
    }
}

impl ProtocolStep for SelectFile {
    type Output = SelectResult;
    type Parameter = [u8; 2];

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, fid: &[u8; 2]) -> Result<Vec<Command>> {
        let apdu = if self.fcp {
            CommandApdu::new(0x00, 0xa4, 0x02, 0x04)
                .with_data(fid.to_vec())
                .with_ne(256)
        } else {
            CommandApdu::new(0x00, 0xa4, 0x02, 0x0c).with_data(fid.to_vec())
        };
        Ok(vec![Command::new(&apdu, None)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(
        &self,
        result: &TransmitResult,
        indices: Option<&[usize]>,
    ) -> StepResult<SelectResult> {
        let mut responses = select_responses(self, result, indices)?;
        let Some(response) = responses.pop() else {
            return Ok(SelectResult::default());
        };
        let selected = response.status == StatusWord::SUCCESS;
        if !selected {
            debug!("File not selected: {}", response.status);
        }
        Ok(SelectResult {
            selected,
            fcp: (selected && self.fcp).then_some(response.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::eac::TransportError, hex_literal::hex};

    #[test]
    fn test_select_application() -> Result<()> {
        let aid = hex!("e8 07 04 00 7f 00 07 03 02").to_vec();
        let commands = SelectApplication.build_commands(&aid)?;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].apdu, hex!("00 a4 04 0c 09 e8 07 04 00 7f 00 07 03 02"));
        assert!(commands[0].accepts(StatusWord::FILE_NOT_FOUND));
        assert!(SelectApplication.build_commands(&Vec::new()).is_err());

        let ok: TransmitResult = Ok(vec![hex!("9000").to_vec()]);
        assert!(matches!(SelectApplication.evaluate(&ok, None), Ok(true)));
        let missing: TransmitResult = Ok(vec![hex!("6a82").to_vec()]);
        assert!(matches!(SelectApplication.evaluate(&missing, None), Ok(false)));
        Ok(())
    }

    #[test]
    fn test_select_file() -> Result<()> {
        let plain = SelectFile { fcp: false }.build_commands(&hex!("01 1c"))?;
        assert_eq!(plain[0].apdu, hex!("00 a4 02 0c 02 01 1c"));
        let with_fcp = SelectFile { fcp: true }.build_commands(&hex!("01 1c"))?;
        assert_eq!(with_fcp[0].apdu, hex!("00 a4 02 04 02 01 1c 00"));
        assert_eq!(with_fcp[0].accepted, None);
        Ok(())
    }

    #[test]
    fn test_select_file_result() -> Result<()> {
        let step = SelectFile { fcp: true };
        let ok: TransmitResult = Ok(vec![hex!("62 04 80 02 01 00 9000").to_vec()]);
        let result = step.evaluate(&ok, None)?;
        assert!(result.selected);
        assert_eq!(result.fcp.as_deref(), Some(&hex!("62 04 80 02 01 00")[..]));
        let template = result.fcp_template().transpose()?;
        let size = template.as_ref().and_then(|fcp| fcp.child(0x80u32));
        assert_eq!(size.map(Tlv::value_bytes), Some(vec![0x01, 0x00]));

        let failed: TransmitResult = Ok(vec![hex!("6a82").to_vec()]);
        let result = step.evaluate(&failed, None)?;
        assert_eq!(result, SelectResult::default());

        let without: TransmitResult = Ok(vec![hex!("62 04 80 02 01 00 9000").to_vec()]);
        let result = SelectFile { fcp: false }.evaluate(&without, None)?;
        assert!(result.selected);
        assert_eq!(result.fcp, None);

        let lost: TransmitResult = Err(TransportError::new("card removed"));
        assert!(step.evaluate(&lost, None).is_err());
        Ok(())
    }
}
