//! UPDATE BINARY, ISO/IEC 7816-4 section 11.3.5.
use {
    super::{read::offset_parameters, select_responses, Command, ProtocolStep, StepResult,
        TransmitResult},
    crate::iso7816::{CommandApdu, StatusWord},
    anyhow::{ensure, Result},
    tracing::debug,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateBinary;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateParameter {
    pub offset: u16,
    pub data:   Vec<u8>,
    pub sfi:    Option<u8>,
}

impl ProtocolStep for UpdateBinary {
    /// Whether the card wrote the data.
    type Output = bool;
    type Parameter = UpdateParameter;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, parameter: &UpdateParameter) -> Result<Vec<Command>> {
        ensure!(!parameter.data.is_empty(), "Nothing to write");
        let (p1, p2) = offset_parameters(parameter.offset, parameter.sfi)?;
        let apdu = CommandApdu::new(0x00, 0xd6, p1, p2).with_data(parameter.data.clone());
        Ok(vec![Command::new(&apdu, None)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<bool> {
        let responses = select_responses(self, result, indices)?;
        let written = responses.iter().all(|response| response.status == StatusWord::SUCCESS);
        if !written {
            debug!("Update binary rejected");
        }
        Ok(written)
    }
}
