//! Raw command passthrough for APDUs built outside this crate.
use {
    super::{select_responses, Command, ProtocolStep, StepResult, TransmitResult},
    crate::iso7816::ResponseApdu,
    anyhow::{ensure, Result},
    tracing::debug,
};

/// Sends the given commands unchanged and returns every response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransmitApdu;

impl ProtocolStep for TransmitApdu {
    type Output = Vec<ResponseApdu>;
    type Parameter = Vec<Command>;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        usize::MAX
    }

    fn build_commands(&self, commands: &Vec<Command>) -> Result<Vec<Command>> {
        ensure!(!commands.is_empty(), "No commands to transmit");
        for command in commands {
            ensure!(command.apdu.len() >= 4, "Command APDU without header");
            debug!("Passing through {command:?}");
        }
        Ok(commands.clone())
    }

    fn default_indices(&self, available: usize) -> Vec<usize> {
        (0..available).collect()
    }

    fn evaluate(
        &self,
        result: &TransmitResult,
        indices: Option<&[usize]>,
    ) -> StepResult<Vec<ResponseApdu>> {
        select_responses(self, result, indices)
    }
}
