//! Extended Access Control sub-protocols as command builders and response
//! evaluators.
//!
//! Every sub-protocol implements [`ProtocolStep`]: it turns a typed parameter
//! into a list of [`Command`]s and turns the card's responses back into a
//! typed [`StepResult`]. How the commands reach the card is up to the caller,
//! either directly or through [`run`] with a [`Transport`].

pub mod attribute;
pub mod chip_authentication;
mod error;
pub mod generate_key_pair;
pub mod pseudonymous_signature;
pub mod read;
pub mod restricted_identification;
pub mod select;
pub mod transmit;
pub mod update;

pub use self::error::{ProtocolError, StepResult, TransportError};
use {
    crate::iso7816::{CommandApdu, ResponseApdu, StatusWord},
    anyhow::Result,
    std::fmt::{self, Debug, Formatter},
    tracing::{debug, warn},
};

/// Response bytes per command, each ending in the status word.
pub type TransmitResult = Result<Vec<Vec<u8>>, TransportError>;

/// An encoded command APDU with the status words the card may answer with.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    pub apdu:     Vec<u8>,
    /// `None` accepts every status word.
    pub accepted: Option<Vec<StatusWord>>,
}

pub trait ProtocolStep {
    type Parameter;
    type Output;

    /// Smallest number of responses [`ProtocolStep::evaluate`] needs.
    fn minimum_count(&self) -> usize;

    /// Largest number of response indices [`ProtocolStep::evaluate`] takes.
    fn maximum_count(&self) -> usize;

    fn build_commands(&self, parameter: &Self::Parameter) -> Result<Vec<Command>>;

    /// Indices evaluated when the caller passes none.
    fn default_indices(&self, available: usize) -> Vec<usize>;

    fn evaluate(
        &self,
        result: &TransmitResult,
        indices: Option<&[usize]>,
    ) -> StepResult<Self::Output>;
}

/// Sends command lists to a card and returns one response per command.
///
/// A transport may stop after the first response whose status word is not
/// in the command's accept-list.
pub trait Transport {
    fn send(&mut self, commands: &[Command]) -> TransmitResult;
}

impl Command {
    pub fn new(apdu: &CommandApdu, accepted: Option<Vec<StatusWord>>) -> Result<Self> {
        Ok(Self {
            apdu: apdu.to_bytes()?,
            accepted,
        })
    }

    /// A command that fails on anything but `9000`.
    pub fn success_only(apdu: &CommandApdu) -> Result<Self> {
        Self::new(apdu, Some(accept_success_only()))
    }

    pub fn accepts(&self, status: StatusWord) -> bool {
        self.accepted
            .as_ref()
            .map_or(true, |accepted| accepted.contains(&status))
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("apdu", &hex::encode_upper(&self.apdu))
            .field("accepted", &self.accepted)
            .finish()
    }
}

pub fn accept_success_only() -> Vec<StatusWord> {
    vec![StatusWord::SUCCESS]
}

/// Validates the response indices handed to an evaluator.
///
/// At least `minimum` responses must be available, between one and
/// `maximum` indices must be given, and each must address a response.
pub fn check_indices(
    responses: &[Vec<u8>],
    indices: &[usize],
    minimum: usize,
    maximum: usize,
) -> StepResult<()> {
    if responses.len() < minimum {
        return Err(ProtocolError::Contract(format!(
            "{} responses available, at least {minimum} required",
            responses.len()
        )));
    }
    if indices.is_empty() || indices.len() > maximum {
        return Err(ProtocolError::Contract(format!(
            "{} response indices given, expected 1 to {maximum}",
            indices.len()
        )));
    }
    if let Some(index) = indices.iter().find(|&&index| index >= responses.len()) {
        return Err(ProtocolError::Contract(format!(
            "response index {index} out of range for {} responses",
            responses.len()
        )));
    }
    Ok(())
}

/// Resolves the indices for `step`, checks them and parses the addressed
/// responses in index order.
pub fn select_responses<S: ProtocolStep + ?Sized>(
    step: &S,
    result: &TransmitResult,
    indices: Option<&[usize]>,
) -> StepResult<Vec<ResponseApdu>> {
    let responses = result.as_ref().map_err(|error| ProtocolError::Transport(error.clone()))?;
    let defaults;
    let indices = match indices {
        Some(indices) => indices,
        None => {
            defaults = step.default_indices(responses.len());
            &defaults
        }
    };
    check_indices(responses, indices, step.minimum_count(), step.maximum_count())?;
    indices
        .iter()
        .map(|&index| ResponseApdu::parse(&responses[index]).map_err(ProtocolError::Malformed))
        .collect()
}

/// Builds the commands of `step`, sends them and evaluates the responses.
///
/// Responses are checked against the accept-lists before evaluation; the
/// first rejected status word ends the step.
pub fn run<S, T>(step: &S, parameter: &S::Parameter, transport: &mut T) -> StepResult<S::Output>
where
    S: ProtocolStep + ?Sized,
    T: Transport + ?Sized,
{
    let commands = step.build_commands(parameter).map_err(ProtocolError::Build)?;
    debug!("Sending {} commands", commands.len());
    let result = transport.send(&commands);
    if let Ok(responses) = &result {
        for (command, response) in commands.iter().zip(responses) {
            let status = StatusWord::from_response(response).ok_or_else(|| {
                ProtocolError::Malformed(anyhow::anyhow!("Response without status word"))
            })?;
            if !command.accepts(status) {
                warn!("Card rejected command {command:?} with {status}");
                return Err(ProtocolError::Card {
                    status,
                    context: "status word not accepted",
                });
            }
        }
        if responses.len() != commands.len() {
            return Err(TransportError::new(format!(
                "{} responses to {} commands",
                responses.len(),
                commands.len()
            ))
            .into());
        }
    }
    step.evaluate(&result, None)
}

/// Key reference for `MSE:Set` as minimal two's complement big-endian bytes.
pub fn key_reference(key_id: u64) -> Vec<u8> {
    let bytes = key_id.to_be_bytes();
    let skip = bytes.iter().take(7).take_while(|&&b| b == 0).count();
    let mut reference = bytes[skip..].to_vec();
    if reference.first().is_some_and(|b| b & 0x80 != 0) {
        reference.insert(0, 0);
    }
    reference
}

/// `MSE:Set` with the given P1 and P2, ISO/IEC 7816-4 section 7.5.11.
pub(crate) fn manage_security_environment(p1: u8, p2: u8, data: Vec<u8>) -> CommandApdu {
    CommandApdu::new(0x00, 0x22, p1, p2).with_data(data)
}

/// GENERAL AUTHENTICATE, single command.
pub(crate) fn general_authenticate(data: Vec<u8>, ne: usize) -> CommandApdu {
    CommandApdu::new(0x00, 0x86, 0x00, 0x00)
        .with_data(data)
        .with_ne(ne)
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    struct Echo;

    impl ProtocolStep for Echo {
        type Output = Vec<Vec<u8>>;
        type Parameter = usize;

        fn minimum_count(&self) -> usize {
            1
        }

        fn maximum_count(&self) -> usize {
            2
        }

        fn build_commands(&self, count: &usize) -> Result<Vec<Command>> {
            (0..*count)
                .map(|_| Command::success_only(&CommandApdu::new(0, 0xca, 0, 0).with_ne(256)))
                .collect()
        }

        fn default_indices(&self, available: usize) -> Vec<usize> {
            (0..available.min(2)).collect()
        }

        fn evaluate(
            &self,
            result: &TransmitResult,
            indices: Option<&[usize]>,
        ) -> StepResult<Self::Output> {
            Ok(select_responses(self, result, indices)?
                .into_iter()
                .map(|response| response.data)
                .collect())
        }
    }

    struct Card(Vec<Vec<u8>>);

    impl Transport for Card {
        fn send(&mut self, commands: &[Command]) -> TransmitResult {
            Ok(self.0.iter().take(commands.len()).cloned().collect())
        }
    }

    #[test]
    fn test_check_indices() {
        let responses = vec![hex!("9000").to_vec(), hex!("01 9000").to_vec()];
        assert!(check_indices(&responses, &[0], 1, 1).is_ok());
        assert!(check_indices(&responses, &[1, 0], 1, 2).is_ok());
        assert!(check_indices(&responses, &[1], 2, 2).is_ok());
        assert!(matches!(
            check_indices(&responses, &[], 1, 2),
            Err(ProtocolError::Contract(_))
        ));
        assert!(check_indices(&responses, &[0, 1], 1, 1).is_err());
        assert!(check_indices(&responses, &[2], 1, 2).is_err());
        assert!(check_indices(&responses[..1], &[0], 2, 2).is_err());
    }

    #[test]
    fn test_key_reference() {
        assert_eq!(key_reference(0), [0x00]);
        assert_eq!(key_reference(8), [0x08]);
        assert_eq!(key_reference(0x80), [0x00, 0x80]);
        assert_eq!(key_reference(0x0102), [0x01, 0x02]);
        assert_eq!(key_reference(u64::MAX), [0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_run() {
        let mut card = Card(vec![hex!("01 02 9000").to_vec(), hex!("03 9000").to_vec()]);
        let output = run(&Echo, &2, &mut card);
        assert_eq!(output.ok(), Some(vec![vec![1, 2], vec![3]]));

        let mut card = Card(vec![hex!("6982").to_vec()]);
        let error = run(&Echo, &1, &mut card).err();
        assert_eq!(error.and_then(|e| e.status()), Some(StatusWord::ACCESS_DENIED));

        let mut card = Card(vec![hex!("9000").to_vec()]);
        assert!(matches!(run(&Echo, &2, &mut card), Err(ProtocolError::Transport(_))));
    }

    #[test]
    fn test_transport_failure() {
        let result: TransmitResult = Err(TransportError::new("reader removed"));
        assert!(matches!(Echo.evaluate(&result, None), Err(ProtocolError::Transport(_))));
    }

    #[test]
    fn test_command_debug() -> Result<()> {
        let command = Command::success_only(&CommandApdu::new(0, 0xa4, 4, 0x0c))?;
        assert_eq!(command.apdu, hex!("00 a4 04 0c"));
        assert!(command.accepts(StatusWord::SUCCESS));
        assert!(!command.accepts(StatusWord::FILE_NOT_FOUND));
        assert!(format!("{command:?}").contains("00A4040C"));
        Ok(())
    }
}
