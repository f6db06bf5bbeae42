//! Specific attributes and attribute requests, TR-03110-2 section 3.7.
//!
//! A terminal presents the hash of its sector public key with PRESENT USER
//! and then reads or writes data objects through GET DATA and PUT DATA.
//! Writing ends with `MSE:Set AT` restoring the session context.
use {
    super::{manage_security_environment, select_responses, Command, ProtocolError, ProtocolStep,
        StepResult, TransmitResult},
    crate::{
        asn1::{make_tag, TlvCodec},
        iso7816::{CommandApdu, ResponseApdu, StatusWord},
    },
    anyhow::{ensure, Result},
    tracing::debug,
};

const PRESENT_USER_TAG: u32 = 0x7f21;
const DISCRETIONARY_DATA_TAG: u32 = 0x73;
const SECTOR_KEY_HASH_TAG: u32 = 0x80;
const ATTRIBUTE_TAG: u32 = 0x53;
const RESTORE_SESSION_TAG: u32 = 0xe1;

/// P1-P2 of GET DATA and PUT DATA for specific attributes.
const SPECIFIC_ATTRIBUTES: (u8, u8) = (0x00, 0xff);
/// P1-P2 of GET DATA and PUT DATA for attribute requests.
const ATTRIBUTE_REQUEST: (u8, u8) = (0xff, 0x01);

/// Reads the specific attributes stored for the presented sector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadAttribute;

/// Reads the attribute request stored by the attribute terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadAttributeRequest;

/// Stores specific attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteAttribute;

/// Stores an attribute request for the presented sector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteAttributeRequest;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeRequestParameter {
    /// Hash of the terminal's sector public key.
    pub sector_key_hash:   Vec<u8>,
    /// Encoded attribute request.
    pub attribute_request: Vec<u8>,
}

/// PRESENT USER with the sector public key hash.
fn present_user(sector_key_hash: &[u8]) -> Result<Command> {
    ensure!(!sector_key_hash.is_empty(), "No sector public key hash given");
    let data = make_tag(
        PRESENT_USER_TAG,
        &make_tag(DISCRETIONARY_DATA_TAG, &make_tag(SECTOR_KEY_HASH_TAG, sector_key_hash)),
    );
    Command::new(&CommandApdu::new(0x00, 0x14, 0x00, 0x80).with_data(data), None)
}

fn get_data((p1, p2): (u8, u8)) -> Result<Command> {
    Command::new(&CommandApdu::new(0x00, 0xca, p1, p2).with_ne(256), None)
}

fn put_data((p1, p2): (u8, u8), data: Vec<u8>) -> Result<Command> {
    Command::new(&CommandApdu::new(0x00, 0xda, p1, p2).with_data(data), None)
}

/// `MSE:Set AT` restoring the session context stored after PACE.
fn restore_session() -> Result<Command> {
    let data = make_tag(RESTORE_SESSION_TAG, &make_tag(0x81u32, &[0x00]));
    Command::new(&manage_security_environment(0x01, 0xa4, data), None)
}

/// Fails unless every response is `9000`. The first one may also carry a
/// warning (`62XX`), which PRESENT USER answers with when nothing is stored
/// for the sector yet.
fn ensure_performed(responses: &[ResponseApdu], context: &'static str) -> StepResult<()> {
    for (position, response) in responses.iter().enumerate() {
        let status = response.status;
        let warning = position == 0 && status.sw1() == 0x62;
        if status != StatusWord::SUCCESS && !warning {
            return Err(ProtocolError::Card { status, context });
        }
    }
    Ok(())
}

impl ProtocolStep for ReadAttribute {
    /// Contents of the attribute objects found, in card order.
    type Output = Vec<Vec<u8>>;
    /// Hash of the terminal's sector public key.
    type Parameter = Vec<u8>;

    fn minimum_count(&self) -> usize {
        2
    }

    fn maximum_count(&self) -> usize {
        2
    }

    fn build_commands(&self, sector_key_hash: &Vec<u8>) -> Result<Vec<Command>> {
        Ok(vec![present_user(sector_key_hash)?, get_data(SPECIFIC_ATTRIBUTES)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0, 1]
    }

    fn evaluate(
        &self,
        result: &TransmitResult,
        indices: Option<&[usize]>,
    ) -> StepResult<Vec<Vec<u8>>> {
        let responses = select_responses(self, result, indices)?;
        ensure_performed(&responses, "read specific attribute not performed")?;
        let Some(response) = responses.last() else {
            return Ok(Vec::new());
        };
        let objects = TlvCodec::default()
            .parse_all(&response.data)
            .map_err(ProtocolError::Malformed)?;
        let attributes: Vec<Vec<u8>> = objects
            .iter()
            .filter(|object| object.tag().value() == DISCRETIONARY_DATA_TAG)
            .flat_map(|object| object.children(ATTRIBUTE_TAG))
            .map(|attribute| attribute.value_bytes())
            .collect();
        debug!("Read {} specific attributes", attributes.len());
        Ok(attributes)
    }
}

impl ProtocolStep for ReadAttributeRequest {
    type Output = Vec<u8>;
    type Parameter = ();

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, _parameter: &()) -> Result<Vec<Command>> {
        Ok(vec![get_data(ATTRIBUTE_REQUEST)?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<Vec<u8>> {
        let mut responses = select_responses(self, result, indices)?;
        let response = responses
            .pop()
            .ok_or_else(|| ProtocolError::Contract("no response to attribute request".into()))?;
        if response.status != StatusWord::SUCCESS {
            return Err(ProtocolError::Card {
                status:  response.status,
                context: "read attribute request not performed",
            });
        }
        Ok(response.data)
    }
}

impl ProtocolStep for WriteAttribute {
    type Output = ();
    /// Attribute contents, each stored in its own `53` object.
    type Parameter = Vec<Vec<u8>>;

    fn minimum_count(&self) -> usize {
        2
    }

    fn maximum_count(&self) -> usize {
        2
    }

    fn build_commands(&self, attributes: &Vec<Vec<u8>>) -> Result<Vec<Command>> {
        ensure!(!attributes.is_empty(), "No attributes to write");
        let data = attributes
            .iter()
            .flat_map(|attribute| make_tag(ATTRIBUTE_TAG, attribute))
            .collect();
        Ok(vec![put_data(SPECIFIC_ATTRIBUTES, data)?, restore_session()?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0, 1]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<()> {
        let responses = select_responses(self, result, indices)?;
        if let Some(response) = responses
            .iter()
            .find(|response| response.status != StatusWord::SUCCESS)
        {
            return Err(ProtocolError::Card {
                status:  response.status,
                context: "write attribute not performed",
            });
        }
        Ok(())
    }
}

impl ProtocolStep for WriteAttributeRequest {
    type Output = ();
    type Parameter = AttributeRequestParameter;

    fn minimum_count(&self) -> usize {
        3
    }

    fn maximum_count(&self) -> usize {
        3
    }

    fn build_commands(&self, parameter: &AttributeRequestParameter) -> Result<Vec<Command>> {
        ensure!(!parameter.attribute_request.is_empty(), "Empty attribute request");
        Ok(vec![
            present_user(&parameter.sector_key_hash)?,
            put_data(
                ATTRIBUTE_REQUEST,
                make_tag(ATTRIBUTE_TAG, &parameter.attribute_request),
            )?,
            restore_session()?,
        ])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0, 1, 2]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<()> {
        let responses = select_responses(self, result, indices)?;
        ensure_performed(&responses, "write attribute request not performed")
    }
}
