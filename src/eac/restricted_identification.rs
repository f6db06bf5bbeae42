//! Restricted Identification, TR-03110-2 section 3.5.
//!
//! The chip hashes the shared secret of its restricted identification key
//! and a sector public key into a sector specific identifier.
use {
    super::{
        general_authenticate, key_reference, manage_security_environment, select_responses,
        Command, ProtocolError, ProtocolStep, StepResult, TransmitResult,
    },
    crate::{
        asn1::{
            make_tag,
            oid::{oid_name, ri_algorithm, RiAlgorithm},
            RestrictedIdentificationInfo, Tlv, TlvCodec,
        },
        iso7816::StatusWord,
    },
    anyhow::{anyhow, ensure, Result},
    der::asn1::ObjectIdentifier as Oid,
    tracing::debug,
};

const FIRST_KEY_TAG: u32 = 0xa0;
const SECOND_KEY_TAG: u32 = 0xa2;
const FIRST_ID_TAG: u32 = 0x81;
const SECOND_ID_TAG: u32 = 0x83;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestrictedIdentification {
    protocol:  Oid,
    key_id:    u64,
    algorithm: RiAlgorithm,
}

/// Sector public keys to compute identifiers for, at least one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiParameter {
    pub first_key:  Option<Vec<u8>>,
    pub second_key: Option<Vec<u8>>,
}

/// Sector specific identifiers returned by the chip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiOutput {
    pub first_id:  Option<Vec<u8>>,
    pub second_id: Option<Vec<u8>>,
}

impl RestrictedIdentification {
    pub fn new(protocol: Oid, key_id: u64) -> Result<Self> {
        let algorithm = ri_algorithm(&protocol)
            .ok_or_else(|| anyhow!("Unsupported protocol for restricted identification"))?;
        Ok(Self {
            protocol,
            key_id,
            algorithm,
        })
    }

    pub fn from_info(info: &RestrictedIdentificationInfo) -> Result<Self> {
        Self::new(info.protocol, info.params.key_id)
    }

    pub const fn algorithm(&self) -> RiAlgorithm {
        self.algorithm
    }
}

impl RiParameter {
    pub fn new(first_key: Option<Vec<u8>>, second_key: Option<Vec<u8>>) -> Result<Self> {
        let parameter = Self {
            first_key,
            second_key,
        };
        ensure!(parameter.key_count() > 0, "No sector public key given");
        Ok(parameter)
    }

    fn keys(&self) -> impl Iterator<Item = (u32, &[u8])> {
        [
            (FIRST_KEY_TAG, self.first_key.as_deref()),
            (SECOND_KEY_TAG, self.second_key.as_deref()),
        ]
        .into_iter()
        .filter_map(|(tag, key)| key.filter(|key| !key.is_empty()).map(|key| (tag, key)))
    }

    pub fn key_count(&self) -> usize {
        self.keys().count()
    }
}

impl ProtocolStep for RestrictedIdentification {
    type Output = RiOutput;
    type Parameter = RiParameter;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        2
    }

    fn build_commands(&self, parameter: &RiParameter) -> Result<Vec<Command>> {
        ensure!(parameter.key_count() > 0, "No sector public key given");
        debug!(
            "Restricted identification with {} for {} sector keys",
            oid_name(&self.protocol).unwrap_or("unknown protocol"),
            parameter.key_count()
        );
        let mut mse = make_tag(0x80u32, self.protocol.as_bytes());
        mse.extend(make_tag(0x84u32, &key_reference(self.key_id)));
        let mut commands = vec![Command::success_only(&manage_security_environment(
            0x41, 0xa4, mse,
        ))?];
        for (tag, key) in parameter.keys() {
            let data = make_tag(0x7cu32, &make_tag(tag, key));
            let apdu = general_authenticate(data, self.algorithm.response_length);
            commands.push(Command::success_only(&apdu)?);
        }
        Ok(commands)
    }

    /// The general authenticate responses, the last two at most.
    fn default_indices(&self, available: usize) -> Vec<usize> {
        (available.saturating_sub(2)..available).collect()
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<RiOutput> {
        let mut output = RiOutput::default();
        for response in select_responses(self, result, indices)? {
            if response.status != StatusWord::SUCCESS {
                return Err(ProtocolError::Card {
                    status:  response.status,
                    context: "restricted identification failed",
                });
            }
            if response.data.is_empty() {
                continue;
            }
            let objects = dynamic_authentication_data(&response.data)
                .map_err(ProtocolError::Malformed)?;
            for object in objects {
                let slot = match object.tag().value() {
                    FIRST_ID_TAG => &mut output.first_id,
                    SECOND_ID_TAG => &mut output.second_id,
                    _ => continue,
                };
                let id = object.value().as_primitive().map_err(ProtocolError::Malformed)?;
                *slot = Some(id.to_vec());
            }
        }
        Ok(output)
    }
}

/// Children of a `7C` template, or the top level objects without one.
pub(crate) fn dynamic_authentication_data(data: &[u8]) -> Result<Vec<Tlv>> {
    let mut objects = TlvCodec::default().parse_all(data)?;
    if let [template] = objects.as_slice() {
        if template.tag().value() == 0x7c {
            objects = template.all_children().to_vec();
        }
    }
    Ok(objects)
}
