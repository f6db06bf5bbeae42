//! READ BINARY, ISO/IEC 7816-4 section 11.3.3.
use {
    super::{select_responses, Command, ProtocolError, ProtocolStep, StepResult, TransmitResult},
    crate::iso7816::{CommandApdu, StatusWord},
    anyhow::{ensure, Result},
    tracing::debug,
};

/// Largest offset addressable with P1-P2 in the even instruction.
pub const MAX_OFFSET: u16 = 0x7fff;

/// Largest offset addressable together with a short file identifier.
pub const MAX_SFI_OFFSET: u16 = 0xff;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadBinary;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadParameter {
    pub offset: u16,
    /// Number of bytes to read, `0` reads up to 256.
    pub length: usize,
    /// Short file identifier, reads the current EF when absent.
    pub sfi:    Option<u8>,
}

impl ReadParameter {
    pub const fn new(offset: u16, length: usize) -> Self {
        Self {
            offset,
            length,
            sfi: None,
        }
    }

    #[must_use]
    pub const fn with_sfi(mut self, sfi: u8) -> Self {
        self.sfi = Some(sfi);
        self
    }
}

/// P1-P2 for READ BINARY and UPDATE BINARY with an optional SFI.
pub(crate) fn offset_parameters(offset: u16, sfi: Option<u8>) -> Result<(u8, u8)> {
    let [high, low] = offset.to_be_bytes();
    match sfi {
        Some(sfi) => {
            ensure!((1..=30).contains(&sfi), "Short file identifier {sfi} out of range");
            ensure!(offset <= MAX_SFI_OFFSET, "Offset {offset} too large with SFI");
            Ok((0x80 | sfi, low))
        }
        None => {
            ensure!(offset <= MAX_OFFSET, "Offset {offset} too large");
            Ok((high, low))
        }
    }
}

impl ProtocolStep for ReadBinary {
    type Output = Vec<u8>;
    type Parameter = ReadParameter;

    fn minimum_count(&self) -> usize {
        1
    }

    fn maximum_count(&self) -> usize {
        1
    }

    fn build_commands(&self, parameter: &ReadParameter) -> Result<Vec<Command>> {
        ensure!(parameter.length <= 0x1_0000, "Read length {} too large", parameter.length);
        let (p1, p2) = offset_parameters(parameter.offset, parameter.sfi)?;
        let ne = match parameter.length {
            0 => 256,
            length => length,
        };
        let apdu = CommandApdu::new(0x00, 0xb0, p1, p2).with_ne(ne);
        Ok(vec![Command::new(&apdu, Some(vec![
            StatusWord::SUCCESS,
            StatusWord::END_OF_FILE,
        ]))?])
    }

    fn default_indices(&self, _available: usize) -> Vec<usize> {
        vec![0]
    }

    fn evaluate(&self, result: &TransmitResult, indices: Option<&[usize]>) -> StepResult<Vec<u8>> {
        let mut responses = select_responses(self, result, indices)?;
        let response = responses
            .pop()
            .ok_or_else(|| ProtocolError::Contract("no response to read".into()))?;
        match response.status {
            StatusWord::SUCCESS => Ok(response.data),
            StatusWord::END_OF_FILE => {
                debug!("End of file after {} bytes", response.data.len());
                Ok(response.data)
            }
            status @ (StatusWord::FILE_NOT_FOUND | StatusWord::COMMAND_NOT_ALLOWED) => {
                Err(ProtocolError::Card {
                    status,
                    context: "file not found",
                })
            }
            status => Err(ProtocolError::Card {
                status,
                context: "read binary failed",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_commands() -> Result<()> {
        let commands = ReadBinary.build_commands(&ReadParameter::new(0, 0))?;
        assert_eq!(commands[0].apdu, hex!("00 b0 00 00 00"));
        let commands = ReadBinary.build_commands(&ReadParameter::new(0x0123, 0x20))?;
        assert_eq!(commands[0].apdu, hex!("00 b0 01 23 20"));
        let commands = ReadBinary.build_commands(&ReadParameter::new(4, 0).with_sfi(0x1d))?;
        assert_eq!(commands[0].apdu, hex!("00 b0 9d 04 00"));
        let commands = ReadBinary.build_commands(&ReadParameter::new(0, 0x1_0000))?;
        assert_eq!(commands[0].apdu, hex!("00 b0 00 00 00 00 00"));
        assert!(commands[0].accepts(StatusWord::END_OF_FILE));

        assert!(ReadBinary.build_commands(&ReadParameter::new(0x8000, 1)).is_err());
        assert!(ReadBinary.build_commands(&ReadParameter::new(0x100, 1).with_sfi(1)).is_err());
        assert!(ReadBinary.build_commands(&ReadParameter::new(0, 1).with_sfi(31)).is_err());
        assert!(ReadBinary.build_commands(&ReadParameter::new(0, 0x1_0001)).is_err());
        Ok(())
    }

    #[test]
    fn test_evaluate() -> Result<()> {
        let full: TransmitResult = Ok(vec![hex!("01 02 03 9000").to_vec()]);
        assert_eq!(ReadBinary.evaluate(&full, None)?, [1, 2, 3]);
        let short: TransmitResult = Ok(vec![hex!("01 6282").to_vec()]);
        assert_eq!(ReadBinary.evaluate(&short, None)?, [1]);

        let missing: TransmitResult = Ok(vec![hex!("6a82").to_vec()]);
        let error = ReadBinary.evaluate(&missing, None).err();
        assert_eq!(error.and_then(|e| e.status()), Some(StatusWord::FILE_NOT_FOUND));
        let denied: TransmitResult = Ok(vec![hex!("6982").to_vec()]);
        assert!(matches!(
            ReadBinary.evaluate(&denied, None),
            Err(ProtocolError::Card {
                context: "read binary failed",
                ..
            })
        ));
        let truncated: TransmitResult = Ok(vec![hex!("90").to_vec()]);
        assert!(matches!(
            ReadBinary.evaluate(&truncated, None),
            Err(ProtocolError::Malformed(_))
        ));
        Ok(())
    }
}
