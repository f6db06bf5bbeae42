//! Command and response APDUs, ISO/IEC 7816-3 section 12.1 and 7816-4
//! section 5.1.
use {
    super::StatusWord,
    anyhow::{ensure, Result},
    bytes::BufMut,
    std::fmt::{self, Debug, Formatter},
};

const SHORT_MAX_LC: usize = 0xff;
const SHORT_MAX_NE: usize = 0x100;
const EXTENDED_MAX_LC: usize = 0xffff;
const EXTENDED_MAX_NE: usize = 0x1_0000;

/// A command APDU prior to encoding.
///
/// The length fields are derived on encoding. Short form is used unless the
/// data exceeds 255 bytes or more than 256 response bytes are expected.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CommandApdu {
    pub cla:  u8,
    pub ins:  u8,
    pub p1:   u8,
    pub p2:   u8,
    pub data: Vec<u8>,
    /// Maximum number of response data bytes expected, `Ne`.
    pub ne:   Option<usize>,
}

/// A response APDU split into data and status word.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResponseApdu {
    pub data:   Vec<u8>,
    pub status: StatusWord,
}

impl CommandApdu {
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            ne: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    #[must_use]
    pub const fn with_ne(mut self, ne: usize) -> Self {
        self.ne = Some(ne);
        self
    }

    pub fn is_extended(&self) -> bool {
        self.data.len() > SHORT_MAX_LC || self.ne.is_some_and(|ne| ne > SHORT_MAX_NE)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        ensure!(
            self.data.len() <= EXTENDED_MAX_LC,
            "Command data of {} bytes exceeds {EXTENDED_MAX_LC}",
            self.data.len()
        );
        if let Some(ne) = self.ne {
            ensure!(
                (1..=EXTENDED_MAX_NE).contains(&ne),
                "Expected response length {ne} out of range"
            );
        }
        let extended = self.is_extended();
        let mut buffer = Vec::with_capacity(self.data.len() + 9);
        buffer.put_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.data.is_empty() {
            if extended {
                buffer.put_u8(0);
                buffer.put_u16(self.data.len() as u16);
            } else {
                buffer.put_u8(self.data.len() as u8);
            }
            buffer.put_slice(&self.data);
        }
        if let Some(ne) = self.ne {
            // Ne at its maximum wraps to zero in both forms.
            if extended {
                if self.data.is_empty() {
                    buffer.put_u8(0);
                }
                buffer.put_u16((ne % EXTENDED_MAX_NE) as u16);
            } else {
                buffer.put_u8((ne % SHORT_MAX_NE) as u8);
            }
        }
        Ok(buffer)
    }
}

impl Debug for CommandApdu {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandApdu {{ {:02X} {:02X} {:02X} {:02X}, data: {}, ne: {:?} }}",
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            hex::encode(&self.data),
            self.ne
        )
    }
}

impl ResponseApdu {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= 2, "Response APDU of {} bytes", bytes.len());
        let (data, trailer) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            data:   data.to_vec(),
            status: StatusWord::new(trailer[0], trailer[1]),
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_cases() -> Result<()> {
        let header = CommandApdu::new(0x00, 0xa4, 0x02, 0x0c);
        // Case 1
        assert_eq!(header.to_bytes()?, hex!("00 a4 02 0c"));
        // Case 2S
        assert_eq!(header.clone().with_ne(256).to_bytes()?, hex!("00 a4 02 0c 00"));
        assert_eq!(header.clone().with_ne(0x18).to_bytes()?, hex!("00 a4 02 0c 18"));
        // Case 2E
        assert_eq!(
            header.clone().with_ne(65536).to_bytes()?,
            hex!("00 a4 02 0c 00 00 00")
        );
        assert_eq!(
            header.clone().with_ne(257).to_bytes()?,
            hex!("00 a4 02 0c 00 01 01")
        );
        // Case 3S
        assert_eq!(
            header.clone().with_data(hex!("01 1c")).to_bytes()?,
            hex!("00 a4 02 0c 02 01 1c")
        );
        // Case 4S
        assert_eq!(
            header.clone().with_data(hex!("01 1c")).with_ne(256).to_bytes()?,
            hex!("00 a4 02 0c 02 01 1c 00")
        );
        // Case 4E triggered by Ne
        assert_eq!(
            header.clone().with_data(hex!("01 1c")).with_ne(65536).to_bytes()?,
            hex!("00 a4 02 0c 00 00 02 01 1c 00 00")
        );
        Ok(())
    }

    #[test]
    fn test_extended_data() -> Result<()> {
        let data = vec![0x5a; 300];
        let bytes = CommandApdu::new(0x00, 0xd6, 0x00, 0x00)
            .with_data(data.clone())
            .to_bytes()?;
        assert_eq!(bytes[..7], hex!("00 d6 00 00 00 01 2c"));
        assert_eq!(bytes[7..], data);
        assert_eq!(bytes.len(), 307);
        Ok(())
    }

    #[test]
    fn test_limits() {
        let header = CommandApdu::new(0x00, 0xb0, 0x00, 0x00);
        assert!(header.clone().with_ne(0).to_bytes().is_err());
        assert!(header.clone().with_ne(65537).to_bytes().is_err());
        assert!(header.with_data(vec![0; 65536]).to_bytes().is_err());
    }

    #[test]
    fn test_response() -> Result<()> {
        let response = ResponseApdu::parse(&hex!("01 02 03 90 00"))?;
        assert_eq!(response.data, hex!("01 02 03"));
        assert_eq!(response.status, StatusWord::SUCCESS);
        let response = ResponseApdu::parse(&hex!("6a 82"))?;
        assert!(response.data.is_empty());
        assert_eq!(response.status, StatusWord::FILE_NOT_FOUND);
        assert!(ResponseApdu::parse(&hex!("90")).is_err());
        Ok(())
    }
}
