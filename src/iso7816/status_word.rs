//! ISO/IEC 7816-4 section 5.6
use std::fmt::{self, Display, Formatter};

/// The two trailing bytes `SW1 SW2` of a response APDU.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct StatusWord(u16);

impl StatusWord {
    pub const SUCCESS: Self = Self(0x9000);
    pub const END_OF_FILE: Self = Self(0x6282);
    pub const ACCESS_DENIED: Self = Self(0x6982);
    pub const COMMAND_NOT_ALLOWED: Self = Self(0x6986);
    pub const FILE_NOT_FOUND: Self = Self(0x6a82);
    pub const REFERENCED_DATA_NOT_FOUND: Self = Self(0x6a88);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(u16::from_be_bytes([sw1, sw2]))
    }

    /// Status word of a raw response, `None` if it is shorter than two bytes.
    pub fn from_response(response: &[u8]) -> Option<Self> {
        match response {
            [.., sw1, sw2] => Some(Self::new(*sw1, *sw2)),
            _ => None,
        }
    }

    pub const fn sw1(self) -> u8 {
        self.0.to_be_bytes()[0]
    }

    pub const fn sw2(self) -> u8 {
        self.0.to_be_bytes()[1]
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn is_success(self) -> bool {
        matches!(self.0, 0x9000 | 0x6100..=0x61ff)
    }

    pub const fn data_remaining(self) -> Option<usize> {
        match self.0 {
            0x6100..=0x61ff => Some(self.0 as usize & 0xff),
            _ => None,
        }
    }

    pub const fn is_warning(self) -> bool {
        matches!(self.0, 0x6200..=0x63ff)
    }

    /// Note: If this is the status, the data must be absent.
    pub const fn is_error(self) -> bool {
        matches!(self.0, 0x6400..=0x6fff)
    }

    pub const fn class_as_str(self) -> &'static str {
        match self.0 {
            0x9000 | 0x6100..=0x61ff => "Success",
            0x6200..=0x63ff => "Warning",
            0x6400..=0x66ff => "Execution error",
            0x6700..=0x6fff => "Checking error",
            0x9001..=0x9fff => "Proprietary",
            _ => "Invalid",
        }
    }

    pub const fn as_str(self) -> &'static str {
        #[allow(clippy::match_overlapping_arm)] // Used for catch-alls
        match self.0 {
            0x9000 => "Success",
            0x9000..=0x9fff => "Unknown proprietary status word",
            0x6100..=0x61ff => "Success, data remaining",

            0x6281 => "Part of returned data may be corrupted",
            0x6282 => "End of file reached before reading Le bytes",
            0x6283 => "Selected file invalidated",
            0x6200..=0x62ff => "Non-modifying warning",
            0x63c0..=0x63cf => "Counter value",
            0x6300..=0x63ff => "Modifying warning",

            0x6400..=0x64ff => "Non-modifying execution error",
            0x6581 => "Memory failure",
            0x6500..=0x65ff => "Modifying execution error",
            0x6600..=0x66ff => "Security execution error",

            0x6700 => "Wrong length",
            0x6882 => "Secure messaging not supported",
            0x6800..=0x68ff => "Function in class not supported",

            0x6982 => "Security status not satisfied",
            0x6983 => "Authentication method blocked",
            0x6984 => "Referenced data not usable",
            0x6985 => "Conditions of use not satisfied",
            0x6986 => "Command not allowed (no current EF)",
            0x6987 => "Expected secure messaging data objects missing",
            0x6988 => "Incorrect secure messaging data objects",
            0x6900..=0x69ff => "Command not allowed",

            0x6a80 => "Incorrect parameters in the data field",
            0x6a81 => "Function not supported",
            0x6a82 => "File or application not found",
            0x6a86 => "Incorrect P1 or P2 parameter",
            0x6a88 => "Referenced data not found",
            0x6a00..=0x6aff => "Wrong parameters",

            0x6c00..=0x6cff => "Wrong Le field",
            0x6d00 => "Instruction code not supported or invalid",
            0x6e00 => "Class not supported",
            0x6f00 => "No precise diagnosis",
            0x6700..=0x6fff => "Checking error",

            _ => "Invalid status word",
        }
    }
}

impl Display for StatusWord {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{:04X}] {}: {}", self.0, self.class_as_str(), self.as_str())
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<StatusWord> for u16 {
    fn from(value: StatusWord) -> Self {
        value.0
    }
}
