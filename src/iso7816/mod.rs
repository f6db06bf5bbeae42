//! ISO/IEC 7816 smart card command framing.

mod apdu;
mod status_word;

pub use self::{
    apdu::{CommandApdu, ResponseApdu},
    status_word::StatusWord,
};
