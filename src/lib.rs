//! Extended Access Control (BSI TR-03110) protocol engine for eID servers.
//!
//! The crate builds the command APDUs of the EAC sub-protocols and evaluates
//! the card's responses. Sending the commands is left to the caller through
//! the [`eac::Transport`] trait; nothing in here performs I/O.
//!
//! * [`asn1`]: BER-TLV data objects, object identifiers and security infos.
//! * [`crypto`]: elliptic curve arithmetic, key derivation and CMAC.
//! * [`iso7816`]: status words and command APDU encoding.
//! * [`eac`]: the protocol step framework and the sub-protocols.

pub mod asn1;
pub mod crypto;
pub mod eac;
pub mod iso7816;
