//! Ring of integers modulo a positive integer.

mod element;
mod ring;
mod ring_ref;
mod uint_exp;
mod uint_mod;

pub use self::{
    element::{ModRingElement, ModRingElementRef},
    ring::ModRing,
    ring_ref::{RingRef, RingRefExt},
    uint_exp::UintExp,
    uint_mod::UintMod,
};
