//! Implements discrete-logarithm hard groups for cryptographic operations.

mod elliptic_curve;
pub mod named;

pub use self::elliptic_curve::{EllipticCurve, EllipticCurvePoint};
use {
    super::CryptoCoreRng,
    num_traits::Inv,
    ruint::Uint,
    std::{
        fmt::Debug,
        ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
    },
};

/// Integer type wide enough for every supported curve (up to 521 bits).
///
/// Domain parameters are only known at run time, so all curves share it.
pub type FieldUint = Uint<576, 9>;

/// An algebraic group, written additively.
pub trait GroupElement:
    Debug
    + Clone
    + Copy
    + PartialEq
    + Eq
    + Neg
    + Add<Self, Output = Self>
    + Sub<Self, Output = Self>
    + AddAssign
    + SubAssign
{
}

/// An algebraic ring.
pub trait RingElement:
    GroupElement
    + Mul<Self, Output = Self>
    + MulAssign
    + Div<Self, Output = Option<Self>>
    + Inv<Output = Option<Self>>
{
}

/// A group with a generator and a scalar ring, written additively.
pub trait CryptoGroup<'s> {
    type BaseElement: 's
        + GroupElement
        + Mul<Self::ScalarElement, Output = Self::BaseElement>
        + MulAssign<Self::ScalarElement>
        + Div<Self::ScalarElement, Output = Option<Self::BaseElement>>;
    type ScalarElement: 's + RingElement;

    fn generator(&'s self) -> Self::BaseElement;

    /// Uniformly random non-zero scalar, suitable as a private key.
    fn random_scalar(&'s self, rng: &mut dyn CryptoCoreRng) -> Self::ScalarElement;
}

impl<T> GroupElement for T where
    T: Debug
        + Clone
        + Copy
        + PartialEq
        + Eq
        + Neg
        + Add<Self, Output = Self>
        + Sub<Self, Output = Self>
        + AddAssign
        + SubAssign
{
}

impl<T> RingElement for T where
    T: GroupElement
        + Mul<Self, Output = Self>
        + MulAssign
        + Div<Output = Option<Self>>
        + Inv<Output = Option<Self>>
{
}

/// Both sides of an ephemeral-static key agreement reach the same point.
#[cfg(test)]
fn test_key_agreement<'s>(group: &'s impl CryptoGroup<'s>) {
    let rng = &mut rand::thread_rng();
    let chip = group.random_scalar(rng);
    let terminal = group.random_scalar(rng);
    let chip_public = group.generator() * chip;
    let terminal_public = group.generator() * terminal;
    assert_eq!(chip_public * terminal, terminal_public * chip);
}

/// Schnorr proof over two bases `G` and `M` for a key `x1 G + x2 M`, the
/// shape of a pseudonymous signature, including the sector pseudonym.
#[cfg(test)]
fn test_two_base_schnorr<'s>(group: &'s impl CryptoGroup<'s>) {
    let rng = &mut rand::thread_rng();
    let g = group.generator();
    let m = g * group.random_scalar(rng);
    let sector = g * group.random_scalar(rng);
    let (x1, x2) = (group.random_scalar(rng), group.random_scalar(rng));
    let public = g * x1 + m * x2;
    let pseudonym = sector * x1;

    let (k1, k2) = (group.random_scalar(rng), group.random_scalar(rng));
    let commitment = g * k1 + m * k2;
    let sector_commitment = sector * k1;
    let c = group.random_scalar(rng);
    let s1 = k1 - c * x1;
    let s2 = k2 - c * x2;

    assert_eq!(public * c + g * s1 + m * s2, commitment);
    assert_eq!(pseudonym * c + sector * s1, sector_commitment);
    assert_ne!(public * c + g * s2 + m * s1, commitment);
    assert_eq!(pseudonym / x1, Some(sector));
}
