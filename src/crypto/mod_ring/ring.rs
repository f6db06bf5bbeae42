use super::UintMod;

/// Ring of integers modulo a positive integer greater than one.
///
/// Elements are kept in canonical form, i.e. fully reduced.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ModRing<Uint: UintMod> {
    modulus: Uint,
}

impl<Uint: UintMod> ModRing<Uint> {
    #[inline]
    #[must_use]
    pub const fn from_modulus(modulus: Uint) -> Self {
        Self { modulus }
    }

    #[inline]
    #[must_use]
    pub const fn modulus(&self) -> Uint {
        self.modulus
    }

    /// Number of bytes used for fixed-width encoding of elements.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.modulus.byte_len()
    }
}
