use {
    super::{ModRing, ModRingElement, UintMod},
    rand::Rng,
    std::ops::Deref,
};

/// Trait for ModRing parameter references.
///
/// Making this a trait allows both zero-sized and references to be used, so the
/// same implementation can cover both compile-time and runtime known fields. In
/// the latter case, a sufficiently large `Uint` will have to be picked compile
/// time though.
pub trait RingRef: Copy + Deref<Target = ModRing<Self::Uint>> {
    type Uint: UintMod;
}

#[allow(clippy::wrong_self_convention)]
pub trait RingRefExt: RingRef {
    fn zero(self) -> ModRingElement<Self>;
    fn one(self) -> ModRingElement<Self>;
    fn from_u64(self, value: u64) -> ModRingElement<Self>;
    /// Element congruent to `value`, reducing if necessary.
    fn from<T: Into<Self::Uint>>(self, value: T) -> ModRingElement<Self>;
    fn random<R: Rng + ?Sized>(self, rng: &mut R) -> ModRingElement<Self>;
    fn random_nonzero<R: Rng + ?Sized>(self, rng: &mut R) -> ModRingElement<Self>;
}

impl<Uint: UintMod> RingRef for &ModRing<Uint> {
    type Uint = Uint;
}

impl<Ring: RingRef> RingRefExt for Ring {
    #[inline(always)]
    fn zero(self) -> ModRingElement<Self> {
        self.from_u64(0)
    }

    #[inline(always)]
    fn one(self) -> ModRingElement<Self> {
        self.from_u64(1)
    }

    #[inline(always)]
    fn from_u64(self, value: u64) -> ModRingElement<Self> {
        self.from(Ring::Uint::from_u64(value))
    }

    fn from<T: Into<Self::Uint>>(self, value: T) -> ModRingElement<Self> {
        let value = value.into();
        let value = if value < self.modulus() {
            value
        } else {
            value.reduce_mod(self.modulus())
        };
        ModRingElement::from_reduced(self, value)
    }

    fn random<R: Rng + ?Sized>(self, rng: &mut R) -> ModRingElement<Self> {
        ModRingElement::from_reduced(self, Ring::Uint::random_below(rng, self.modulus()))
    }

    fn random_nonzero<R: Rng + ?Sized>(self, rng: &mut R) -> ModRingElement<Self> {
        loop {
            let value = self.random(rng);
            if !value.is_zero() {
                return value;
            }
        }
    }
}
