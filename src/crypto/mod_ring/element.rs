use {
    super::{ModRing, RingRef, RingRefExt, UintMod},
    num_traits::Inv,
    std::{
        fmt::{self, Formatter},
        ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
    },
    subtle::{Choice, ConditionallySelectable, ConstantTimeEq},
};

/// Element of a [`ModRing`].
#[derive(Clone, Copy)]
pub struct ModRingElement<Ring: RingRef> {
    ring:  Ring,
    value: Ring::Uint,
}

/// ModRingElement with the ring parameters by embedded reference.
pub type ModRingElementRef<'a, Uint> = ModRingElement<&'a ModRing<Uint>>;

impl<Ring: RingRef> ModRingElement<Ring> {
    /// Wraps a value that is already reduced modulo the ring modulus.
    #[inline]
    #[must_use]
    pub(super) fn from_reduced(ring: Ring, value: Ring::Uint) -> Self {
        debug_assert!(value < ring.modulus());
        Self { ring, value }
    }

    #[inline]
    #[must_use]
    pub fn ring(&self) -> &ModRing<Ring::Uint> {
        &self.ring
    }

    // Note: We can not implement `From<Ring::Uint>` for `ModRingElement<Ring>`
    // because this conflicts with `impl T From<T> for T` and we can't tell
    // the compiler that `Ring` and `Ring::Uint` are not the same type.
    #[inline]
    #[must_use]
    pub fn to_uint(self) -> Ring::Uint {
        self.value
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    #[inline]
    #[must_use]
    pub fn square(self) -> Self {
        self * self
    }

    /// Small exponentiation
    ///
    /// Run time depends on the exponent.
    #[inline]
    #[must_use]
    pub fn pow(self, exponent: usize) -> Self {
        match exponent {
            0 => self.ring.one(),
            1 => self,
            n if n % 2 == 0 => self.pow(n / 2).square(),
            n => self * self.pow(n / 2).square(),
        }
    }
}

macro_rules! forward_fmt {
    ($($trait:path),+) => {
        $(
            impl<Ring: RingRef> $trait for ModRingElement<Ring> where Ring::Uint: $trait {
                fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                    <Ring::Uint as $trait>::fmt(&self.value, f)
                }
            }
        )+
    };
}

forward_fmt!(fmt::Debug, fmt::Display, fmt::LowerHex, fmt::UpperHex);

impl<Ring: RingRef> PartialEq for ModRingElement<Ring> {
    fn eq(&self, other: &Self) -> bool {
        assert_eq!(*self.ring, *other.ring);
        self.value.ct_eq(&other.value).into()
    }
}

impl<Ring: RingRef> Eq for ModRingElement<Ring> {}

impl<Ring: RingRef> Add for ModRingElement<Ring> {
    type Output = Self;

    #[inline(always)]
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl<Ring: RingRef> Sub for ModRingElement<Ring> {
    type Output = Self;

    #[inline(always)]
    fn sub(mut self, other: Self) -> Self {
        self -= other;
        self
    }
}

impl<Ring: RingRef> Mul for ModRingElement<Ring> {
    type Output = Self;

    #[inline(always)]
    fn mul(mut self, other: Self) -> Self {
        self *= other;
        self
    }
}

impl<Ring: RingRef> Neg for ModRingElement<Ring> {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        self.ring.zero() - self
    }
}

impl<Ring: RingRef> Inv for ModRingElement<Ring> {
    type Output = Option<Self>;

    fn inv(self) -> Self::Output {
        let value = self.value.inv_mod(self.ring.modulus())?;
        Some(Self::from_reduced(self.ring, value))
    }
}

impl<Ring: RingRef> Div for ModRingElement<Ring> {
    type Output = Option<Self>;

    /// Division
    ///
    /// Run time may depend on the value of the divisor.
    #[inline(always)]
    fn div(self, other: Self) -> Option<Self> {
        assert_eq!(self.ring(), other.ring());
        other.inv().map(|inv| self * inv)
    }
}

impl<Ring: RingRef> AddAssign for ModRingElement<Ring> {
    #[inline(always)]
    fn add_assign(&mut self, other: Self) {
        assert_eq!(self.ring(), other.ring());
        self.value = self.value.add_mod(other.value, self.ring.modulus());
    }
}

impl<Ring: RingRef> SubAssign for ModRingElement<Ring> {
    #[inline(always)]
    fn sub_assign(&mut self, other: Self) {
        assert_eq!(self.ring(), other.ring());
        self.value = self.value.sub_mod(other.value, self.ring.modulus());
    }
}

impl<Ring: RingRef> MulAssign for ModRingElement<Ring> {
    #[inline(always)]
    fn mul_assign(&mut self, other: Self) {
        assert_eq!(self.ring(), other.ring());
        self.value = self.value.mul_mod(other.value, self.ring.modulus());
    }
}

impl<Ring: RingRef> ConditionallySelectable for ModRingElement<Ring> {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        assert_eq!(a.ring(), b.ring());
        let value = Ring::Uint::conditional_select(&a.value, &b.value, choice);
        Self::from_reduced(a.ring, value)
    }
}

impl<Ring: RingRef> ConstantTimeEq for ModRingElement<Ring> {
    fn ct_eq(&self, other: &Self) -> Choice {
        assert_eq!(self.ring(), other.ring());
        self.value.ct_eq(&other.value)
    }
}
