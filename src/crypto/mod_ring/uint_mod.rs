use {
    super::UintExp,
    rand::Rng,
    ruint::Uint,
    std::fmt::Debug,
    subtle::{ConditionallySelectable, ConstantTimeEq},
};

/// Trait for Uint backends supporting modular arithmetic.
///
/// The only implemented backend is Ruint, but the code is cleaner
/// if we abstract this, otherwise we would have to pass along the
/// const-generic parameters everywhere.
///
/// All `*_mod` methods expect their inputs already reduced.
pub trait UintMod:
    Sized
    + Copy
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + Debug
    + ConstantTimeEq
    + ConditionallySelectable
    + UintExp
{
    fn from_u64(value: u64) -> Self;
    fn is_zero(&self) -> bool;
    /// Number of bytes in the minimal big-endian encoding.
    fn byte_len(&self) -> usize;
    /// Uniformly random value in `0..bound`.
    fn random_below<R: Rng + ?Sized>(rng: &mut R, bound: Self) -> Self;
    fn reduce_mod(self, modulus: Self) -> Self;
    fn add_mod(self, other: Self, modulus: Self) -> Self;
    fn sub_mod(self, other: Self, modulus: Self) -> Self;
    fn mul_mod(self, other: Self, modulus: Self) -> Self;
    fn inv_mod(self, modulus: Self) -> Option<Self>;
}

impl<const BITS: usize, const LIMBS: usize> UintMod for Uint<BITS, LIMBS> {
    #[inline]
    fn from_u64(value: u64) -> Self {
        Self::from(value)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[inline]
    fn byte_len(&self) -> usize {
        Self::byte_len(self)
    }

    fn random_below<R: Rng + ?Sized>(rng: &mut R, bound: Self) -> Self {
        let leading_zeros = bound.leading_zeros();
        loop {
            let mut value = rng.gen::<Self>();
            value >>= leading_zeros;
            if value < bound {
                return value;
            }
        }
    }

    #[inline]
    fn reduce_mod(self, modulus: Self) -> Self {
        Self::reduce_mod(self, modulus)
    }

    #[inline]
    fn add_mod(self, other: Self, modulus: Self) -> Self {
        let (sum, carry) = self.overflowing_add(other);
        let (reduced, borrow) = sum.overflowing_sub(modulus);
        if carry | !borrow {
            reduced
        } else {
            sum
        }
    }

    #[inline]
    fn sub_mod(self, other: Self, modulus: Self) -> Self {
        let (result, borrow) = self.overflowing_sub(other);
        if borrow {
            result.wrapping_add(modulus)
        } else {
            result
        }
    }

    #[inline]
    fn mul_mod(self, other: Self, modulus: Self) -> Self {
        Self::mul_mod(self, other, modulus)
    }

    #[inline]
    fn inv_mod(self, modulus: Self) -> Option<Self> {
        Self::inv_mod(self, modulus)
    }
}
