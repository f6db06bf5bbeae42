use {
    ruint::Uint,
    subtle::Choice,
};

/// Trait for Uint backends that can be used as scalars in double-and-add.
pub trait UintExp {
    /// Returns an upper bound for the highest bit set.
    ///
    /// Run time of callers leaks this value, so it should ideally not depend
    /// on the secret. For ruint it is the actual bit length.
    fn bit_len(&self) -> usize;

    /// Is the `index`th bit set in the binary expansion of `self`.
    fn bit_ct(&self, index: usize) -> Choice;
}

impl<const BITS: usize, const LIMBS: usize> UintExp for Uint<BITS, LIMBS> {
    fn bit_len(&self) -> usize {
        Self::bit_len(self)
    }

    fn bit_ct(&self, index: usize) -> Choice {
        Choice::from(u8::from(self.bit(index)))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        ruint::{aliases::U256, uint},
    };

    #[test]
    fn test_bits() {
        let value = uint!(0b1011_U256);
        assert_eq!(UintExp::bit_len(&value), 4);
        let bits: Vec<bool> = (0..4).map(|i| value.bit_ct(i).into()).collect();
        assert_eq!(bits, [true, true, false, true]);
        assert_eq!(UintExp::bit_len(&U256::ZERO), 0);
    }
}
