use {
    super::{
        super::{
            mod_ring::{ModRing, ModRingElementRef, RingRefExt, UintExp, UintMod},
            CryptoCoreRng,
        },
        CryptoGroup,
    },
    anyhow::{ensure, Result},
    num_traits::Inv,
    std::{
        fmt::{self, Formatter},
        ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
    },
    subtle::{Choice, ConditionallySelectable, ConstantTimeEq},
};

/// Short Weierstrass curve `y^2 = x^3 + a x + b` over a prime field.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct EllipticCurve<U: UintMod> {
    base_field:   ModRing<U>,
    scalar_field: ModRing<U>,
    a:            U,
    b:            U,
    cofactor:     U,
    generator:    (U, U),
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EllipticCurvePoint<'a, U: UintMod> {
    curve:       &'a EllipticCurve<U>,
    coordinates: Coordinates<'a, U>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Coordinates<'a, U: UintMod> {
    Infinity,
    Affine(ModRingElementRef<'a, U>, ModRingElementRef<'a, U>),
}

impl<U: UintMod> EllipticCurve<U> {
    pub fn new(modulus: U, a: U, b: U, x: U, y: U, order: U, cofactor: U) -> Result<Self> {
        let one = U::from_u64(1);
        ensure!(modulus > one, "Modulus too small");
        ensure!(order > one, "Order too small");
        ensure!(!cofactor.is_zero(), "Cofactor is zero");
        ensure!(a < modulus, "a not in field");
        ensure!(b < modulus, "b not in field");
        ensure!(x < modulus, "x not in field");
        ensure!(y < modulus, "y not in field");
        let base_field = ModRing::from_modulus(modulus);
        let scalar_field = ModRing::from_modulus(order);
        {
            let field = &base_field;
            let (a, b, x, y) = (field.from(a), field.from(b), field.from(x), field.from(y));

            // Ensure non-singular
            let c4 = field.from_u64(4);
            let c27 = field.from_u64(27);
            ensure!(c4 * a.pow(3) + c27 * b.pow(2) != field.zero(), "Singular curve");

            // Ensure generator is on curve
            ensure!(y.pow(2) == x.pow(3) + a * x + b, "Generator not on curve");
        }

        // Ensure not anomalous
        ensure!(modulus != order, "Anomalous curve");

        let curve = Self {
            base_field,
            scalar_field,
            a,
            b,
            cofactor,
            generator: (x, y),
        };

        // Ensure generator has order `order`
        ensure!(
            curve.generator().mul_uint(order).is_infinity(),
            "Generator order mismatch"
        );

        Ok(curve)
    }

    pub const fn base_field(&self) -> &ModRing<U> {
        &self.base_field
    }

    pub const fn scalar_field(&self) -> &ModRing<U> {
        &self.scalar_field
    }

    pub fn modulus(&self) -> U {
        self.base_field.modulus()
    }

    pub fn order(&self) -> U {
        self.scalar_field.modulus()
    }

    pub fn a(&self) -> ModRingElementRef<'_, U> {
        self.base_field.from(self.a)
    }

    pub fn b(&self) -> ModRingElementRef<'_, U> {
        self.base_field.from(self.b)
    }

    pub const fn cofactor(&self) -> U {
        self.cofactor
    }

    /// Byte length of fixed-width coordinate encodings.
    pub fn field_size(&self) -> usize {
        self.base_field.byte_len()
    }

    pub fn generator(&self) -> EllipticCurvePoint<'_, U> {
        EllipticCurvePoint {
            curve:       self,
            coordinates: Coordinates::Affine(
                self.base_field.from(self.generator.0),
                self.base_field.from(self.generator.1),
            ),
        }
    }

    /// Point at infinity
    pub const fn infinity(&self) -> EllipticCurvePoint<'_, U> {
        EllipticCurvePoint {
            curve:       self,
            coordinates: Coordinates::Infinity,
        }
    }

    /// Point from affine coordinates, checked to be on the curve and, for
    /// curves with a cofactor, in the prime order subgroup.
    pub fn from_affine<'a>(
        &'a self,
        x: ModRingElementRef<'a, U>,
        y: ModRingElementRef<'a, U>,
    ) -> Result<EllipticCurvePoint<'a, U>> {
        let point = self.from_affine_unchecked(x, y)?;
        ensure!(point.is_on_curve(), "Point not on curve.");
        if self.cofactor() != U::from_u64(1) {
            ensure!(
                point.mul_uint(self.order()).is_infinity(),
                "Point not in subgroup."
            );
        }
        Ok(point)
    }

    /// Point from affine coordinates without the curve equation check.
    ///
    /// Arithmetic on such a point is well defined but may leave the curve.
    pub fn from_affine_unchecked<'a>(
        &'a self,
        x: ModRingElementRef<'a, U>,
        y: ModRingElementRef<'a, U>,
    ) -> Result<EllipticCurvePoint<'a, U>> {
        ensure!(x.ring() == &self.base_field, "x not in base field");
        ensure!(y.ring() == &self.base_field, "y not in base field");
        Ok(EllipticCurvePoint {
            curve:       self,
            coordinates: Coordinates::Affine(x, y),
        })
    }

    /// Key pair `(d, d·G)` with `d` uniform in `[1, n-1]`.
    pub fn generate_key_pair<'a>(
        &'a self,
        rng: &mut dyn CryptoCoreRng,
    ) -> (ModRingElementRef<'a, U>, EllipticCurvePoint<'a, U>) {
        let private = self.random_scalar(rng);
        (private, self.generator() * private)
    }
}

impl<'a, U: UintMod> EllipticCurvePoint<'a, U> {
    pub const fn curve(&self) -> &'a EllipticCurve<U> {
        self.curve
    }

    pub const fn is_infinity(&self) -> bool {
        matches!(self.coordinates, Coordinates::Infinity)
    }

    pub const fn coordinates(&self) -> Option<(ModRingElementRef<'a, U>, ModRingElementRef<'a, U>)> {
        match self.coordinates {
            Coordinates::Infinity => None,
            Coordinates::Affine(x, y) => Some((x, y)),
        }
    }

    pub const fn x(&self) -> Option<ModRingElementRef<'a, U>> {
        match self.coordinates {
            Coordinates::Infinity => None,
            Coordinates::Affine(x, _) => Some(x),
        }
    }

    pub const fn y(&self) -> Option<ModRingElementRef<'a, U>> {
        match self.coordinates {
            Coordinates::Infinity => None,
            Coordinates::Affine(_, y) => Some(y),
        }
    }

    /// Check the curve equation `y^2 = x^3 + ax + b`.
    pub fn is_on_curve(&self) -> bool {
        match self.coordinates {
            Coordinates::Infinity => true,
            Coordinates::Affine(x, y) => {
                y.square() == x.pow(3) + self.curve.a() * x + self.curve.b()
            }
        }
    }

    /// Scalar multiplication by double-and-add.
    ///
    /// The sequence of group operations only depends on the bit length of
    /// the scalar. A zero scalar yields the point at infinity.
    #[must_use]
    pub fn mul_uint<W: UintExp>(mut self, scalar: W) -> Self {
        let mut result = self.curve.infinity();
        for i in 0..scalar.bit_len() {
            result.conditional_assign(&(result + self), scalar.bit_ct(i));
            self += self;
        }
        result
    }
}

macro_rules! forward_fmt {
    ($($trait:path),+) => {
        $(
            impl<'a, U: UintMod + $trait> $trait for EllipticCurvePoint<'a, U> {
                fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                    match self.coordinates {
                        Coordinates::Infinity => write!(f, "Infinity"),
                        Coordinates::Affine(x, y) => {
                            write!(f, "(")?;
                            <ModRingElementRef<'_, U> as $trait>::fmt(&x, f)?;
                            write!(f, ", ")?;
                            <ModRingElementRef<'_, U> as $trait>::fmt(&y, f)?;
                            write!(f, ")")
                        }
                    }
                }
            }
        )+
    };
}

forward_fmt!(fmt::Debug, fmt::LowerHex, fmt::UpperHex);

impl<U: UintMod> Add for EllipticCurvePoint<'_, U> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        assert_eq!(self.curve, other.curve);
        match (self.coordinates, other.coordinates) {
            (Coordinates::Infinity, _) => other,
            (_, Coordinates::Infinity) => self,
            (Coordinates::Affine(x1, y1), Coordinates::Affine(x2, y2)) => {
                // https://hyperelliptic.org/EFD/g1p/auto-shortw.html
                let field = self.curve.base_field();
                let lambda = if x1 == x2 {
                    if y1 != y2 || y1.is_zero() {
                        // P + (-P), or doubling a point of order two.
                        return self.curve.infinity();
                    }
                    (field.from_u64(3) * x1.square() + self.curve.a()) / (field.from_u64(2) * y1)
                } else {
                    (y2 - y1) / (x2 - x1)
                };
                // Only reachable for a composite modulus.
                let Some(lambda) = lambda else {
                    return self.curve.infinity();
                };
                let x3 = lambda.square() - x1 - x2;
                let y3 = lambda * (x1 - x3) - y1;
                EllipticCurvePoint {
                    curve:       self.curve,
                    coordinates: Coordinates::Affine(x3, y3),
                }
            }
        }
    }
}

impl<U: UintMod> AddAssign for EllipticCurvePoint<'_, U> {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<U: UintMod> Neg for EllipticCurvePoint<'_, U> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self.coordinates {
            Coordinates::Infinity => self,
            Coordinates::Affine(x, y) => EllipticCurvePoint {
                curve:       self.curve,
                coordinates: Coordinates::Affine(x, -y),
            },
        }
    }
}

impl<U: UintMod> Sub for EllipticCurvePoint<'_, U> {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(self, other: Self) -> Self::Output {
        self + other.neg()
    }
}

impl<U: UintMod> SubAssign for EllipticCurvePoint<'_, U> {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl<'a, U: UintMod> Mul<ModRingElementRef<'a, U>> for EllipticCurvePoint<'a, U> {
    type Output = Self;

    fn mul(self, scalar: ModRingElementRef<'a, U>) -> Self::Output {
        assert_eq!(scalar.ring(), self.curve.scalar_field());
        self.mul_uint(scalar.to_uint())
    }
}

impl<'a, U: UintMod> MulAssign<ModRingElementRef<'a, U>> for EllipticCurvePoint<'a, U> {
    fn mul_assign(&mut self, scalar: ModRingElementRef<'a, U>) {
        *self = *self * scalar;
    }
}

impl<'a, U: UintMod> Div<ModRingElementRef<'a, U>> for EllipticCurvePoint<'a, U> {
    type Output = Option<Self>;

    fn div(self, scalar: ModRingElementRef<'a, U>) -> Self::Output {
        scalar.inv().map(|inv| self * inv)
    }
}

/// Conditionally select an Elliptic Curve Point
///
/// Note: Points must have identical representation (Infinity / Affine) for
/// constant-time.
///
/// # Panics
///
/// Panics if the points are not on the same curve
impl<'a, U: UintMod> ConditionallySelectable for EllipticCurvePoint<'a, U> {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        assert_eq!(a.curve, b.curve);
        use Coordinates::*;
        let coordinates = match (&a.coordinates, &b.coordinates) {
            (Infinity, Infinity) => Infinity,
            (Affine(ax, ay), Affine(bx, by)) => Affine(
                ModRingElementRef::<'a, U>::conditional_select(ax, bx, choice),
                ModRingElementRef::<'a, U>::conditional_select(ay, by, choice),
            ),
            (a, b) => {
                if bool::from(choice) {
                    *b
                } else {
                    *a
                }
            }
        };
        Self {
            curve: a.curve,
            coordinates,
        }
    }
}

/// Constant time coordinate equality check.
///
/// Warning: Only constant time in coordinates, not in Infinity / Affine cases
/// distinction.
///
/// # Panics
///
/// Panics if the points are not on the same curve
impl<U: UintMod> ConstantTimeEq for EllipticCurvePoint<'_, U> {
    fn ct_eq(&self, other: &Self) -> Choice {
        use Coordinates::*;
        assert_eq!(self.curve, other.curve);
        match (&self.coordinates, &other.coordinates) {
            (Infinity, Infinity) => Choice::from(1),
            (Affine(ax, ay), Affine(bx, by)) => ax.ct_eq(bx) & ay.ct_eq(by),
            _ => Choice::from(0),
        }
    }
}

impl<'a, U: 'a + UintMod> CryptoGroup<'a> for EllipticCurve<U> {
    type BaseElement = EllipticCurvePoint<'a, U>;
    type ScalarElement = ModRingElementRef<'a, U>;

    fn generator(&'a self) -> Self::BaseElement {
        self.generator()
    }

    fn random_scalar(&'a self, rng: &mut dyn CryptoCoreRng) -> Self::ScalarElement {
        self.scalar_field().random_nonzero(rng)
    }
}
