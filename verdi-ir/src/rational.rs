//! Exact rational immediates.
//!
//! Numeric payloads in the term algebra are exact rationals: the rewrite
//! rules fold arithmetic only when the result is exact, so the soundness of
//! a proof never rests on rounding. Values are kept normalized (positive
//! denominator, reduced by gcd). All arithmetic is checked: an operation
//! whose normalized result would overflow the `i128` components returns
//! `None`, and the rules treat that as "do not fold".

use core::cmp::Ordering;
use core::fmt;

/// An exact rational number with `i128` numerator and denominator.
///
/// Invariants: the denominator is strictly positive and `gcd(num, den) == 1`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Compare `an/ad` with `bn/bd` for strictly positive operands, exactly,
/// by the continued-fraction expansion of both sides. This never overflows,
/// unlike cross-multiplication.
fn cmp_pos(mut an: u128, mut ad: u128, mut bn: u128, mut bd: u128) -> Ordering {
    let mut flipped = false;
    loop {
        let (q1, r1) = (an / ad, an % ad);
        let (q2, r2) = (bn / bd, bn % bd);
        let ord = if q1 != q2 {
            q1.cmp(&q2)
        } else {
            match (r1 == 0, r2 == 0) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => {
                    // Both have a fractional part; comparing the remainders
                    // inverts the fractions, which reverses the ordering.
                    an = ad;
                    ad = r1;
                    bn = bd;
                    bd = r2;
                    flipped = !flipped;
                    continue;
                }
            }
        };
        return if flipped { ord.reverse() } else { ord };
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

impl Rational {
    /// The rational zero.
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    /// The rational one.
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    /// The rational minus one.
    pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };

    /// Create a normalized rational. Returns `None` when `den` is zero or
    /// when normalization overflows.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let (num, den) = if den < 0 {
            (num.checked_neg()?, den.checked_neg()?)
        } else {
            (num, den)
        };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        if g <= 1 {
            return Some(Rational { num, den });
        }
        Some(Rational {
            num: num / (g as i128),
            den: den / (g as i128),
        })
    }

    /// Create a rational from an integer.
    pub fn from_i64(v: i64) -> Self {
        Rational {
            num: v as i128,
            den: 1,
        }
    }

    /// The numerator of the normalized representation.
    pub fn numerator(self) -> i128 {
        self.num
    }

    /// The denominator of the normalized representation (always positive).
    pub fn denominator(self) -> i128 {
        self.den
    }

    /// Is this rational zero?
    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    /// Is this rational strictly negative?
    pub fn is_negative(self) -> bool {
        self.num < 0
    }

    /// Is this rational an integer?
    pub fn is_integer(self) -> bool {
        self.den == 1
    }

    /// Return the integer value, if this rational is one that fits in `i64`.
    pub fn as_i64(self) -> Option<i64> {
        if self.den == 1 {
            i64::try_from(self.num).ok()
        } else {
            None
        }
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Rational) -> Option<Rational> {
        // Reduce by the gcd of the denominators first to keep the
        // intermediate products small.
        let g = gcd(self.den.unsigned_abs(), rhs.den.unsigned_abs()) as i128;
        let lden = self.den / g;
        let rden = rhs.den / g;
        let num = self
            .num
            .checked_mul(rden)?
            .checked_add(rhs.num.checked_mul(lden)?)?;
        let den = self.den.checked_mul(rden)?;
        Rational::new(num, den)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Rational) -> Option<Rational> {
        self.checked_add(rhs.checked_neg()?)
    }

    /// Checked multiplication.
    pub fn checked_mul(self, rhs: Rational) -> Option<Rational> {
        // Cross-reduce before multiplying.
        let g1 = gcd(self.num.unsigned_abs(), rhs.den.unsigned_abs()) as i128;
        let g2 = gcd(rhs.num.unsigned_abs(), self.den.unsigned_abs()) as i128;
        let num = (self.num / g1).checked_mul(rhs.num / g2)?;
        let den = (self.den / g2).checked_mul(rhs.den / g1)?;
        Rational::new(num, den)
    }

    /// Checked division. `None` when `rhs` is zero or on overflow.
    pub fn checked_div(self, rhs: Rational) -> Option<Rational> {
        self.checked_mul(rhs.checked_recip()?)
    }

    /// Checked negation.
    pub fn checked_neg(self) -> Option<Rational> {
        Some(Rational {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    /// Checked reciprocal. `None` when this rational is zero.
    pub fn checked_recip(self) -> Option<Rational> {
        Rational::new(self.den, self.num)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Rational) -> Ordering {
        match (self.num.signum(), other.num.signum()) {
            (a, b) if a != b => a.cmp(&b),
            (0, 0) => Ordering::Equal,
            (1, 1) => cmp_pos(
                self.num.unsigned_abs(),
                self.den.unsigned_abs(),
                other.num.unsigned_abs(),
                other.den.unsigned_abs(),
            ),
            // Both negative: compare magnitudes, reversed.
            _ => cmp_pos(
                self.num.unsigned_abs(),
                self.den.unsigned_abs(),
                other.num.unsigned_abs(),
                other.den.unsigned_abs(),
            )
            .reverse(),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}
