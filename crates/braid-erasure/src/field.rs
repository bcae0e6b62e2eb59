//! GF(2^8) arithmetic.
//!
//! All codec math happens in the field of 256 elements built over the
//! irreducible polynomial `x^8 + x^4 + x^3 + x^2 + 1` (0x11D), with 2 as
//! the multiplicative generator. Multiplication and inversion go through
//! log/exp tables generated once per process.

use std::sync::OnceLock;

/// The irreducible polynomial, including the x^8 term.
const POLYNOMIAL: u16 = 0x11D;

/// Generator of the multiplicative group.
const GENERATOR: u8 = 2;

/// Log/exp tables for the field. The exp table is doubled so that
/// `exp[log(a) + log(b)]` never needs a modular reduction.
struct Tables {
    log: [u8; 256],
    exp: [u8; 510],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(Tables::generate)
}

impl Tables {
    fn generate() -> Self {
        let mut log = [0u8; 256];
        let mut exp = [0u8; 510];
        let mut x: u8 = 1;
        for i in 0..255 {
            exp[i] = x;
            exp[i + 255] = x;
            log[x as usize] = i as u8;
            x = carryless_mul(x, GENERATOR);
        }
        Self { log, exp }
    }
}

/// Bitwise polynomial multiplication with reduction (Russian peasant).
///
/// Only used to seed the tables; runtime multiplication is table-based.
fn carryless_mul(a: u8, b: u8) -> u8 {
    let mut a = u16::from(a);
    let mut b = u16::from(b);
    let mut result: u16 = 0;
    for _ in 0..8 {
        if b & 1 != 0 {
            result ^= a;
        }
        a <<= 1;
        if a & 0x100 != 0 {
            a ^= POLYNOMIAL;
        }
        b >>= 1;
    }
    result as u8
}

/// A GF(2^8) element.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub(crate) struct Gf256(pub(crate) u8);

impl Gf256 {
    pub(crate) const ZERO: Self = Self(0);
    pub(crate) const ONE: Self = Self(1);

    /// Addition is XOR; subtraction is identical.
    #[inline]
    pub(crate) const fn add(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    #[inline]
    pub(crate) fn mul(self, other: Self) -> Self {
        if self.0 == 0 || other.0 == 0 {
            return Self::ZERO;
        }
        let t = tables();
        let idx = t.log[self.0 as usize] as usize + t.log[other.0 as usize] as usize;
        Self(t.exp[idx])
    }

    /// Multiplicative inverse. Zero has no inverse.
    #[inline]
    pub(crate) fn inv(self) -> Option<Self> {
        if self.0 == 0 {
            return None;
        }
        let t = tables();
        Some(Self(t.exp[255 - t.log[self.0 as usize] as usize]))
    }

    /// Exponentiation by a non-negative integer.
    #[inline]
    pub(crate) fn pow(self, exponent: usize) -> Self {
        if exponent == 0 {
            return Self::ONE;
        }
        if self.0 == 0 {
            return Self::ZERO;
        }
        let t = tables();
        let idx = (t.log[self.0 as usize] as usize * exponent) % 255;
        Self(t.exp[idx])
    }
}
