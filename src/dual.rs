use std::fmt::{self, Display};

use crate::Scalar;

/// Forward-mode dual number: a value paired with its tangent (derivative).
///
/// `Dual { re, eps }` represents `re + eps·ε` where `ε² = 0`.
///
/// The components are themselves [`Scalar`]s, so duals nest:
/// `Dual<Dual<f64>>` carries two independent tangent directions and the
/// cross term `eps.eps` is the second-order mixed derivative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual<T> {
    /// Primal (real) value.
    pub re: T,
    /// Tangent (derivative) value.
    pub eps: T,
}

impl<T: Scalar> Display for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl<T: Scalar> Dual<T> {
    /// Create a new dual number.
    #[inline]
    pub fn new(re: T, eps: T) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(re: T) -> Self {
        Dual { re, eps: T::zero() }
    }

    /// Create a variable (unit derivative) for differentiation.
    #[inline]
    pub fn variable(re: T) -> Self {
        Dual { re, eps: T::one() }
    }

    /// Apply the chain rule: given `f(self.re)` and `f'(self.re)`, produce the dual result.
    #[inline]
    fn chain(self, f_val: T, f_deriv: T) -> Self {
        Dual {
            re: f_val,
            eps: self.eps * f_deriv,
        }
    }

    // ── Powers ──

    #[inline]
    pub fn recip(self) -> Self {
        let inv = self.re.recip();
        self.chain(inv, -(inv * inv))
    }

    #[inline]
    pub fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        self.chain(s, (T::lit(2.0) * s).recip())
    }

    #[inline]
    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Dual::constant(T::one());
        }
        let val = self.re.powi(n);
        let deriv = T::lit(f64::from(n)) * self.re.powi(n - 1);
        self.chain(val, deriv)
    }

    // ── Exp/Log ──

    #[inline]
    pub fn exp(self) -> Self {
        let e = self.re.exp();
        self.chain(e, e)
    }

    #[inline]
    pub fn ln(self) -> Self {
        let inv = self.re.recip();
        self.chain(self.re.ln(), inv)
    }
}
