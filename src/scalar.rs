//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Functions written as `fn f<T: Scalar>(x: T) -> T` work unchanged with plain
//! `f64`, `Dual<f64>` and the nested `Dual<Dual<f64>>` used for second
//! derivatives.

use std::fmt::{Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::{One, Zero};

use crate::dual::Dual;
use crate::float::Float;

/// The central trait for AD-generic numeric code.
///
/// Only the elementary functions needed by the forward models are part of the
/// contract; each implementation carries its own chain rule.
pub trait Scalar:
    Copy
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar (constant, zero derivative).
    fn from_f(val: Self::Float) -> Self;

    /// Extract the primal value.
    fn value(&self) -> Self::Float;

    /// Lift an `f64` literal or model parameter.
    #[inline]
    fn lit(val: f64) -> Self {
        Self::from_f(<Self::Float as Float>::from_lit(val))
    }

    fn recip(self) -> Self;
    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;

    /// Whether the primal value is finite.
    #[inline]
    fn is_finite(&self) -> bool {
        num_traits::Float::is_finite(self.value())
    }
}

macro_rules! impl_scalar_for_float {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            type Float = $t;

            #[inline]
            fn from_f(val: $t) -> Self {
                val
            }

            #[inline]
            fn value(&self) -> $t {
                *self
            }

            #[inline]
            fn recip(self) -> Self {
                <$t>::recip(self)
            }

            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[inline]
            fn powi(self, n: i32) -> Self {
                <$t>::powi(self, n)
            }

            #[inline]
            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            #[inline]
            fn ln(self) -> Self {
                <$t>::ln(self)
            }
        }
    )*};
}

impl_scalar_for_float!(f32, f64);

impl<T: Scalar> Scalar for Dual<T> {
    type Float = T::Float;

    #[inline]
    fn from_f(val: T::Float) -> Self {
        Dual::constant(T::from_f(val))
    }

    #[inline]
    fn value(&self) -> T::Float {
        self.re.value()
    }

    #[inline]
    fn recip(self) -> Self {
        Dual::recip(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        Dual::sqrt(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        Dual::powi(self, n)
    }

    #[inline]
    fn exp(self) -> Self {
        Dual::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        Dual::ln(self)
    }
}
