use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

use crate::Scalar;

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Every AD value in deltavar bottoms out in one of these. A `Float` is its own
/// trivial [`Scalar`]; dual numbers are `Scalar`s but never `Float`s.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + Scalar<Float = Self>
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + 'static
{
    /// Convert an `f64` literal or model parameter, rounding if needed.
    fn from_lit(val: f64) -> Self;
}

impl Float for f32 {
    #[inline]
    fn from_lit(val: f64) -> Self {
        val as f32
    }
}

impl Float for f64 {
    #[inline]
    fn from_lit(val: f64) -> Self {
        val
    }
}
