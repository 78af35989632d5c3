use approx::assert_relative_eq;
use deltavar::{derivative, Dual, Dual32, Dual64, Scalar};

/// Central finite difference: (f(x+h) - f(x-h)) / 2h
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-7;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Test a dual elemental against finite differences.
fn check_elemental(
    f_dual: impl Fn(Dual64) -> Dual64,
    f_f64: impl Fn(f64) -> f64,
    x: f64,
    tol: f64,
) {
    let d = f_dual(Dual::variable(x));
    let expected_deriv = finite_diff(&f_f64, x);
    assert_relative_eq!(d.re, f_f64(x), max_relative = 1e-12);
    assert_relative_eq!(d.eps, expected_deriv, max_relative = tol);
}

// ── Arithmetic ──

#[test]
fn product_rule() {
    // (3 + ε)(4 + ε) = 12 + 7ε
    let a = Dual::new(3.0, 1.0);
    let b = Dual::new(4.0, 1.0);
    let c = a * b;
    assert_relative_eq!(c.re, 12.0);
    assert_relative_eq!(c.eps, 7.0);
}

#[test]
fn quotient_rule() {
    // d/dx (x / (x+1)) at x=2: 1/(x+1)^2 = 1/9
    let x = Dual::variable(2.0);
    let one = Dual::constant(1.0);
    let y = x / (x + one);
    assert_relative_eq!(y.re, 2.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(y.eps, 1.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn compound_assignment_matches_binary_ops() {
    let x = Dual::variable(1.5_f64);
    let c = Dual::constant(2.0);
    let mut y = x;
    y *= x;
    y += c;
    y -= x;
    y /= c;
    let z = (x * x + c - x) / c;
    assert_eq!(y, z);
}

#[test]
fn negation_flips_both_parts() {
    let x = -Dual::new(2.0_f64, 3.0);
    assert_eq!(x, Dual::new(-2.0, -3.0));
}

// ── Elementals ──

#[test]
fn sqrt_elemental() {
    check_elemental(|x| x.sqrt(), f64::sqrt, 2.5, 1e-6);
}

#[test]
fn exp_elemental() {
    check_elemental(|x| x.exp(), f64::exp, 0.7, 1e-6);
}

#[test]
fn ln_elemental() {
    check_elemental(|x| x.ln(), f64::ln, 3.2, 1e-6);
}

#[test]
fn recip_elemental() {
    check_elemental(|x| x.recip(), |x| 1.0 / x, -1.7, 1e-6);
}

#[test]
fn powi_elemental() {
    check_elemental(|x| x.powi(3), |x| x.powi(3), 1.3, 1e-6);
    check_elemental(|x| x.powi(-2), |x| x.powi(-2), 0.8, 1e-6);
}

#[test]
fn powi_zero_is_constant() {
    let y = Dual::variable(4.0_f64).powi(0);
    assert_eq!(y, Dual::new(1.0, 0.0));
}

#[test]
fn sqrt_at_zero_has_infinite_slope() {
    let y = Dual::variable(0.0_f64).sqrt();
    assert_eq!(y.re, 0.0);
    assert!(y.eps.is_infinite());
}

// ── Driver ──

#[test]
fn derivative_of_composite() {
    // d/dx exp(x²) = 2x·exp(x²)
    let (v, d) = derivative(|x| (x * x).exp(), 0.9_f64);
    assert_relative_eq!(v, 0.81_f64.exp(), max_relative = 1e-12);
    assert_relative_eq!(d, 1.8 * 0.81_f64.exp(), max_relative = 1e-12);
}

#[test]
fn derivative_f32() {
    let (v, d) = derivative(|x| x * x, 3.0_f32);
    assert_eq!(v, 9.0);
    assert_eq!(d, 6.0);
}

#[test]
fn dual32_elementals() {
    // d/dx √(x² + 7) at x = 3: x / √(x² + 7) = 3/4
    let x = Dual32::variable(3.0);
    let y = (x * x + Dual32::lit(7.0)).sqrt();
    assert_eq!(y.re, 4.0_f32);
    assert_relative_eq!(y.eps, 0.75_f32, max_relative = 1e-6);
}

#[test]
fn lit_lifts_as_constant() {
    let c = Dual64::lit(2.5);
    assert_eq!(c, Dual::new(2.5, 0.0));
    assert!(c.is_finite());
    assert!(!Dual64::lit(f64::NAN).is_finite());
}

#[test]
fn display_shows_tangent() {
    assert_eq!(format!("{}", Dual::new(1.0_f64, 2.0)), "1 + 2ε");
}
