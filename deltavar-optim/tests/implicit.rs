use approx::assert_relative_eq;
use deltavar::ForwardModel;
use deltavar_optim::linalg::matmul;
use deltavar_optim::{
    analytic_estimates, loss_derivatives, propagate_covariance, retrieval_jacobian,
    DerivativeSource, NoiseCovariance, OperatingPoint, PropagationError,
};

const SOURCES: [DerivativeSource; 2] = [DerivativeSource::Automatic, DerivativeSource::ClosedForm];

/// Operating points with a non-zero residual for every model.
fn perturbed_points() -> Vec<(ForwardModel, OperatingPoint)> {
    vec![
        (
            ForwardModel::quadratic(),
            OperatingPoint::new(5.1, &[249.0, 262.0]),
        ),
        (
            ForwardModel::quarter_circle(),
            OperatingPoint::new(4.6, &[5.5, 4.9]),
        ),
        (ForwardModel::cubic(), OperatingPoint::new(6.2, &[-3.0, -2.1])),
        (
            ForwardModel::exponential(),
            OperatingPoint::new(4.8, &[14.0, 15.5]),
        ),
    ]
}

fn correlated_noise() -> NoiseCovariance {
    NoiseCovariance::full(vec![vec![2.0, 0.6], vec![0.6, 0.5]]).unwrap()
}

// ── Known values ──

#[test]
fn quadratic_exact_fit_values() {
    // f = 10x², x̂ = 5, y = 250: f' = 100, H = 2f'² = 2e4, J_xy = −2f' = −200
    let point = OperatingPoint::new(5.0, &[250.0]);
    let noise = NoiseCovariance::isotropic(1, 20.0).unwrap();
    for source in SOURCES {
        let est = analytic_estimates(&ForwardModel::quadratic(), &point, &noise, source).unwrap();
        assert_relative_eq!(est.derivatives.value, 0.0);
        assert_relative_eq!(est.derivatives.gradient[0], 0.0);
        assert_relative_eq!(est.derivatives.hessian[0][0], 20_000.0, max_relative = 1e-12);
        assert_relative_eq!(est.derivatives.mixed[0][0], -200.0, max_relative = 1e-12);
        assert_relative_eq!(est.retrieval_jacobian[0][0], 0.01, max_relative = 1e-12);
        assert_relative_eq!(est.ift_variance(), 2e-3, max_relative = 1e-12);
        assert_relative_eq!(est.laplace_variance(), 2e-3, max_relative = 1e-12);
        assert_relative_eq!(est.laplace_simple_variance(), 1e-3, max_relative = 1e-12);
    }
}

#[test]
fn residual_enters_the_hessian() {
    // r = 10, f'' = 20: H = 2(f'² − r f'') = 19600
    let point = OperatingPoint::new(5.0, &[260.0]);
    let derivs = loss_derivatives(&ForwardModel::quadratic(), &point, DerivativeSource::Automatic);
    assert_relative_eq!(derivs.value, 100.0, max_relative = 1e-12);
    assert_relative_eq!(derivs.gradient[0], -2000.0, max_relative = 1e-12);
    assert_relative_eq!(derivs.hessian[0][0], 19_600.0, max_relative = 1e-12);
}

#[test]
fn closed_form_matches_automatic() {
    for (model, point) in perturbed_points() {
        let ad = loss_derivatives(&model, &point, DerivativeSource::Automatic);
        let cf = loss_derivatives(&model, &point, DerivativeSource::ClosedForm);
        assert_relative_eq!(ad.value, cf.value, max_relative = 1e-12);
        assert_relative_eq!(ad.gradient[0], cf.gradient[0], max_relative = 1e-10);
        assert_relative_eq!(ad.hessian[0][0], cf.hessian[0][0], max_relative = 1e-10);
        assert_eq!(ad.mixed[0].len(), 2);
        for (a, c) in ad.mixed[0].iter().zip(&cf.mixed[0]) {
            assert_relative_eq!(a, c, max_relative = 1e-10);
        }
    }
}

// ── Laplace / IFT equivalence ──

#[test]
fn corrected_laplace_equals_ift() {
    let noise = correlated_noise();
    for (model, point) in perturbed_points() {
        for source in SOURCES {
            let est = analytic_estimates(&model, &point, &noise, source)
                .unwrap_or_else(|e| panic!("{model}: {e}"));
            assert_relative_eq!(est.laplace_variance(), est.ift_variance(), max_relative = 1e-6);
            assert!(est.ift_variance() > 0.0);
        }
    }
}

#[test]
fn naive_laplace_uses_mean_variance() {
    let noise = correlated_noise();
    let (model, point) = perturbed_points().remove(2);
    let est = analytic_estimates(&model, &point, &noise, DerivativeSource::ClosedForm).unwrap();
    assert_relative_eq!(
        est.laplace_simple_variance(),
        1.25 / est.derivatives.hessian[0][0],
        max_relative = 1e-12
    );
}

#[test]
fn ift_matches_sandwich_formula() {
    let noise = correlated_noise();
    let (model, point) = perturbed_points().remove(3);
    let est = analytic_estimates(&model, &point, &noise, DerivativeSource::Automatic).unwrap();
    let j = &est.retrieval_jacobian[0];
    let sigma = noise.matrix();
    let expected: f64 = (0..2)
        .flat_map(|a| (0..2).map(move |b| (a, b)))
        .map(|(a, b)| j[a] * sigma[a][b] * j[b])
        .sum();
    assert_relative_eq!(est.ift_variance(), expected, max_relative = 1e-12);
}

// ── Building blocks ──

#[test]
fn retrieval_jacobian_two_by_two() {
    // H = [[2, 0], [0, 4]], J = [[1, 2], [4, 8]] → −H⁻¹J = [[−0.5, −1], [−1, −2]]
    let h = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
    let j = vec![vec![1.0, 2.0], vec![4.0, 8.0]];
    let jr = retrieval_jacobian(&h, &j).unwrap();
    assert_eq!(jr, vec![vec![-0.5, -1.0], vec![-1.0, -2.0]]);

    let back = matmul(&h, &jr);
    assert_eq!(back, vec![vec![-1.0, -2.0], vec![-4.0, -8.0]]);
}

#[test]
fn retrieval_jacobian_singular_is_none() {
    let h = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
    assert!(retrieval_jacobian(&h, &[vec![1.0], vec![1.0]]).is_none());
}

#[test]
fn propagate_scalar_covariance() {
    let noise = NoiseCovariance::isotropic(2, 3.0).unwrap();
    let cov = propagate_covariance(&[vec![1.0, -2.0]], &noise);
    assert_relative_eq!(cov[0][0], 15.0);
}

// ── Failures ──

#[test]
fn quarter_circle_at_radius_is_singular() {
    let point = OperatingPoint::new(7.0, &[0.0]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    for source in SOURCES {
        let err = analytic_estimates(&ForwardModel::quarter_circle(), &point, &noise, source)
            .unwrap_err();
        assert!(
            matches!(err, PropagationError::SingularCurvature { .. }),
            "{source:?}: {err}"
        );
    }
}

#[test]
fn flat_hessian_is_singular() {
    // f'(0) = 0 and r = 0 → H = 0
    let point = OperatingPoint::new(0.0, &[0.0]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    let err = analytic_estimates(
        &ForwardModel::quadratic(),
        &point,
        &noise,
        DerivativeSource::Automatic,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PropagationError::SingularCurvature {
            hessian: vec![vec![0.0]],
            reason: "singular",
        }
    );
}

#[test]
fn cancelled_hessian_is_ill_conditioned() {
    // Quadratic at x̂ = 0.1: f' = 2, f'' = 20. A residual of f'²/f'' − δ makes
    // H = 2(f'² − r f'') = 40δ, far below the 16 its terms add up to.
    let model = ForwardModel::quadratic();
    let x = 0.1;
    let residual = 4.0 / 20.0 - 1e-9;
    let point = OperatingPoint::new(x, &[model.evaluate(x) + residual]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    for source in SOURCES {
        let derivs = loss_derivatives(&model, &point, source);
        assert!(derivs.hessian[0][0] > 0.0);
        assert_relative_eq!(derivs.curvature_scale, 16.0, max_relative = 1e-9);

        let err = analytic_estimates(&model, &point, &noise, source).unwrap_err();
        assert!(
            matches!(
                err,
                PropagationError::SingularCurvature {
                    reason: "ill-conditioned",
                    ..
                }
            ),
            "{source:?}: {err}"
        );
    }
}

#[test]
fn moderate_cancellation_is_accepted() {
    // Same point with δ = 1e-3: H/scale = 2.5e-3, still well resolved.
    let model = ForwardModel::quadratic();
    let point = OperatingPoint::new(0.1, &[model.evaluate(0.1) + 0.2 - 1e-3]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    let est = analytic_estimates(&model, &point, &noise, DerivativeSource::ClosedForm).unwrap();
    assert_relative_eq!(est.derivatives.hessian[0][0], 0.04, max_relative = 1e-9);
}

#[test]
fn quarter_circle_near_radius_is_finite() {
    // Steep slope, large but well-resolved Hessian: σ²/f'² is small.
    let model = ForwardModel::quarter_circle();
    let x = 6.999_999_99;
    let point = OperatingPoint::new(x, &[model.evaluate(x)]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    for source in SOURCES {
        let est = analytic_estimates(&model, &point, &noise, source).unwrap();
        let slope = model.derivative(x);
        assert!(est.derivatives.hessian[0][0] > 1e8);
        assert_relative_eq!(est.ift_variance(), 1.0 / (slope * slope), max_relative = 1e-6);
        assert_relative_eq!(est.laplace_variance(), est.ift_variance(), max_relative = 1e-6);
    }
}

#[test]
fn negative_curvature_is_rejected() {
    // f'(0) = 0, r = 10, f'' = 20 → H = −400, a maximum of the loss
    let point = OperatingPoint::new(0.0, &[10.0]);
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    let err = analytic_estimates(
        &ForwardModel::quadratic(),
        &point,
        &noise,
        DerivativeSource::ClosedForm,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PropagationError::SingularCurvature {
            reason: "not positive definite",
            ..
        }
    ));
}

#[test]
fn outside_domain_is_rejected() {
    let noise = NoiseCovariance::isotropic(1, 1.0).unwrap();
    for x in [7.5, -8.0, f64::NAN] {
        let point = OperatingPoint::new(x, &[1.0]);
        let err = analytic_estimates(
            &ForwardModel::quarter_circle(),
            &point,
            &noise,
            DerivativeSource::Automatic,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PropagationError::DomainViolation {
                model: "quarter-circle",
                ..
            }
        ));
    }
    let point = OperatingPoint::new(f64::INFINITY, &[1.0]);
    assert!(matches!(
        analytic_estimates(&ForwardModel::cubic(), &point, &noise, DerivativeSource::Automatic),
        Err(PropagationError::DomainViolation { .. })
    ));
}

#[test]
fn non_finite_observation_is_rejected() {
    let noise = NoiseCovariance::isotropic(2, 1.0).unwrap();
    let point = OperatingPoint::new(5.0, &[250.0, f64::INFINITY]);
    let err = analytic_estimates(
        &ForwardModel::quadratic(),
        &point,
        &noise,
        DerivativeSource::Automatic,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PropagationError::NonFiniteObservation {
            index: 1,
            value: f64::INFINITY
        }
    );
}

#[test]
fn dimension_mismatch_is_rejected() {
    let noise = NoiseCovariance::isotropic(3, 1.0).unwrap();
    let point = OperatingPoint::new(5.0, &[250.0]);
    let err = analytic_estimates(
        &ForwardModel::quadratic(),
        &point,
        &noise,
        DerivativeSource::Automatic,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PropagationError::DimensionMismatch {
            expected: 3,
            found: 1
        }
    );
}

#[test]
fn derivative_source_parses() {
    assert_eq!("automatic".parse(), Ok(DerivativeSource::Automatic));
    assert_eq!("closed-form".parse(), Ok(DerivativeSource::ClosedForm));
    assert_eq!("closed_form".parse(), Ok(DerivativeSource::ClosedForm));
    assert!("numeric".parse::<DerivativeSource>().is_err());
}
