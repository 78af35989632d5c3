use approx::assert_relative_eq;
use deltavar::{batch_loss, derivative, reconstruction_loss, Dual64, ForwardModel, Scalar};

#[test]
fn zero_at_exact_fit() {
    let model = ForwardModel::quadratic();
    assert_eq!(reconstruction_loss(&model, &[250.0, 250.0], 5.0), 0.0);
}

#[test]
fn mean_over_observation_components() {
    let model = ForwardModel::quadratic();
    // residuals 1 and -3 → (1 + 9) / 2
    assert_relative_eq!(reconstruction_loss(&model, &[251.0, 247.0], 5.0), 5.0);
}

#[test]
fn empty_observation_is_nan() {
    let model = ForwardModel::cubic();
    assert!(reconstruction_loss::<f64>(&model, &[], 1.0).is_nan());
}

#[test]
fn gradient_in_latent_matches_closed_form() {
    let model = ForwardModel::exponential();
    let y = [4.0, 6.5, 5.1];
    let x = 2.7;
    let y_dual: Vec<Dual64> = y.iter().map(|&v| Dual64::from_f(v)).collect();
    let (_, g) = derivative(|xd| reconstruction_loss(&model, &y_dual, xd), x);

    let f = model.evaluate(x);
    let expected = -2.0 / 3.0 * y.iter().map(|&v| v - f).sum::<f64>() * model.derivative(x);
    assert_relative_eq!(g, expected, max_relative = 1e-12);
}

#[test]
fn batch_loss_is_mean_of_trial_losses() {
    let model = ForwardModel::quadratic();
    let observations = [251.0, 247.0, 40.0, 42.0];
    let estimates = [5.0, 2.0];
    let expected = (5.0 + (0.0 + 4.0) / 2.0) / 2.0;
    assert_relative_eq!(batch_loss(&model, &observations, 2, &estimates), expected);
}

#[test]
#[should_panic(expected = "observations length")]
fn batch_loss_rejects_ragged_input() {
    batch_loss(&ForwardModel::quadratic(), &[1.0, 2.0, 3.0], 2, &[1.0, 1.0]);
}
