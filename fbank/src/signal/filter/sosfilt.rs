use super::design::Sos;

/// Run `x` through a cascade of sections, each in direct form II transposed
/// and starting at rest.
pub fn sosfilt(sos: &[Sos], x: &[f64]) -> Vec<f64> {
    let mut y = x.to_vec();
    for section in sos {
        let (b, a) = (section.b(), section.a());
        let (mut z0, mut z1) = (0.0, 0.0);
        for v in y.iter_mut() {
            let xn = *v;
            let yn = b[0] * xn + z0;
            z0 = b[1] * xn - a[1] * yn + z1;
            z1 = b[2] * xn - a[2] * yn;
            *v = yn;
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::lfilter;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cascade_matches_expanded_transfer_function() {
        let first = Sos::from_coefficients([0.2, 0.4, 0.2], [1.0, -0.5, 0.25]).expect("section");
        let second = Sos::from_coefficients([1.0, -1.0, 0.0], [1.0, 0.3, 0.0]).expect("section");
        let x: Vec<f64> = (0..64).map(|n| ((n * 7) % 11) as f64 - 5.0).collect();

        let cascade = sosfilt(&[first, second], &x);
        let staged = lfilter(second.b(), second.a(), &lfilter(first.b(), first.a(), &x).expect("first"))
            .expect("second");
        for (a, b) in cascade.iter().zip(staged.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_cascade_is_identity() {
        assert_eq!(sosfilt(&[], &[1.0, 2.0]), vec![1.0, 2.0]);
    }
}
