use crate::{Error, Result};
use ndarray::{s, Array1, ArrayView1};
use ndarray_conv::{ConvExt, ConvMode, PaddingMode};

/// Full discrete linear convolution of two one-dimensional sequences,
/// following numpy's `convolve` in `'full'` mode. The output has
/// `a.len() + v.len() - 1` samples. `v` is taken as the kernel and is assumed
/// to be no longer than `a`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use fbank_core::num_rs::convolve;
///
/// let a = array![1., 2., 3.];
/// let v = array![0., 1., 0.5];
///
/// let result = convolve(a.view(), v.view()).unwrap();
/// assert_eq!(result, array![0., 1., 2.5, 4., 1.5]);
/// ```
pub fn convolve<T>(a: ArrayView1<T>, v: ArrayView1<T>) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + Copy,
{
    // ndarray-conv slides the kernel without flipping it (cross-correlation).
    let flipped = v.slice(s![..;-1]).to_owned();
    a.conv(&flipped.view(), ConvMode::Full, PaddingMode::Zeros)
        .map_err(|e| Error::Conv {
            reason: e.to_string(),
        })
}

/// Multiply two polynomials given by their coefficient sequences.
///
/// Coefficients may be ordered either way (highest power first, or ascending
/// powers of `z^-1`); the product keeps the same ordering. Empty inputs are
/// rejected.
///
/// ```
/// use fbank_core::num_rs::polymul;
///
/// // (1 + z^-1)(1 - z^-1) = 1 - z^-2
/// let p = polymul(&[1.0, 1.0], &[1.0, -1.0]).unwrap();
/// assert_eq!(p, vec![1.0, 0.0, -1.0]);
/// ```
pub fn polymul<T>(a: &[T], b: &[T]) -> Result<Vec<T>>
where
    T: num_traits::NumAssign + Copy,
{
    if a.is_empty() || b.is_empty() {
        return Err(Error::InvalidArg {
            arg: if a.is_empty() { "a" } else { "b" }.to_string(),
            reason: "polynomial must have at least one coefficient".to_string(),
        });
    }
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let product = convolve(ArrayView1::from(long), ArrayView1::from(short))?;
    Ok(product.to_vec())
}
