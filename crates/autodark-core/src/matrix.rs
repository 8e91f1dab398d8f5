//! Pixel-wise arithmetic on same-shaped integer matrices.
//!
//! Pixels are `i64` so a sum of the largest calibration set of 32-bit
//! detector values cannot overflow. Division truncates toward zero, which
//! biases each averaged pixel by less than one unit.

use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{AutodarkError, Result};

pub type PixelMatrix = Array2<i64>;

/// Empty buffer with room for `len` pixels, or `AllocationFailed`.
pub fn try_pixel_buffer(len: usize) -> Result<Vec<i64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| AutodarkError::AllocationFailed { pixels: len })?;
    Ok(buf)
}

/// Zero-filled matrix of shape (height, width).
pub fn try_zeros(height: usize, width: usize) -> Result<PixelMatrix> {
    if width == 0 || height == 0 {
        return Err(AutodarkError::InvalidDimensions { width, height });
    }
    let len = height
        .checked_mul(width)
        .ok_or(AutodarkError::AllocationFailed { pixels: usize::MAX })?;
    let mut buf = try_pixel_buffer(len)?;
    buf.resize(len, 0);
    Array2::from_shape_vec((height, width), buf)
        .map_err(|_| AutodarkError::InvalidDimensions { width, height })
}

fn check_shape(a: &PixelMatrix, b: &PixelMatrix) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(AutodarkError::DimensionMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }
    Ok(())
}

fn is_large(m: &PixelMatrix) -> bool {
    m.len() >= PARALLEL_PIXEL_THRESHOLD
}

/// `acc += other`, pixel by pixel.
pub fn add_assign(acc: &mut PixelMatrix, other: &PixelMatrix) -> Result<()> {
    check_shape(acc, other)?;
    if is_large(acc) {
        Zip::from(acc).and(other).par_for_each(|a, &b| *a += b);
    } else {
        Zip::from(acc).and(other).for_each(|a, &b| *a += b);
    }
    Ok(())
}

/// `acc -= other`, pixel by pixel.
pub fn subtract_assign(acc: &mut PixelMatrix, other: &PixelMatrix) -> Result<()> {
    check_shape(acc, other)?;
    if is_large(acc) {
        Zip::from(acc).and(other).par_for_each(|a, &b| *a -= b);
    } else {
        Zip::from(acc).and(other).for_each(|a, &b| *a -= b);
    }
    Ok(())
}

/// `m /= divisor` with integer truncation.
pub fn divide_assign(m: &mut PixelMatrix, divisor: i64) -> Result<()> {
    if divisor == 0 {
        return Err(AutodarkError::ZeroDivisor);
    }
    if divisor == 1 {
        return Ok(());
    }
    if is_large(m) {
        m.par_mapv_inplace(|v| v / divisor);
    } else {
        m.mapv_inplace(|v| v / divisor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_add_and_subtract() {
        let mut a = array![[1i64, 2], [3, 4]];
        let b = array![[10i64, 20], [30, 40]];
        add_assign(&mut a, &b).unwrap();
        assert_eq!(a, array![[11, 22], [33, 44]]);
        subtract_assign(&mut a, &b).unwrap();
        assert_eq!(a, array![[1, 2], [3, 4]]);
    }

    #[test]
    fn test_divide_truncates_toward_zero() {
        let mut m = array![[7i64, -7], [9, 2]];
        divide_assign(&mut m, 2).unwrap();
        assert_eq!(m, array![[3, -3], [4, 1]]);
    }

    #[test]
    fn test_divide_by_zero() {
        let mut m = array![[1i64]];
        assert!(matches!(
            divide_assign(&mut m, 0),
            Err(AutodarkError::ZeroDivisor)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut a = PixelMatrix::zeros((2, 2));
        let b = PixelMatrix::zeros((2, 3));
        assert!(matches!(
            add_assign(&mut a, &b),
            Err(AutodarkError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_large_matrix_takes_parallel_path() {
        let mut a = PixelMatrix::from_elem((300, 300), 5);
        let b = PixelMatrix::from_elem((300, 300), 3);
        add_assign(&mut a, &b).unwrap();
        divide_assign(&mut a, 4).unwrap();
        assert!(a.iter().all(|&v| v == 2));
    }

    #[test]
    fn test_try_zeros_rejects_empty() {
        assert!(try_zeros(0, 4).is_err());
        assert_eq!(try_zeros(2, 3).unwrap().dim(), (2, 3));
    }
}
