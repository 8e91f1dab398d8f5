use crate::error::{AutodarkError, Result};
use crate::frame::ImageHandle;
use crate::matrix::{add_assign, divide_assign, PixelMatrix};

/// Running pixel-wise sum of qualifying calibration frames.
///
/// The sum is turned into an average exactly once, by `into_average`, which
/// consumes the master.
#[derive(Debug)]
pub struct MasterFrame {
    handle: ImageHandle,
    count: usize,
}

impl MasterFrame {
    /// Allocate an in-memory frame shaped like `first` and copy it in.
    pub fn start(first: &PixelMatrix) -> Result<Self> {
        let (height, width) = first.dim();
        let mut handle = ImageHandle::in_memory(width, height)?;
        handle
            .pixels_mut()
            .ok_or(AutodarkError::MissingPixels)?
            .assign(first);
        Ok(Self { handle, count: 1 })
    }

    /// Add one more frame to the sum.
    pub fn accumulate(&mut self, frame: &PixelMatrix) -> Result<()> {
        let sum = self.handle.pixels_mut().ok_or(AutodarkError::MissingPixels)?;
        add_assign(sum, frame)?;
        self.count += 1;
        Ok(())
    }

    /// Number of frames folded in so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// (height, width) of the accumulator.
    pub fn dim(&self) -> (usize, usize) {
        (self.handle.height(), self.handle.width())
    }

    /// The unaveraged sum.
    pub fn sum(&self) -> Option<&PixelMatrix> {
        self.handle.pixels()
    }

    /// Divide the sum by the frame count (integer truncation).
    pub fn into_average(mut self) -> Result<PixelMatrix> {
        let mut sum = self.take_sum()?;
        divide_assign(&mut sum, self.count as i64)?;
        Ok(sum)
    }

    fn take_sum(&mut self) -> Result<PixelMatrix> {
        self.handle.take_pixels().ok_or(AutodarkError::MissingPixels)
    }
}

/// Fold a frame into an optional master, starting it on the first frame.
pub fn fold_frame(master: &mut Option<MasterFrame>, frame: &PixelMatrix) -> Result<()> {
    match master {
        Some(m) => m.accumulate(frame),
        None => {
            *master = Some(MasterFrame::start(frame)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_frame_average_is_exact() {
        let frame = array![[101i64, 7], [-3, 65_535]];
        let master = MasterFrame::start(&frame).unwrap();
        assert_eq!(master.count(), 1);
        assert_eq!(master.into_average().unwrap(), frame);
    }

    #[test]
    fn test_first_frame_is_copied_not_summed() {
        let mut master = None;
        fold_frame(&mut master, &array![[5i64, 5]]).unwrap();
        let master = master.unwrap();
        assert_eq!(master.sum().unwrap(), &array![[5i64, 5]]);
    }

    #[test]
    fn test_average_truncates() {
        let mut master = None;
        for frame in [array![[10i64]], array![[11i64]], array![[11i64]]] {
            fold_frame(&mut master, &frame).unwrap();
        }
        let master = master.unwrap();
        assert_eq!(master.count(), 3);
        assert_eq!(master.sum().unwrap()[[0, 0]], 32);
        assert_eq!(master.into_average().unwrap()[[0, 0]], 10);
    }

    #[test]
    fn test_mismatched_frame_is_rejected_and_not_counted() {
        let mut master = MasterFrame::start(&array![[1i64, 2]]).unwrap();
        assert!(master.accumulate(&array![[1i64], [2]]).is_err());
        assert_eq!(master.count(), 1);
    }
}
