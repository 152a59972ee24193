use crate::error::{Error, Result};
use itertools::iproduct;
use nalgebra::{Point2, Vector2};

/// A binary raster. `true` marks a foreground pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    /// An all-background mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Wraps a row-major pixel buffer.
    pub fn from_raw(width: usize, height: usize, data: Vec<bool>) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(Error::MaskShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let data = iproduct!(0..height, 0..width)
            .map(|(y, x)| f(x, y))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// A filled disk, with the centre clamped into the raster so that any
    /// non-degenerate raster gets at least one foreground pixel.
    pub fn disk(width: usize, height: usize, center: (i64, i64), radius: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::new(width, height);
        }
        let cx = center.0.clamp(0, width as i64 - 1);
        let cy = center.1.clamp(0, height as i64 - 1);
        let r2 = i64::from(radius) * i64::from(radius);
        Self::from_fn(width, height, |x, y| {
            let dx = x as i64 - cx;
            let dy = y as i64 - cy;
            dx * dx + dy * dy <= r2
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)` of the raster.
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn total_pixels(&self) -> usize {
        self.data.len()
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&pixel| pixel).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&pixel| pixel)
    }

    /// Coordinates `(x, y)` of every foreground pixel, row by row.
    pub fn foreground(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &pixel)| pixel)
            .map(move |(idx, _)| (idx % width, idx / width))
    }

    /// First-moment centre of the foreground, `None` for an empty mask.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        let (m00, m10, m01) = self
            .foreground()
            .fold((0usize, 0.0, 0.0), |(m00, m10, m01), (x, y)| {
                (m00 + 1, m10 + x as f64, m01 + y as f64)
            });
        if m00 == 0 {
            return None;
        }
        let m00 = m00 as f64;
        Some(Point2::new(m10 / m00, m01 / m00))
    }

    /// Rigidly shifts the foreground by `shift` (rounded to whole pixels) onto
    /// a `width` x `height` raster. Pixels leaving the raster are dropped and
    /// uncovered pixels are background.
    pub fn translated(&self, shift: Vector2<f64>, width: usize, height: usize) -> Mask {
        let mut out = Mask::new(width, height);
        if !shift.x.is_finite() || !shift.y.is_finite() {
            return out;
        }
        let (sx, sy) = (shift.x.round() as i64, shift.y.round() as i64);
        self.foreground()
            .map(|(x, y)| ((x as i64).saturating_add(sx), (y as i64).saturating_add(sy)))
            .filter(|&(x, y)| x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height)
            .for_each(|(x, y)| out.set(x as usize, y as usize, true));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(width: usize, height: usize, x0: usize, y0: usize, side: usize) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    #[test]
    fn centroid_of_square() {
        let mask = square(20, 10, 4, 2, 3);
        let centroid = mask.centroid().unwrap();
        assert_abs_diff_eq!(centroid.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid.y, 3.0, epsilon = 1e-12);
        assert_eq!(mask.foreground_count(), 9);
    }

    #[test]
    fn empty_mask_has_no_centroid() {
        let mask = Mask::new(8, 8);
        assert!(mask.is_empty());
        assert_eq!(mask.centroid(), None);
        assert_eq!(mask.total_pixels(), 64);
    }

    #[test]
    fn from_raw_checks_length() {
        let err = Mask::from_raw(3, 3, vec![false; 8]).unwrap_err();
        assert!(matches!(
            err,
            Error::MaskShape {
                expected: 9,
                actual: 8
            }
        ));
        assert!(Mask::from_raw(3, 3, vec![true; 9]).is_ok());
    }

    #[test]
    fn translation_moves_and_clips() {
        let mask = square(10, 10, 1, 1, 2);
        let moved = mask.translated(Vector2::new(3.0, 4.0), 10, 10);
        assert_eq!(moved.foreground_count(), 4);
        assert!(moved.get(4, 5) && moved.get(5, 6));
        assert!(!moved.get(1, 1));

        let clipped = mask.translated(Vector2::new(7.6, 0.0), 10, 10);
        // Shift rounds to 8, leaving only column 9 inside the raster.
        assert_eq!(clipped.foreground_count(), 2);
        assert!(clipped.get(9, 1) && clipped.get(9, 2));

        let gone = mask.translated(Vector2::new(-50.0, 0.0), 10, 10);
        assert!(gone.is_empty());
    }

    #[test]
    fn translation_onto_other_shape() {
        let mask = square(10, 10, 0, 0, 2);
        let moved = mask.translated(Vector2::new(1.0, 1.0), 3, 3);
        assert_eq!(moved.shape(), (3, 3));
        assert_eq!(moved.foreground_count(), 4);
    }

    #[test]
    fn disk_is_clamped_into_raster() {
        let disk = Mask::disk(50, 40, (25, 20), 5);
        assert!(disk.get(25, 20) && disk.get(30, 20));
        assert!(!disk.get(31, 20));
        let centroid = disk.centroid().unwrap();
        assert_abs_diff_eq!(centroid.x, 25.0, epsilon = 1e-9);

        let outside = Mask::disk(50, 40, (500, -300), 3);
        assert!(!outside.is_empty());
        assert!(outside.get(49, 0));
    }
}
