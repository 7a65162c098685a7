//! Block PMCC - windowed Pearson correlation between two rasters
//!
//! Computes, per output pixel, Pearson's product-moment correlation
//! coefficient over a rectangular neighborhood of two float rasters that
//! may be registered against each other with an integer offset. Five
//! integral tables back the computation: sums and sums of squares of
//! both rasters, plus the cross-product sum over their overlap.
//!
//! The four per-raster tables depend only on the raster contents and are
//! built once at construction. Only the cross-product table depends on
//! the offset; [`BlockPmcc::set_offset`] rebuilds exactly that table and
//! nothing else.

use blockstat_core::{Raster, SampleFormat};

use crate::error::{StatError, StatResult};
use crate::table::DoubleIntegralTable;

/// Offset bookkeeping for the currently valid overlap rectangle.
///
/// A negative raw offset means the moving raster X is read starting at
/// the offset magnitude and the target raster Y at zero; a positive one
/// swaps the roles. The overlap dimension is whatever remains in both
/// rasters after shifting.
#[derive(Debug, Clone, Copy)]
struct Overlap {
    width: i32,
    height: i32,
    offset_xx: i32,
    offset_yx: i32,
    offset_xy: i32,
    offset_yy: i32,
}

/// Windowed Pearson correlation of two float rasters.
///
/// # Examples
///
/// ```
/// use blockstat_core::{Raster, SampleFormat};
/// use blockstat_integral::BlockPmcc;
///
/// let a = Raster::from_float(3, 3, (0..9).map(|v| v as f32).collect()).unwrap();
/// let mut pmcc = BlockPmcc::with_offset(&a, &a, 0, 0).unwrap();
/// pmcc.correlate(1, 1).unwrap();
/// // a raster correlates perfectly with itself
/// assert!((pmcc.target().getf_pixel(1, 1).unwrap() - 1.0).abs() < 1e-6);
/// ```
pub struct BlockPmcc<'a> {
    x: &'a Raster,
    y: &'a Raster,
    target: Raster,
    sums_x: DoubleIntegralTable,
    sums_xx: DoubleIntegralTable,
    sums_y: DoubleIntegralTable,
    sums_yy: DoubleIntegralTable,
    sums_xy: DoubleIntegralTable,
    overlap: Option<Overlap>,
}

fn check_float(raster: &Raster) -> StatResult<()> {
    if raster.format() != SampleFormat::Float {
        return Err(StatError::UnsupportedFormat {
            expected: "32-bit float",
            actual: raster.format(),
        });
    }
    Ok(())
}

/// Build the sum and sum-of-squares tables of one raster in two passes.
fn sum_and_sum_of_squares(raster: &Raster) -> (DoubleIntegralTable, DoubleIntegralTable) {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let w = width + 1;
    let h = height + 1;
    let mut sum = vec![0.0f64; w * h];
    let mut sum_sq = vec![0.0f64; w * h];

    // rows
    for j in 1..h {
        let row = j * w + 1;
        let mut row_sum = 0.0f64;
        let mut row_sum_sq = 0.0f64;
        for i in 0..width {
            let a = f64::from(raster.getf_pixel_unchecked(i as u32, (j - 1) as u32));
            row_sum += a;
            sum[row + i] = row_sum;
            row_sum_sq += a * a;
            sum_sq[row + i] = row_sum_sq;
        }
    }

    // columns
    for j in 1..h {
        let row = j * w + 1;
        let above = row - w;
        for i in 0..width {
            sum[row + i] += sum[above + i];
            sum_sq[row + i] += sum_sq[above + i];
        }
    }

    (
        DoubleIntegralTable::from_raw(sum, raster.width(), raster.height()),
        DoubleIntegralTable::from_raw(sum_sq, raster.width(), raster.height()),
    )
}

/// Fused variant of [`sum_and_sum_of_squares`] for two equal-sized
/// rasters, filling all four tables in one sweep over the samples.
#[allow(clippy::type_complexity)]
fn sum_and_sum_of_squares_pair(
    a: &Raster,
    b: &Raster,
) -> (
    DoubleIntegralTable,
    DoubleIntegralTable,
    DoubleIntegralTable,
    DoubleIntegralTable,
) {
    let width = a.width() as usize;
    let height = a.height() as usize;
    let w = width + 1;
    let h = height + 1;
    let mut sum_a = vec![0.0f64; w * h];
    let mut sum_sq_a = vec![0.0f64; w * h];
    let mut sum_b = vec![0.0f64; w * h];
    let mut sum_sq_b = vec![0.0f64; w * h];

    // rows
    for j in 1..h {
        let row = j * w + 1;
        let mut row_sum_a = 0.0f64;
        let mut row_sum_sq_a = 0.0f64;
        let mut row_sum_b = 0.0f64;
        let mut row_sum_sq_b = 0.0f64;
        for i in 0..width {
            let va = f64::from(a.getf_pixel_unchecked(i as u32, (j - 1) as u32));
            row_sum_a += va;
            sum_a[row + i] = row_sum_a;
            row_sum_sq_a += va * va;
            sum_sq_a[row + i] = row_sum_sq_a;

            let vb = f64::from(b.getf_pixel_unchecked(i as u32, (j - 1) as u32));
            row_sum_b += vb;
            sum_b[row + i] = row_sum_b;
            row_sum_sq_b += vb * vb;
            sum_sq_b[row + i] = row_sum_sq_b;
        }
    }

    // columns
    for j in 1..h {
        let row = j * w + 1;
        let above = row - w;
        for i in 0..width {
            sum_a[row + i] += sum_a[above + i];
            sum_sq_a[row + i] += sum_sq_a[above + i];
            sum_b[row + i] += sum_b[above + i];
            sum_sq_b[row + i] += sum_sq_b[above + i];
        }
    }

    let width = a.width();
    let height = a.height();
    (
        DoubleIntegralTable::from_raw(sum_a, width, height),
        DoubleIntegralTable::from_raw(sum_sq_a, width, height),
        DoubleIntegralTable::from_raw(sum_b, width, height),
        DoubleIntegralTable::from_raw(sum_sq_b, width, height),
    )
}

impl<'a> BlockPmcc<'a> {
    /// Set up correlation of moving raster `x` against target raster `y`.
    ///
    /// Builds the four per-raster tables immediately; equal-sized rasters
    /// share one fused pass, differing sizes get one pass each. The
    /// cross-product table stays unset until [`BlockPmcc::set_offset`] is
    /// called, and the correlation queries fail with
    /// [`StatError::OffsetNotSet`] until then.
    ///
    /// The output raster is created once here: at the overlap size for
    /// equal inputs, at the target's size otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::UnsupportedFormat`] unless both rasters are
    /// float.
    pub fn new(x: &'a Raster, y: &'a Raster) -> StatResult<Self> {
        check_float(x)?;
        check_float(y)?;

        let (sums_x, sums_xx, sums_y, sums_yy) = if x.dimensions() == y.dimensions() {
            sum_and_sum_of_squares_pair(x, y)
        } else {
            let (sums_x, sums_xx) = sum_and_sum_of_squares(x);
            let (sums_y, sums_yy) = sum_and_sum_of_squares(y);
            (sums_x, sums_xx, sums_y, sums_yy)
        };

        let overlap_width = x.width().min(y.width());
        let overlap_height = x.height().min(y.height());
        let sums_xy = DoubleIntegralTable::new_zeroed(overlap_width, overlap_height);
        let target = Raster::new(y.width(), y.height(), SampleFormat::Float)?;

        Ok(BlockPmcc {
            x,
            y,
            target,
            sums_x,
            sums_xx,
            sums_y,
            sums_yy,
            sums_xy,
            overlap: None,
        })
    }

    /// As [`BlockPmcc::new`], then immediately establish the offset.
    pub fn with_offset(
        x: &'a Raster,
        y: &'a Raster,
        offset_x: i32,
        offset_y: i32,
    ) -> StatResult<Self> {
        let mut pmcc = Self::new(x, y)?;
        pmcc.set_offset(offset_x, offset_y);
        Ok(pmcc)
    }

    /// The output raster the correlation queries write into.
    pub fn target(&self) -> &Raster {
        &self.target
    }

    /// Surrender the output raster.
    pub fn into_target(self) -> Raster {
        self.target
    }

    /// Register the moving raster at `(offset_x, offset_y)` relative to
    /// the target and rebuild the cross-product table for the resulting
    /// overlap rectangle.
    ///
    /// Only the cross-product table is touched; the four per-raster
    /// tables are offset-independent and never rebuilt. An offset that
    /// leaves no overlap is not an error: the overlap is empty and the
    /// correlation queries write nothing.
    pub fn set_offset(&mut self, offset_x: i32, offset_y: i32) {
        let x_width = self.x.width() as i32;
        let x_height = self.x.height() as i32;
        let y_width = self.y.width() as i32;
        let y_height = self.y.height() as i32;

        let (offset_xx, offset_xy, a, b) = if offset_x < 0 {
            (-offset_x, 0, x_width + offset_x, y_width)
        } else {
            (0, offset_x, x_width, y_width - offset_x)
        };
        let width = a.min(b).max(0);

        let (offset_yx, offset_yy, a, b) = if offset_y < 0 {
            (-offset_y, 0, x_height + offset_y, y_height)
        } else {
            (0, offset_y, x_height, y_height - offset_y)
        };
        let height = a.min(b).max(0);

        if width > 0 && height > 0 {
            let w = self.sums_xy.width() as usize + 1;
            let xr = self.x;
            let yr = self.y;
            let data = self.sums_xy.data_mut();

            // first overlap row
            let mut s = 0.0f64;
            for x in 0..width as usize {
                let vx = xr.getf_pixel_unchecked((x as i32 + offset_xx) as u32, offset_yx as u32);
                let vy = yr.getf_pixel_unchecked((x as i32 + offset_xy) as u32, offset_yy as u32);
                s += f64::from(vx) * f64::from(vy);
                data[w + 1 + x] = s;
            }

            // remaining rows via the four-cell recurrence
            for y in 1..height as usize {
                let row_x = (y as i32 + offset_yx) as u32;
                let row_y = (y as i32 + offset_yy) as u32;
                let row = (y + 1) * w + 1;
                let above = row - w;

                let vx = xr.getf_pixel_unchecked(offset_xx as u32, row_x);
                let vy = yr.getf_pixel_unchecked(offset_xy as u32, row_y);
                data[row] = data[above] + f64::from(vx) * f64::from(vy);

                for x in 1..width as usize {
                    let vx = xr.getf_pixel_unchecked((x as i32 + offset_xx) as u32, row_x);
                    let vy = yr.getf_pixel_unchecked((x as i32 + offset_xy) as u32, row_y);
                    data[row + x] = data[above + x] + data[row + x - 1]
                        + f64::from(vx) * f64::from(vy)
                        - data[above + x - 1];
                }
            }
        }

        self.overlap = Some(Overlap {
            width,
            height,
            offset_xx,
            offset_yx,
            offset_xy,
            offset_yy,
        });
    }

    /// Write the block correlation coefficient r for every pixel of the
    /// overlap rectangle into the output raster.
    ///
    /// The window at (x, y) is `(x - rx - 1, x + rx] x (y - ry - 1,
    /// y + ry]`, clamped to `[-1, overlap_dim - 1]` per the table's
    /// exclusive-lower-bound convention. Windows with zero variance in
    /// either raster produce NaN, the defined "no correlation" result.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::OffsetNotSet`] if no offset was ever
    /// established.
    pub fn correlate(&mut self, radius_x: u32, radius_y: u32) -> StatResult<()> {
        let ov = self.overlap.ok_or(StatError::OffsetNotSet)?;
        let radius_x = radius_x as i32;
        let radius_y = radius_y as i32;
        let w = ov.width - 1;
        let h = ov.height - 1;

        for y in 0..=h {
            let y_min = (-1).max(y - radius_y - 1);
            let y_max = h.min(y + radius_y);
            let y_min_x = y_min + ov.offset_yx;
            let y_max_x = y_max + ov.offset_yx;
            let y_min_y = y_min + ov.offset_yy;
            let y_max_y = y_max + ov.offset_yy;

            let bh = f64::from(y_max - y_min);

            for x in 0..=w {
                let x_min = (-1).max(x - radius_x - 1);
                let x_max = w.min(x + radius_x);
                let x_min_x = x_min + ov.offset_xx;
                let x_max_x = x_max + ov.offset_xx;
                let x_min_y = x_min + ov.offset_xy;
                let x_max_y = x_max + ov.offset_xy;

                let n = f64::from(x_max - x_min) * bh;

                let sum_x = self.sums_x.sum(x_min_x, y_min_x, x_max_x, y_max_x);
                let sum_xx = self.sums_xx.sum(x_min_x, y_min_x, x_max_x, y_max_x);
                let sum_y = self.sums_y.sum(x_min_y, y_min_y, x_max_y, y_max_y);
                let sum_yy = self.sums_yy.sum(x_min_y, y_min_y, x_max_y, y_max_y);
                let sum_xy = self.sums_xy.sum(x_min, y_min, x_max, y_max);

                let a = n * sum_xy - sum_x * sum_y;
                let b = (n * sum_xx - sum_x * sum_x).sqrt() * (n * sum_yy - sum_y * sum_y).sqrt();

                self.target
                    .setf_pixel_unchecked(x as u32, y as u32, (a / b) as f32);
            }
        }

        Ok(())
    }

    /// Write the signed square of the block correlation coefficient,
    /// `sign(a) * a^2 / b^2`, for every pixel of the overlap rectangle.
    ///
    /// A monotonic transform of r that avoids the two square roots; the
    /// denominator is the plain product of the two variance terms.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::OffsetNotSet`] if no offset was ever
    /// established.
    pub fn correlate_signed_square(&mut self, radius_x: u32, radius_y: u32) -> StatResult<()> {
        let ov = self.overlap.ok_or(StatError::OffsetNotSet)?;
        let radius_x = radius_x as i32;
        let radius_y = radius_y as i32;
        let w = ov.width - 1;
        let h = ov.height - 1;

        for y in 0..=h {
            let y_min = (-1).max(y - radius_y - 1);
            let y_max = h.min(y + radius_y);
            let y_min_x = y_min + ov.offset_yx;
            let y_max_x = y_max + ov.offset_yx;
            let y_min_y = y_min + ov.offset_yy;
            let y_max_y = y_max + ov.offset_yy;

            let bh = f64::from(y_max - y_min);

            for x in 0..=w {
                let x_min = (-1).max(x - radius_x - 1);
                let x_max = w.min(x + radius_x);
                let x_min_x = x_min + ov.offset_xx;
                let x_max_x = x_max + ov.offset_xx;
                let x_min_y = x_min + ov.offset_xy;
                let x_max_y = x_max + ov.offset_xy;

                let n = f64::from(x_max - x_min) * bh;

                let sum_x = self.sums_x.sum(x_min_x, y_min_x, x_max_x, y_max_x);
                let sum_xx = self.sums_xx.sum(x_min_x, y_min_x, x_max_x, y_max_x);
                let sum_y = self.sums_y.sum(x_min_y, y_min_y, x_max_y, y_max_y);
                let sum_yy = self.sums_yy.sum(x_min_y, y_min_y, x_max_y, y_max_y);
                let sum_xy = self.sums_xy.sum(x_min, y_min, x_max, y_max);

                let a = n * sum_xy - sum_x * sum_y;
                let b = (n * sum_xx - sum_x * sum_x) * (n * sum_yy - sum_y * sum_y);

                let value = if a < 0.0 { -a * a / b } else { a * a / b };
                self.target
                    .setf_pixel_unchecked(x as u32, y as u32, value as f32);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raster(width: u32, height: u32) -> Raster {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x * 3 + y * 7) as f32);
            }
        }
        Raster::from_float(width, height, data).unwrap()
    }

    #[test]
    fn test_self_correlation_is_one() {
        let raster = gradient_raster(8, 6);
        let mut pmcc = BlockPmcc::with_offset(&raster, &raster, 0, 0).unwrap();
        pmcc.correlate(1, 1).unwrap();

        for y in 0..6 {
            for x in 0..8 {
                let r = pmcc.target().getf_pixel_unchecked(x, y);
                assert!(
                    (r - 1.0).abs() < 1e-6,
                    "r at ({},{}) = {}, expected 1.0",
                    x,
                    y,
                    r
                );
            }
        }
    }

    #[test]
    fn test_constant_rasters_yield_nan() {
        let raster = Raster::from_float(4, 4, vec![10.0; 16]).unwrap();
        let mut pmcc = BlockPmcc::with_offset(&raster, &raster, 0, 0).unwrap();
        pmcc.correlate(1, 1).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                let r = pmcc.target().getf_pixel_unchecked(x, y);
                assert!(r.is_nan(), "r at ({},{}) = {}, expected NaN", x, y, r);
            }
        }
    }

    #[test]
    fn test_perfect_anticorrelation() {
        let a = Raster::from_float(3, 3, (1..=9).map(|v| v as f32).collect()).unwrap();
        let b = Raster::from_float(3, 3, (1..=9).rev().map(|v| v as f32).collect()).unwrap();
        let mut pmcc = BlockPmcc::with_offset(&a, &b, 0, 0).unwrap();
        pmcc.correlate(2, 2).unwrap();

        for y in 0..3 {
            for x in 0..3 {
                let r = pmcc.target().getf_pixel_unchecked(x, y);
                assert!(
                    (r + 1.0).abs() < 1e-6,
                    "r at ({},{}) = {}, expected -1.0",
                    x,
                    y,
                    r
                );
            }
        }
    }

    #[test]
    fn test_signed_square_of_anticorrelation() {
        let a = Raster::from_float(3, 3, (1..=9).map(|v| v as f32).collect()).unwrap();
        let b = Raster::from_float(3, 3, (1..=9).rev().map(|v| v as f32).collect()).unwrap();
        let mut pmcc = BlockPmcc::with_offset(&a, &b, 0, 0).unwrap();
        pmcc.correlate_signed_square(2, 2).unwrap();

        for y in 0..3 {
            for x in 0..3 {
                let r = pmcc.target().getf_pixel_unchecked(x, y);
                assert!(
                    (r + 1.0).abs() < 1e-6,
                    "r^2 at ({},{}) = {}, expected -1.0",
                    x,
                    y,
                    r
                );
            }
        }
    }

    #[test]
    fn test_correlate_requires_offset() {
        let raster = gradient_raster(4, 4);
        let mut pmcc = BlockPmcc::new(&raster, &raster).unwrap();
        assert!(matches!(
            pmcc.correlate(1, 1),
            Err(StatError::OffsetNotSet)
        ));
        assert!(matches!(
            pmcc.correlate_signed_square(1, 1),
            Err(StatError::OffsetNotSet)
        ));

        pmcc.set_offset(0, 0);
        assert!(pmcc.correlate(1, 1).is_ok());
    }

    #[test]
    fn test_rejects_non_float_rasters() {
        let gray = Raster::new(4, 4, SampleFormat::Gray8).unwrap();
        let float = Raster::new(4, 4, SampleFormat::Float).unwrap();
        assert!(matches!(
            BlockPmcc::new(&gray, &float),
            Err(StatError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            BlockPmcc::new(&float, &gray),
            Err(StatError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_differing_sizes_target_matches_y() {
        let x = gradient_raster(6, 5);
        let y = gradient_raster(4, 4);
        let pmcc = BlockPmcc::with_offset(&x, &y, 0, 0).unwrap();
        assert_eq!(pmcc.target().dimensions(), (4, 4));
    }

    #[test]
    fn test_offset_swap_symmetry() {
        let a = gradient_raster(5, 4);
        let mut b_data = Vec::new();
        for y in 0..4u32 {
            for x in 0..5u32 {
                b_data.push(((x * x + 2 * y) % 13) as f32);
            }
        }
        let b = Raster::from_float(5, 4, b_data).unwrap();

        let mut forward = BlockPmcc::with_offset(&a, &b, 1, -1).unwrap();
        forward.correlate(1, 1).unwrap();
        let mut backward = BlockPmcc::with_offset(&b, &a, -1, 1).unwrap();
        backward.correlate(1, 1).unwrap();

        // overlap is 4x3 in both directions
        for y in 0..3 {
            for x in 0..4 {
                let rf = forward.target().getf_pixel_unchecked(x, y);
                let rb = backward.target().getf_pixel_unchecked(x, y);
                assert!(
                    (rf - rb).abs() < 1e-12 || (rf.is_nan() && rb.is_nan()),
                    "asymmetry at ({},{}): {} vs {}",
                    x,
                    y,
                    rf,
                    rb
                );
            }
        }
    }

    #[test]
    fn test_reoffset_rebuilds_cross_table_only() {
        let a = gradient_raster(6, 6);
        let b = gradient_raster(6, 6);
        let mut pmcc = BlockPmcc::with_offset(&a, &b, 0, 0).unwrap();
        pmcc.correlate(1, 1).unwrap();
        let r_before = pmcc.target().getf_pixel_unchecked(2, 2);

        // shift away and back; results must be reproducible
        pmcc.set_offset(2, 1);
        pmcc.correlate(1, 1).unwrap();
        pmcc.set_offset(0, 0);
        pmcc.correlate(1, 1).unwrap();
        let r_after = pmcc.target().getf_pixel_unchecked(2, 2);
        assert_eq!(r_before.to_bits(), r_after.to_bits());
    }

    #[test]
    fn test_disjoint_offset_is_empty_not_error() {
        let a = gradient_raster(4, 4);
        let mut pmcc = BlockPmcc::with_offset(&a, &a, 10, 0).unwrap();
        // nothing to write, but the call itself is valid
        assert!(pmcc.correlate(1, 1).is_ok());
    }
}
