//! Integral tables (summed-area tables)
//!
//! A table is a (W+1)x(H+1) grid of accumulator cells over a W x H
//! raster, with row 0 and column 0 held at zero as a sentinel border.
//! Cell (i, j) stores the sum of all source samples strictly left of
//! column i and strictly above row j, so the sum over any axis-aligned
//! rectangle comes from four lookups regardless of window size.
//!
//! Construction runs in two linear passes: pass 1 writes running row
//! sums into the one-shifted row, pass 2 adds the row above into each
//! row top-to-bottom. O(W*H) time, no extra memory beyond the table.
//!
//! # Queries
//!
//! [`sum`](LongIntegralTable::sum) takes window bounds with an exclusive
//! lower edge: the window covers samples `x` in `(x_min, x_max]` and `y`
//! in `(y_min, y_max]`. Callers pre-clamp all bounds to `[-1, dim - 1]`,
//! where `-1` selects the zero border; the query itself does no bounds
//! checking because the clamping policy differs per consumer.
//!
//! # Accumulator policy
//!
//! Cell width is chosen per source format so that sums of up to 2^31
//! samples (and their squares, where squares are tabulated) cannot
//! overflow: `i64` for the integer grayscale formats, `f64` for float
//! sources, and a packed `i128` cell holding all three channel sums for
//! color sources.

use blockstat_core::{Raster, SampleFormat, color};

use crate::error::{StatError, StatResult};

/// Integral table with `i64` cells over an integer grayscale raster.
#[derive(Debug, Clone)]
pub struct LongIntegralTable {
    data: Vec<i64>,
    width: u32,
    height: u32,
    /// Native sample range of the source, used by the scaled query.
    max_value: u32,
}

impl LongIntegralTable {
    /// Build the table from an 8-bit or 16-bit grayscale raster.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::UnsupportedFormat`] for float or color input.
    pub fn build(raster: &Raster) -> StatResult<Self> {
        let max_value = match raster.format() {
            SampleFormat::Gray8 => 0xff,
            SampleFormat::Gray16 => 0xffff,
            other => {
                return Err(StatError::UnsupportedFormat {
                    expected: "8- or 16-bit grayscale",
                    actual: other,
                });
            }
        };

        let width = raster.width();
        let height = raster.height();
        let w = width as usize + 1;
        let h = height as usize + 1;
        let mut data = vec![0i64; w * h];

        // rows
        for j in 1..h {
            let row = j * w + 1;
            let mut row_sum = 0i64;
            for i in 0..width as usize {
                row_sum += i64::from(raster.get_pixel_unchecked(i as u32, (j - 1) as u32));
                data[row + i] = row_sum;
            }
        }

        // columns
        for j in 1..h {
            let row = j * w + 1;
            let above = row - w;
            for i in 0..width as usize {
                data[row + i] += data[above + i];
            }
        }

        Ok(LongIntegralTable {
            data,
            width,
            height,
            max_value,
        })
    }

    /// Source raster width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source raster height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum over the window `(x_min, x_max] x (y_min, y_max]`.
    ///
    /// Bounds must lie in `[-1, dim - 1]`; `-1` selects the zero border.
    #[inline]
    pub fn sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> i64 {
        let w = self.width as usize + 1;
        let x0 = (x_min + 1) as usize;
        let y0 = (y_min + 1) as usize;
        let x1 = (x_max + 1) as usize;
        let y1 = (y_max + 1) as usize;
        self.data[y1 * w + x1] - self.data[y0 * w + x1] - self.data[y1 * w + x0]
            + self.data[y0 * w + x0]
    }

    /// Window sum multiplied by `scale`, rounded and clamped to the
    /// source raster's native range.
    #[inline]
    pub fn scaled_sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32, scale: f32) -> u32 {
        let v = (self.sum(x_min, y_min, x_max, y_max) as f64 * f64::from(scale) + 0.5) as i64;
        v.clamp(0, i64::from(self.max_value)) as u32
    }
}

/// Integral table with `f64` cells over a float raster.
///
/// Both construction passes and all queries stay in double precision;
/// only the scaled query narrows to `f32` for the store.
#[derive(Debug, Clone)]
pub struct DoubleIntegralTable {
    data: Vec<f64>,
    width: u32,
    height: u32,
}

impl DoubleIntegralTable {
    /// Build the table from a float raster.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::UnsupportedFormat`] for non-float input.
    pub fn build(raster: &Raster) -> StatResult<Self> {
        if raster.format() != SampleFormat::Float {
            return Err(StatError::UnsupportedFormat {
                expected: "32-bit float",
                actual: raster.format(),
            });
        }

        let width = raster.width();
        let height = raster.height();
        let w = width as usize + 1;
        let h = height as usize + 1;
        let mut data = vec![0.0f64; w * h];

        // rows
        for j in 1..h {
            let row = j * w + 1;
            let mut row_sum = 0.0f64;
            for i in 0..width as usize {
                row_sum += f64::from(raster.getf_pixel_unchecked(i as u32, (j - 1) as u32));
                data[row + i] = row_sum;
            }
        }

        // columns
        for j in 1..h {
            let row = j * w + 1;
            let above = row - w;
            for i in 0..width as usize {
                data[row + i] += data[above + i];
            }
        }

        Ok(DoubleIntegralTable {
            data,
            width,
            height,
        })
    }

    /// Wrap a pre-filled (W+1)x(H+1) cell vector.
    pub(crate) fn from_raw(data: Vec<f64>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width as usize + 1) * (height as usize + 1));
        DoubleIntegralTable {
            data,
            width,
            height,
        }
    }

    /// Allocate an all-zero table for deferred filling.
    pub(crate) fn new_zeroed(width: u32, height: u32) -> Self {
        let data = vec![0.0f64; (width as usize + 1) * (height as usize + 1)];
        DoubleIntegralTable {
            data,
            width,
            height,
        }
    }

    /// Mutable cell access for the in-place cross-table rebuild.
    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Source raster width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source raster height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum over the window `(x_min, x_max] x (y_min, y_max]`.
    ///
    /// Bounds must lie in `[-1, dim - 1]`; `-1` selects the zero border.
    #[inline]
    pub fn sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> f64 {
        let w = self.width as usize + 1;
        let x0 = (x_min + 1) as usize;
        let y0 = (y_min + 1) as usize;
        let x1 = (x_max + 1) as usize;
        let y1 = (y_max + 1) as usize;
        self.data[y1 * w + x1] - self.data[y0 * w + x1] - self.data[y1 * w + x0]
            + self.data[y0 * w + x0]
    }

    /// Window sum multiplied by `scale`, returned as the IEEE-754 bit
    /// pattern of the narrowed `f32` value.
    #[inline]
    pub fn scaled_sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32, scale: f32) -> u32 {
        ((self.sum(x_min, y_min, x_max, y_max) * f64::from(scale)) as f32).to_bits()
    }
}

/// Bits per channel field in a packed color cell.
///
/// A channel sum over 2^31 samples of at most 255 stays below 2^40; one
/// extra bit absorbs the paired-corner addition in the query, so 42-bit
/// fields never carry into their neighbor.
const FIELD_BITS: u32 = 42;
const FIELD_MASK: i128 = (1 << FIELD_BITS) - 1;

/// Integral table over a packed-color raster.
///
/// All three channel accumulations live in one `i128` cell as three
/// 42-bit fields, so one table serves the whole raster instead of three.
/// The query evaluates `(A + D) - (B + C)`: per field the minuend is
/// never smaller than the subtrahend, so no borrow crosses a field
/// boundary and the three sums stay independent.
#[derive(Debug, Clone)]
pub struct RgbIntegralTable {
    data: Vec<i128>,
    width: u32,
    height: u32,
}

impl RgbIntegralTable {
    /// Build the table from a packed-color raster.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::UnsupportedFormat`] for non-color input.
    pub fn build(raster: &Raster) -> StatResult<Self> {
        if raster.format() != SampleFormat::Rgb {
            return Err(StatError::UnsupportedFormat {
                expected: "packed color",
                actual: raster.format(),
            });
        }

        let width = raster.width();
        let height = raster.height();
        let w = width as usize + 1;
        let h = height as usize + 1;
        let mut data = vec![0i128; w * h];

        // rows
        for j in 1..h {
            let row = j * w + 1;
            let mut row_sum = 0i128;
            for i in 0..width as usize {
                let px = raster.get_pixel_unchecked(i as u32, (j - 1) as u32);
                let packed = (i128::from(color::red(px)) << (2 * FIELD_BITS))
                    | (i128::from(color::green(px)) << FIELD_BITS)
                    | i128::from(color::blue(px));
                row_sum += packed;
                data[row + i] = row_sum;
            }
        }

        // columns
        for j in 1..h {
            let row = j * w + 1;
            let above = row - w;
            for i in 0..width as usize {
                data[row + i] += data[above + i];
            }
        }

        Ok(RgbIntegralTable {
            data,
            width,
            height,
        })
    }

    /// Source raster width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source raster height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Per-channel sums over the window `(x_min, x_max] x (y_min, y_max]`
    /// as `(red, green, blue)`.
    ///
    /// Bounds must lie in `[-1, dim - 1]`; `-1` selects the zero border.
    #[inline]
    pub fn sum_rgb(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> (i64, i64, i64) {
        let w = self.width as usize + 1;
        let x0 = (x_min + 1) as usize;
        let y0 = (y_min + 1) as usize;
        let x1 = (x_max + 1) as usize;
        let y1 = (y_max + 1) as usize;
        let a = self.data[y0 * w + x0];
        let b = self.data[y0 * w + x1];
        let c = self.data[y1 * w + x0];
        let d = self.data[y1 * w + x1];
        let v = (a + d) - (b + c);
        (
            ((v >> (2 * FIELD_BITS)) & FIELD_MASK) as i64,
            ((v >> FIELD_BITS) & FIELD_MASK) as i64,
            (v & FIELD_MASK) as i64,
        )
    }

    /// Per-channel window sums multiplied by `scale`, rounded, clamped to
    /// `[0, 255]` and recomposed into a packed `0xRRGGBB` word.
    #[inline]
    pub fn scaled_sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32, scale: f32) -> u32 {
        let (r, g, b) = self.sum_rgb(x_min, y_min, x_max, y_max);
        let scale = f64::from(scale);
        let r = ((r as f64 * scale + 0.5) as i64).clamp(0, 0xff) as u8;
        let g = ((g as f64 * scale + 0.5) as i64).clamp(0, 0xff) as u8;
        let b = ((b as f64 * scale + 0.5) as i64).clamp(0, 0xff) as u8;
        color::compose_rgb(r, g, b)
    }
}

/// One integral table of the accumulator variant matching a raster's
/// sample format.
///
/// The variant is selected exactly once, at construction; queries never
/// re-dispatch on the source type.
#[derive(Debug, Clone)]
pub enum IntegralTable {
    /// `i64` cells over integer grayscale
    Long(LongIntegralTable),
    /// Packed `i128` cells over 3-channel color
    Rgb(RgbIntegralTable),
    /// `f64` cells over float samples
    Double(DoubleIntegralTable),
}

impl IntegralTable {
    /// Build the table variant matching the raster's sample format.
    pub fn build(raster: &Raster) -> StatResult<Self> {
        Ok(match raster.format() {
            SampleFormat::Gray8 | SampleFormat::Gray16 => {
                IntegralTable::Long(LongIntegralTable::build(raster)?)
            }
            SampleFormat::Float => IntegralTable::Double(DoubleIntegralTable::build(raster)?),
            SampleFormat::Rgb => IntegralTable::Rgb(RgbIntegralTable::build(raster)?),
        })
    }

    /// Window sum multiplied by `scale` in the source raster's native
    /// `u32` encoding, ready to store via `Raster::set_pixel`.
    ///
    /// Bounds follow the `(min, max]` convention of the typed tables and
    /// must be pre-clamped to `[-1, dim - 1]`.
    #[inline]
    pub fn scaled_sum(&self, x_min: i32, y_min: i32, x_max: i32, y_max: i32, scale: f32) -> u32 {
        match self {
            IntegralTable::Long(table) => table.scaled_sum(x_min, y_min, x_max, y_max, scale),
            IntegralTable::Rgb(table) => table.scaled_sum(x_min, y_min, x_max, y_max, scale),
            IntegralTable::Double(table) => table.scaled_sum(x_min, y_min, x_max, y_max, scale),
        }
    }
}
