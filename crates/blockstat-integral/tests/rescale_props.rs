//! Property tests for box-filter rescaling
//!
//! Identity rescales must reproduce the source exactly for every sample
//! format; a downscale/upscale round trip over smooth data must stay
//! within the error of one box window.

use blockstat_core::{Raster, color};
use blockstat_integral::Rescaler;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

#[test]
fn identity_rescale_reproduces_every_format() {
    let mut rng = StdRng::seed_from_u64(0x1DE7);

    for _ in 0..10 {
        let width = rng.random_range(1..=16u32);
        let height = rng.random_range(1..=16u32);
        let size = (width * height) as usize;

        let gray8 =
            Raster::from_gray8(width, height, (0..size).map(|_| rng.random()).collect()).unwrap();
        let gray16 =
            Raster::from_gray16(width, height, (0..size).map(|_| rng.random()).collect()).unwrap();
        let float = Raster::from_float(
            width,
            height,
            (0..size).map(|_| rng.random::<f32>() * 64.0).collect(),
        )
        .unwrap();
        let rgb = Raster::from_rgb(
            width,
            height,
            (0..size)
                .map(|_| {
                    let (r, g, b) = (rng.random(), rng.random(), rng.random());
                    color::compose_rgb(r, g, b)
                })
                .collect(),
        )
        .unwrap();

        for source in [&gray8, &gray16, &float, &rgb] {
            let scaled = Rescaler::new(source)
                .unwrap()
                .scale_to(width, height)
                .unwrap();
            assert_eq!(scaled.format(), source.format());
            for y in 0..height {
                for x in 0..width {
                    assert_eq!(
                        scaled.get_pixel_unchecked(x, y),
                        source.get_pixel_unchecked(x, y),
                        "{} identity mismatch at ({},{}) in {}x{}",
                        source.format().name(),
                        x,
                        y,
                        width,
                        height
                    );
                }
            }
        }
    }
}

#[test]
fn round_trip_over_smooth_data_is_bounded() {
    // smooth gradient: local variation within any 2x2 box is at most 7
    let mut data = Vec::with_capacity(32 * 32);
    for y in 0..32u32 {
        for x in 0..32u32 {
            data.push((x * 4 + y * 3) as u8);
        }
    }
    let source = Raster::from_gray8(32, 32, data).unwrap();

    let down = Rescaler::new(&source).unwrap().scale_by(0.5).unwrap();
    assert_eq!(down.dimensions(), (16, 16));
    let back = Rescaler::new(&down).unwrap().scale_by(2.0).unwrap();
    assert_eq!(back.dimensions(), (32, 32));

    let mut total_error = 0i64;
    for y in 0..32u32 {
        for x in 0..32u32 {
            let error = (back.get_pixel_unchecked(x, y) as i64
                - source.get_pixel_unchecked(x, y) as i64)
                .abs();
            assert!(error <= 12, "error {} at ({},{})", error, x, y);
            total_error += error;
        }
    }
    // the mean error stays well below one box window of variation
    assert!((total_error as f64) / 1024.0 < 8.0);
}

#[test]
fn downscale_averages_within_block_range() {
    let mut rng = StdRng::seed_from_u64(0xD0DD);
    let data: Vec<u8> = (0..24 * 24).map(|_| rng.random()).collect();
    let source = Raster::from_gray8(24, 24, data.clone()).unwrap();

    let down = Rescaler::new(&source).unwrap().scale_to(8, 8).unwrap();

    // every output pixel must lie within the min/max of its 3x3 source block
    for by in 0..8u32 {
        for bx in 0..8u32 {
            let mut lo = u32::MAX;
            let mut hi = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let v = source.get_pixel_unchecked(bx * 3 + dx, by * 3 + dy);
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
            let v = down.get_pixel_unchecked(bx, by);
            assert!(
                v >= lo && v <= hi,
                "block ({},{}): {} outside [{}, {}]",
                bx,
                by,
                v,
                lo,
                hi
            );
        }
    }
}
