//! Resampling of images and vector fields to a new grid size.
//!
//! The grids share their origin and pixel `i` of the target grid sits at
//! `i * from / to` in the source grid, so a downscale by an integer factor
//! `f` keeps every `f`-th pixel. This is the same mapping
//! `GridSize::ratio_to` applies to displacements when a transformation is
//! upscaled, which keeps a deformation consistent across pyramid levels.

use rayon::prelude::*;

use crate::image::{Image, VectorField};
use crate::spatial::GridSize;

/// Continuous source coordinate of each target index along one dimension.
fn axis_map(from: usize, to: usize) -> Vec<f64> {
    let step = from as f64 / to as f64;
    (0..to).map(|i| i as f64 * step).collect()
}

fn source_point<const D: usize>(axes: &[Vec<f64>], index: [usize; D]) -> [f64; D] {
    let mut point = [0.0; D];
    for d in 0..D {
        point[d] = axes[d][index[d]];
    }
    point
}

fn axes_for<const D: usize>(from: GridSize<D>, to: GridSize<D>) -> Vec<Vec<f64>> {
    (0..D).map(|d| axis_map(from[d], to[d])).collect()
}

/// Resample an image to `size` with linear interpolation.
///
/// Returns a clone if the image already has the requested size.
pub fn resize<const D: usize>(image: &Image<D>, size: GridSize<D>) -> Image<D> {
    if image.size() == size {
        return image.clone();
    }
    let axes = axes_for(image.size(), size);
    let data: Vec<f32> = (0..size.len())
        .into_par_iter()
        .map(|offset| image.sample(&source_point(&axes, size.index_of(offset))) as f32)
        .collect();
    Image::from_parts(size, data)
}

/// Resample a vector field to `size` with linear interpolation.
///
/// Vectors are interpolated but not rescaled; callers that move a
/// displacement between grids scale it with `GridSize::ratio_to`.
pub fn resize_field<const D: usize>(field: &VectorField<D>, size: GridSize<D>) -> VectorField<D> {
    if field.size() == size {
        return field.clone();
    }
    let axes = axes_for(field.size(), size);
    VectorField::from_fn(size, |index| field.sample(&source_point(&axes, index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale_keeps_every_other_pixel() {
        let image = Image::from_fn(GridSize::new([8, 6]), |[x, y]| (x + 10 * y) as f32);
        let small = resize(&image, GridSize::new([4, 3]));
        assert_eq!(small.size(), GridSize::new([4, 3]));
        for [x, y] in [[0, 0], [3, 2], [1, 2]] {
            assert_eq!(small.get([x, y]), image.get([2 * x, 2 * y]));
        }
    }

    #[test]
    fn test_upscale_follows_size_ratio() {
        let image = Image::from_fn(GridSize::new([4, 2]), |[x, _]| x as f32);
        let large = resize(&image, GridSize::new([8, 4]));
        // Fine pixel x sits at x / 2 in the coarse grid, clamped at the border.
        for x in 0..8 {
            let expected = (x as f32 * 0.5).min(3.0);
            assert!((large.get([x, 1]) - expected).abs() < 1e-6, "x = {}", x);
        }
    }

    #[test]
    fn test_field_mapping_matches_ratio() {
        let coarse = GridSize::new([4, 4]);
        let fine = GridSize::new([12, 8]);
        let field = VectorField::from_fn(coarse, |[x, y]| {
            crate::spatial::Vector::new([x as f64, y as f64])
        });
        let large = resize_field(&field, fine);
        let ratio = coarse.ratio_to(&fine);
        let v = large.get([6, 4]);
        assert!((v[0] - 6.0 / ratio[0]).abs() < 1e-12);
        assert!((v[1] - 4.0 / ratio[1]).abs() < 1e-12);
    }

    #[test]
    fn test_resize_same_size_is_identity() {
        let image = Image::from_fn(GridSize::new([3, 3]), |[x, y]| (x * y) as f32);
        assert_eq!(resize(&image, image.size()), image);
    }
}
