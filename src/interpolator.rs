use ndarray::{Array2, ArrayView2, Axis, s};
use rayon::prelude::*;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Rotates a grid by 180 degrees.
    pub(crate) fn rotate_180(grid: ArrayView2<'_, f32>) -> Array2<f32> {
        grid.slice(s![..;-1, ..;-1]).to_owned()
    }

    /// Rotates a grid by 90 degrees counter-clockwise: (rows, cols) -> (cols, rows).
    ///
    /// The first column of the input becomes the last row of the output.
    pub(crate) fn rotate_90(grid: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut rotated = grid.t();
        rotated.invert_axis(Axis(0));
        rotated.to_owned()
    }

    /// Resamples a grid to (height, width) with bilinear filtering.
    ///
    /// Output pixel centres map onto source pixel centres, samples outside
    /// the source are clamped to its edge.
    pub(crate) fn resize(slice: ArrayView2<'_, f32>, height: usize, width: usize) -> Array2<f32> {
        let (slice_height, slice_width) = slice.dim();
        if (slice_height, slice_width) == (height, width) {
            return slice.to_owned();
        }
        if slice_height == 0 || slice_width == 0 {
            return Array2::zeros((height, width));
        }

        let scale_y = slice_height as f32 / height as f32;
        let scale_x = slice_width as f32 / width as f32;
        let max_y = (slice_height - 1) as f32;
        let max_x = (slice_width - 1) as f32;

        let pixel_data: Vec<f32> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                let src_y = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
                (0..width).map(move |x| {
                    let src_x = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
                    Self::bilinear_interpolate(&slice, src_y, src_x)
                })
            })
            .collect();

        Array2::from_shape_vec((height, width), pixel_data)
            .unwrap_or_else(|_| Array2::zeros((height, width)))
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<'_, f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        // lerp form keeps flat regions exactly flat
        let v0 = (v01 - v00).mul_add(dx, v00);
        let v1 = (v11 - v10).mul_add(dx, v10);

        (v1 - v0).mul_add(dy, v0)
    }
}
