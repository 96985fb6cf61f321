use crate::enums::Orientation;
use crate::interpolator::Interpolator;
use crate::windowing;

use image::ImageBuffer;
use image::Luma;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{orientation} index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange {
        orientation: Orientation,
        index: usize,
        len: usize,
    },

    #[error("Threshold {0} out of range (valid: 0..=100)")]
    ThresholdOutOfRange(u8),
}

/// One slider interaction: which plane, which slice, which threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub orientation: Orientation,
    pub index: usize,
    /// 0 darkens fully, 50 is neutral, 100 brightens fully
    pub threshold_percent: u8,
}

/// A series stacked into a 3D intensity array.
///
/// `data` has shape (height, width, slices): slice `i` in sorted position
/// order lives at `data[:, :, i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensions of the volume (height, width, slices)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Number of slices available along an orientation.
    pub fn axis_len(&self, orientation: Orientation) -> usize {
        let (height, width, depth) = self.dim();
        match orientation {
            Orientation::Axial => depth,
            Orientation::Coronal => height,
            Orientation::Sagittal => width,
        }
    }

    /// Default slider position for an orientation.
    pub fn center_index(&self, orientation: Orientation) -> usize {
        self.axis_len(orientation).saturating_sub(1) / 2
    }

    fn check_index(&self, index: usize, orientation: Orientation) -> Result<(), RenderError> {
        let len = self.axis_len(orientation);
        if index < len {
            Ok(())
        } else {
            Err(RenderError::IndexOutOfRange {
                orientation,
                index,
                len,
            })
        }
    }

    /// Raw cross-section before any reorientation.
    ///
    /// Axial is (height, width), coronal (width, slices) and sagittal
    /// (height, slices).
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Result<ArrayView2<'_, f32>, RenderError> {
        self.check_index(index, orientation)?;
        let slice = match orientation {
            Orientation::Axial => self.data.slice(s![.., .., index]),
            Orientation::Coronal => self.data.slice(s![index, .., ..]),
            Orientation::Sagittal => self.data.slice(s![.., index, ..]),
        };
        Ok(slice)
    }

    /// Cross-section turned into the display frame.
    ///
    /// Coronal is transposed, rotated by 180 degrees and resized to
    /// (height, height); sagittal is rotated by 90 degrees and resized to
    /// (height, height). Axial is returned as is.
    pub fn get_oriented_slice(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Result<Array2<f32>, RenderError> {
        let slice = self.get_slice_from_axis(index, orientation)?;
        let (height, _, _) = self.dim();

        let oriented = match orientation {
            Orientation::Axial => slice.to_owned(),
            Orientation::Coronal => {
                let rotated = Interpolator::rotate_180(slice.t());
                Interpolator::resize(rotated.view(), height, height)
            }
            Orientation::Sagittal => {
                let rotated = Interpolator::rotate_90(slice);
                Interpolator::resize(rotated.view(), height, height)
            }
        };
        Ok(oriented)
    }

    /// Renders a windowed slice with every value in `[0, 1]`.
    pub fn render_slice(
        &self,
        orientation: Orientation,
        index: usize,
        threshold_percent: u8,
    ) -> Result<Array2<f32>, RenderError> {
        if threshold_percent > 100 {
            return Err(RenderError::ThresholdOutOfRange(threshold_percent));
        }
        let oriented = self.get_oriented_slice(index, orientation)?;
        Ok(windowing::window(&oriented.view(), threshold_percent))
    }

    pub fn render(&self, request: &RenderRequest) -> Result<Array2<f32>, RenderError> {
        self.render_slice(request.orientation, request.index, request.threshold_percent)
    }

    #[inline]
    fn normalize_to_u8(value: f32) -> u8 {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Converts a rendered `[0, 1]` image into an 8-bit grayscale bitmap.
    pub fn to_luma8(image: &Array2<f32>) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = image.dim();
        let standard = image.as_standard_layout();
        let pixel_data: Vec<u8> = standard
            .view()
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v))
            .collect();
        ImageBuffer::from_raw(u32::try_from(width).ok()?, u32::try_from(height).ok()?, pixel_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, array};

    /// Volume whose voxel value encodes its coordinates as `100*y + 10*x + z`.
    fn coordinate_volume(height: usize, width: usize, depth: usize) -> Volume {
        Volume::new(Array::from_shape_fn((height, width, depth), |(y, x, z)| {
            (100 * y + 10 * x + z) as f32
        }))
    }

    #[test]
    fn axis_lengths_follow_layout() {
        let volume = coordinate_volume(4, 3, 2);
        assert_eq!(volume.axis_len(Orientation::Axial), 2);
        assert_eq!(volume.axis_len(Orientation::Coronal), 4);
        assert_eq!(volume.axis_len(Orientation::Sagittal), 3);
        assert_eq!(volume.center_index(Orientation::Coronal), 1);
    }

    #[test]
    fn raw_slices_pick_the_right_planes() {
        let volume = coordinate_volume(4, 3, 2);

        let axial = volume.get_slice_from_axis(1, Orientation::Axial).unwrap();
        assert_eq!(axial.dim(), (4, 3));
        assert_eq!(axial[[2, 1]], 211.0);

        let coronal = volume.get_slice_from_axis(3, Orientation::Coronal).unwrap();
        assert_eq!(coronal.dim(), (3, 2));
        assert_eq!(coronal[[2, 1]], 321.0);

        let sagittal = volume.get_slice_from_axis(2, Orientation::Sagittal).unwrap();
        assert_eq!(sagittal.dim(), (4, 2));
        assert_eq!(sagittal[[1, 0]], 120.0);
    }

    #[test]
    fn coronal_is_transposed_then_flipped() {
        // height 3 == width 3 == depth 3 keeps the resize a no-op
        let volume = coordinate_volume(3, 3, 3);
        let coronal = volume.get_oriented_slice(0, Orientation::Coronal).unwrap();
        // transpose gives [z][x] = 10x + z, rotating 180 flips both axes
        assert_eq!(coronal[[0, 0]], 22.0);
        assert_eq!(coronal[[2, 2]], 0.0);
        assert_eq!(coronal[[0, 2]], 2.0);
    }

    #[test]
    fn sagittal_is_rotated_counter_clockwise() {
        let volume = coordinate_volume(3, 3, 3);
        let sagittal = volume.get_oriented_slice(0, Orientation::Sagittal).unwrap();
        // raw [y][z] = 100y + z; the last column ends up as the first row
        assert_eq!(sagittal.row(0).to_vec(), vec![2.0, 102.0, 202.0]);
        assert_eq!(sagittal.row(2).to_vec(), vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let volume = coordinate_volume(4, 3, 2);
        let err = volume.render_slice(Orientation::Sagittal, 3, 50).unwrap_err();
        assert_eq!(
            err,
            RenderError::IndexOutOfRange {
                orientation: Orientation::Sagittal,
                index: 3,
                len: 3,
            }
        );
    }

    #[test]
    fn threshold_above_hundred_is_rejected() {
        let volume = coordinate_volume(2, 2, 2);
        assert_eq!(
            volume.render_slice(Orientation::Axial, 0, 101),
            Err(RenderError::ThresholdOutOfRange(101))
        );
    }

    #[test]
    fn luma_conversion_scales_to_bytes() {
        let image = array![[0.0, 0.5], [1.0, 0.25]];
        let bitmap = Volume::to_luma8(&image).unwrap();
        assert_eq!(bitmap.dimensions(), (2, 2));
        assert_eq!(bitmap.into_raw(), vec![0, 128, 255, 64]);
    }

    #[test]
    fn luma_conversion_handles_transposed_input() {
        let image = array![[0.0, 1.0, 0.5], [0.25, 0.0, 1.0]].reversed_axes();
        assert!(!image.is_standard_layout());
        let bitmap = Volume::to_luma8(&image).unwrap();
        assert_eq!(bitmap.dimensions(), (2, 3));
        assert_eq!(bitmap.into_raw(), vec![0, 64, 255, 0, 128, 255]);
    }

    #[test]
    fn sagittal_bias_follows_the_resampled_grid() {
        // a single hot voxel that resampling spreads out
        let volume = Volume::new(Array::from_shape_fn((4, 1, 3), |(y, _, z)| match (y, z) {
            (0, 0) => 100.0,
            _ => (y + z) as f32,
        }));
        let oriented = volume.get_oriented_slice(0, Orientation::Sagittal).unwrap();
        let rendered = volume.render_slice(Orientation::Sagittal, 0, 60).unwrap();
        assert_eq!(rendered, windowing::window(&oriented.view(), 60));
    }
}
