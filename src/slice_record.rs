use dicom::{
    object::{FileDicomObject, InMemDicomObject},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};

use crate::{enums::SortBy, metadata::Descriptors};

/// One decoded 2D slice of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRecord {
    /// Location along the stacking axis. Slices without one are skipped.
    pub position: Option<f32>,
    /// Pixel grid of shape (rows, columns)
    pub pixels: Array2<f32>,
    pub descriptors: Descriptors,
}

impl SliceRecord {
    pub fn new(position: Option<f32>, pixels: Array2<f32>) -> Self {
        Self {
            position,
            pixels,
            descriptors: Descriptors::default(),
        }
    }

    pub fn with_descriptors(mut self, descriptors: Descriptors) -> Self {
        self.descriptors = descriptors;
        self
    }

    /// Decodes the first frame of a DICOM object into a slice record.
    ///
    /// Stored pixel values are kept as they are: no modality rescale and no
    /// VOI windowing is applied. Objects without a position are never
    /// decoded and come back with an empty pixel grid, since they will be
    /// skipped when stacking; their descriptors are still read.
    pub fn from_dicom_object(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Result<Self, dicom::pixeldata::Error> {
        let descriptors = Descriptors::from_dicom_object(dicom_object);
        let Some(position) = Self::read_position(dicom_object, sort_by) else {
            return Ok(Self::new(None, Array2::zeros((0, 0))).with_descriptors(descriptors));
        };

        let pixel_data = dicom_object.decode_pixel_data()?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        let pixels = pixel_data
            .to_ndarray_with_options::<f32>(&options)?
            .slice_move(s![0, .., .., 0]);

        Ok(Self {
            position: Some(position),
            pixels,
            descriptors,
        })
    }

    fn read_position(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<f32> {
        match sort_by {
            SortBy::SliceLocation => dicom_object
                .element(tags::SLICE_LOCATION)
                .ok()?
                .to_float32()
                .ok(),
            SortBy::ImagePositionPatient => dicom_object
                .element(tags::IMAGE_POSITION_PATIENT)
                .ok()?
                .to_multi_float32()
                .ok()?
                .get(2)
                .copied(),
            SortBy::TablePosition => dicom_object
                .element(tags::TABLE_POSITION)
                .ok()?
                .to_float32()
                .ok(),
            SortBy::InstanceNumber => dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(|n| n as f32),
        }
    }
}
