use crate::{
    enums::SortBy,
    metadata::MetadataTable,
    slice_record::SliceRecord,
    volume::Volume,
};

use dicom::object::{FileDicomObject, InMemDicomObject, open_file};
use ndarray::{Array3, s};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions: expected {expected:?}, found {found:?}")]
    InconsistentDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Stack slice records into a volume
    ///
    /// Records without a position are skipped, the rest are sorted by
    /// position (stable, so equal positions keep their input order) and
    /// copied into `data[:, :, i]`. The metadata table comes from the first
    /// record in input order, whether or not that record has a position.
    ///
    /// # Errors
    ///
    /// Returns error if no record has a position or the pixel grids differ
    /// in shape
    pub fn build_volume(
        slice_records: &[SliceRecord],
    ) -> Result<(Volume, MetadataTable), VolumeLoaderError> {
        let (mut usable, skipped): (Vec<&SliceRecord>, Vec<&SliceRecord>) = slice_records
            .iter()
            .partition(|record| record.position.is_some());

        if !skipped.is_empty() {
            log::info!(
                "Skipped {} slice(s) without position, {} usable",
                skipped.len(),
                usable.len()
            );
        }

        if usable.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_records(&mut usable);
        Self::validate_dimensions(&usable)?;

        let volume_array = Self::build_volume_array(&usable);
        let metadata = MetadataTable::from_descriptors(&slice_records[0].descriptors);

        Ok((Volume::new(volume_array), metadata))
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Attribute providing the slice position
    ///
    /// # Errors
    ///
    /// Returns error if pixel data cannot be decoded, no valid images are
    /// found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<(Volume, MetadataTable), VolumeLoaderError> {
        let records: Result<Vec<_>, _> = dicom_objects
            .iter()
            .map(|dicom_object| SliceRecord::from_dicom_object(dicom_object, sort_by))
            .collect();

        Self::build_volume(&records?)
    }

    /// Load a volume from file paths, keeping the order of `paths`
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<(Volume, MetadataTable), VolumeLoaderError> {
        let start = Instant::now();
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        let loaded = Self::load_from_dicom_objects(&objects?, sort_by)?;
        log::info!(
            "Built volume {:?} from {} file(s) in {:?}",
            loaded.0.dim(),
            paths.len(),
            start.elapsed()
        );
        Ok(loaded)
    }

    /// Load a volume from a directory containing .dcm files
    ///
    /// Files are read in file name order.
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<(Volume, MetadataTable), VolumeLoaderError> {
        let paths = Self::dcm_paths(path.as_ref())?;

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    pub(crate) fn dcm_paths(path: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut paths: Vec<_> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_dcm_extension(path))
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn sort_records(records: &mut [&SliceRecord]) {
        records.sort_by(|a, b| {
            a.position
                .partial_cmp(&b.position)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn validate_dimensions(records: &[&SliceRecord]) -> Result<(), VolumeLoaderError> {
        let expected = records[0].pixels.dim();
        match records.iter().find(|record| record.pixels.dim() != expected) {
            Some(record) => Err(VolumeLoaderError::InconsistentDimensions {
                expected,
                found: record.pixels.dim(),
            }),
            None => Ok(()),
        }
    }

    fn build_volume_array(records: &[&SliceRecord]) -> Array3<f32> {
        let (height, width) = records[0].pixels.dim();
        let depth = records.len();
        let mut volume = Array3::<f32>::zeros((height, width, depth));

        for (i, record) in records.iter().enumerate() {
            volume.slice_mut(s![.., .., i]).assign(&record.pixels);
        }

        volume
    }
}

pub(crate) fn has_dcm_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{DescriptorField, Descriptors};
    use crate::slice_record::tests::{file_object, image_elements, slice_location};
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::object::mem::InMemElement;
    use dicom_dictionary_std::tags;
    use ndarray::Array2;

    fn record(position: Option<f32>, value: f32) -> SliceRecord {
        SliceRecord::new(position, Array2::from_elem((2, 3), value))
    }

    fn named(patient_id: &str) -> Descriptors {
        let mut descriptors = Descriptors::default();
        for field in DescriptorField::ALL {
            *descriptors.field_mut(field) = Some(String::from("x"));
        }
        descriptors.patient_id = Some(patient_id.to_owned());
        descriptors
    }

    #[test]
    fn slabs_are_sorted_by_position() {
        let records = [
            record(Some(3.0), 30.0),
            record(Some(-1.0), 10.0),
            record(Some(2.5), 20.0),
        ];
        let (volume, _) = VolumeLoader::build_volume(&records).unwrap();
        assert_eq!(volume.dim(), (2, 3, 3));
        let firsts: Vec<_> = (0..3).map(|i| volume.data()[[0, 0, i]]).collect();
        assert_eq!(firsts, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn records_without_position_are_skipped() {
        let records = [
            record(None, 1.0),
            record(Some(1.0), 2.0),
            record(None, 3.0),
            record(Some(0.0), 4.0),
            record(Some(5.0), 5.0),
        ];
        let (volume, _) = VolumeLoader::build_volume(&records).unwrap();
        assert_eq!(volume.dim(), (2, 3, 3));
    }

    #[test]
    fn equal_positions_keep_input_order() {
        let records = [
            record(Some(1.0), 1.0),
            record(Some(0.0), 2.0),
            record(Some(1.0), 3.0),
        ];
        let (volume, _) = VolumeLoader::build_volume(&records).unwrap();
        let firsts: Vec<_> = (0..3).map(|i| volume.data()[[1, 2, i]]).collect();
        assert_eq!(firsts, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn no_positioned_record_is_an_error() {
        let records = [record(None, 1.0), record(None, 2.0)];
        assert!(matches!(
            VolumeLoader::build_volume(&records),
            Err(VolumeLoaderError::NoValidImages)
        ));
        assert!(matches!(
            VolumeLoader::build_volume(&[]),
            Err(VolumeLoaderError::NoValidImages)
        ));
    }

    #[test]
    fn mismatched_shapes_are_an_error() {
        let records = [
            record(Some(0.0), 1.0),
            SliceRecord::new(Some(1.0), Array2::zeros((3, 3))),
        ];
        match VolumeLoader::build_volume(&records) {
            Err(VolumeLoaderError::InconsistentDimensions { expected, found }) => {
                assert_eq!(expected, (2, 3));
                assert_eq!(found, (3, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn metadata_comes_from_first_input_record() {
        let records = [
            record(None, 0.0).with_descriptors(named("unpositioned")),
            record(Some(9.0), 0.0).with_descriptors(named("late")),
            record(Some(-9.0), 0.0).with_descriptors(named("early")),
        ];
        let (_, metadata) = VolumeLoader::build_volume(&records).unwrap();
        assert_eq!(metadata.get(DescriptorField::PatientId), Some("unpositioned"));
    }

    #[test]
    fn incomplete_first_record_gives_empty_metadata() {
        let mut partial = named("p");
        partial.modality = None;
        let records = [
            record(Some(0.0), 0.0).with_descriptors(partial),
            record(Some(1.0), 0.0).with_descriptors(named("complete")),
        ];
        let (_, metadata) = VolumeLoader::build_volume(&records).unwrap();
        assert!(metadata.is_empty());
    }

    fn descriptor_elements(patient_id: &str) -> Vec<InMemElement> {
        DescriptorField::ALL
            .into_iter()
            .map(|field| {
                let value = match field {
                    DescriptorField::PatientId => patient_id,
                    _ => "x",
                };
                DataElement::new(field.tag(), VR::LO, PrimitiveValue::from(value))
            })
            .collect()
    }

    fn image_at(location: &str, value: u16) -> Vec<InMemElement> {
        let mut elements = image_elements(2, 2, &[value; 4]);
        elements.push(slice_location(location));
        elements
    }

    #[test]
    fn unpositioned_object_without_pixels_is_skipped() {
        let objects = [
            file_object(image_at("1.0", 10)),
            file_object(vec![DataElement::new(
                tags::MODALITY,
                VR::CS,
                PrimitiveValue::from("SR"),
            )]),
            file_object(image_at("2.0", 20)),
        ];
        let (volume, _) =
            VolumeLoader::load_from_dicom_objects(&objects, SortBy::SliceLocation).unwrap();
        assert_eq!(volume.dim(), (2, 2, 2));
        assert_eq!(volume.data()[[1, 1, 0]], 10.0);
        assert_eq!(volume.data()[[1, 1, 1]], 20.0);
    }

    #[test]
    fn directory_is_read_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut later = image_at("-5", 50);
        later.extend(descriptor_elements("b-file"));
        let mut earlier = image_at("7", 70);
        earlier.extend(descriptor_elements("c-file"));

        file_object(later).write_to_file(dir.path().join("b.dcm")).unwrap();
        file_object(earlier).write_to_file(dir.path().join("c.dcm")).unwrap();
        file_object(descriptor_elements("a-file"))
            .write_to_file(dir.path().join("a.dcm"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a slice").unwrap();

        let (volume, metadata) =
            VolumeLoader::load_from_directory(dir.path(), SortBy::SliceLocation).unwrap();
        assert_eq!(volume.dim(), (2, 2, 2));
        assert_eq!(volume.data()[[0, 0, 0]], 50.0);
        assert_eq!(volume.data()[[0, 0, 1]], 70.0);
        // a.dcm has no position but still supplies the table
        assert_eq!(metadata.get(DescriptorField::PatientId), Some("a-file"));
    }

    #[test]
    fn empty_directory_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VolumeLoader::load_from_directory(dir.path(), SortBy::SliceLocation),
            Err(VolumeLoaderError::NoValidImages)
        ));
    }

    #[test]
    fn dcm_extension_is_case_insensitive() {
        assert!(has_dcm_extension(Path::new("a/b/IM0001.DCM")));
        assert!(has_dcm_extension(Path::new("slice.dcm")));
        assert!(!has_dcm_extension(Path::new("slice.dcm.bak")));
        assert!(!has_dcm_extension(Path::new("README")));
    }
}
