//! Patient and study descriptors shown next to a series.

use std::fmt;

use dicom::object::{FileDicomObject, InMemDicomObject};
use dicom_dictionary_std::tags;

/// The descriptor fields of a slice, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorField {
    PatientId,
    PatientName,
    StudyDescription,
    PatientBirthDate,
    StudyDate,
    Modality,
    Manufacturer,
    InstitutionName,
    ProtocolName,
}

impl DescriptorField {
    pub const ALL: [DescriptorField; 9] = [
        DescriptorField::PatientId,
        DescriptorField::PatientName,
        DescriptorField::StudyDescription,
        DescriptorField::PatientBirthDate,
        DescriptorField::StudyDate,
        DescriptorField::Modality,
        DescriptorField::Manufacturer,
        DescriptorField::InstitutionName,
        DescriptorField::ProtocolName,
    ];

    /// DICOM keyword of the attribute
    pub fn keyword(self) -> &'static str {
        match self {
            DescriptorField::PatientId => "PatientID",
            DescriptorField::PatientName => "PatientName",
            DescriptorField::StudyDescription => "StudyDescription",
            DescriptorField::PatientBirthDate => "PatientBirthDate",
            DescriptorField::StudyDate => "StudyDate",
            DescriptorField::Modality => "Modality",
            DescriptorField::Manufacturer => "Manufacturer",
            DescriptorField::InstitutionName => "InstitutionName",
            DescriptorField::ProtocolName => "ProtocolName",
        }
    }

    pub(crate) fn tag(self) -> dicom::core::Tag {
        match self {
            DescriptorField::PatientId => tags::PATIENT_ID,
            DescriptorField::PatientName => tags::PATIENT_NAME,
            DescriptorField::StudyDescription => tags::STUDY_DESCRIPTION,
            DescriptorField::PatientBirthDate => tags::PATIENT_BIRTH_DATE,
            DescriptorField::StudyDate => tags::STUDY_DATE,
            DescriptorField::Modality => tags::MODALITY,
            DescriptorField::Manufacturer => tags::MANUFACTURER,
            DescriptorField::InstitutionName => tags::INSTITUTION_NAME,
            DescriptorField::ProtocolName => tags::PROTOCOL_NAME,
        }
    }
}

/// Optional descriptor attributes carried by one slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptors {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub study_description: Option<String>,
    pub patient_birth_date: Option<String>,
    pub study_date: Option<String>,
    pub modality: Option<String>,
    pub manufacturer: Option<String>,
    pub institution_name: Option<String>,
    pub protocol_name: Option<String>,
}

impl Descriptors {
    /// Reads the descriptor attributes present in a DICOM object.
    ///
    /// An attribute that is present but empty is kept as an empty string;
    /// only absent attributes become `None`.
    pub fn from_dicom_object(dicom_object: &FileDicomObject<InMemDicomObject>) -> Self {
        let mut descriptors = Self::default();
        for field in DescriptorField::ALL {
            let value = dicom_object
                .element(field.tag())
                .ok()
                .and_then(|element| element.to_str().ok())
                .map(|value| value.trim().to_owned());
            *descriptors.field_mut(field) = value;
        }
        descriptors
    }

    pub fn get(&self, field: DescriptorField) -> Option<&str> {
        let value = match field {
            DescriptorField::PatientId => &self.patient_id,
            DescriptorField::PatientName => &self.patient_name,
            DescriptorField::StudyDescription => &self.study_description,
            DescriptorField::PatientBirthDate => &self.patient_birth_date,
            DescriptorField::StudyDate => &self.study_date,
            DescriptorField::Modality => &self.modality,
            DescriptorField::Manufacturer => &self.manufacturer,
            DescriptorField::InstitutionName => &self.institution_name,
            DescriptorField::ProtocolName => &self.protocol_name,
        };
        value.as_deref()
    }

    pub fn field_mut(&mut self, field: DescriptorField) -> &mut Option<String> {
        match field {
            DescriptorField::PatientId => &mut self.patient_id,
            DescriptorField::PatientName => &mut self.patient_name,
            DescriptorField::StudyDescription => &mut self.study_description,
            DescriptorField::PatientBirthDate => &mut self.patient_birth_date,
            DescriptorField::StudyDate => &mut self.study_date,
            DescriptorField::Modality => &mut self.modality,
            DescriptorField::Manufacturer => &mut self.manufacturer,
            DescriptorField::InstitutionName => &mut self.institution_name,
            DescriptorField::ProtocolName => &mut self.protocol_name,
        }
    }
}

/// Single-row "Patient" table built from one slice's descriptors.
///
/// The table is either complete (all nine fields) or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    rows: Vec<(DescriptorField, String)>,
}

impl MetadataTable {
    /// Builds the table, or an empty one if any field is missing.
    pub fn from_descriptors(descriptors: &Descriptors) -> Self {
        let rows: Option<Vec<_>> = DescriptorField::ALL
            .iter()
            .map(|&field| descriptors.get(field).map(|value| (field, value.to_owned())))
            .collect();
        match rows {
            Some(rows) => Self { rows },
            None => {
                log::debug!("Incomplete patient descriptors, metadata table left empty");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, field: DescriptorField) -> Option<&str> {
        self.rows
            .iter()
            .find(|(row_field, _)| *row_field == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn rows(&self) -> impl Iterator<Item = (DescriptorField, &str)> {
        self.rows.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl fmt::Display for MetadataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = DescriptorField::ALL
            .iter()
            .map(|field| field.keyword().len())
            .max()
            .unwrap_or_default();
        writeln!(f, "{:width$}  Patient", "")?;
        for (field, value) in self.rows() {
            writeln!(f, "{:width$}  {value}", field.keyword())?;
        }
        Ok(())
    }
}
