//! Structured-field walking
//!
//! Each entry type declares its date-bearing subfields once; the walker
//! handles every category the same way.

use crate::models::{
    DateType, DatedEntry, DiagnosisEntry, HospitalizationEntry, InsuranceEntry, StructuredFields,
};

/// One date-bearing subfield of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DateField<'a> {
    pub name: &'static str,
    pub value: &'a str,
    /// Overrides the category's date type
    pub date_type: Option<DateType>,
}

impl<'a> DateField<'a> {
    fn of(name: &'static str, value: &'a Option<String>) -> Option<Self> {
        Some(Self {
            name,
            value: value.as_deref()?,
            date_type: None,
        })
    }

    fn typed(name: &'static str, value: &'a Option<String>, date_type: DateType) -> Option<Self> {
        Self::of(name, value).map(|f| Self {
            date_type: Some(date_type),
            ..f
        })
    }
}

/// An entry of a structured extraction category
pub(crate) trait FieldRecord {
    fn date_fields(&self) -> Vec<DateField<'_>>;

    fn hospital(&self) -> Option<&str> {
        None
    }

    fn code(&self) -> Option<&str> {
        None
    }
}

impl FieldRecord for DiagnosisEntry {
    fn date_fields(&self) -> Vec<DateField<'_>> {
        DateField::of("date", &self.date).into_iter().collect()
    }

    fn hospital(&self) -> Option<&str> {
        self.hospital.as_deref()
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl FieldRecord for DatedEntry {
    fn date_fields(&self) -> Vec<DateField<'_>> {
        DateField::of("date", &self.date).into_iter().collect()
    }

    fn hospital(&self) -> Option<&str> {
        self.hospital.as_deref()
    }
}

impl FieldRecord for HospitalizationEntry {
    fn date_fields(&self) -> Vec<DateField<'_>> {
        [
            DateField::typed("admissionDate", &self.admission_date, DateType::Admission),
            DateField::typed("dischargeDate", &self.discharge_date, DateType::Discharge),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn hospital(&self) -> Option<&str> {
        self.hospital.as_deref()
    }
}

impl FieldRecord for InsuranceEntry {
    fn date_fields(&self) -> Vec<DateField<'_>> {
        [
            DateField::typed("enrollmentDate", &self.enrollment_date, DateType::InsuranceStart),
            DateField::typed("expiryDate", &self.expiry_date, DateType::InsuranceExpiry),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A category ready to walk: name, default date type and its entries
pub(crate) struct Category<'a> {
    pub name: &'static str,
    pub date_type: DateType,
    pub records: Vec<&'a dyn FieldRecord>,
}

fn category<'a, R: FieldRecord>(
    name: &'static str,
    date_type: DateType,
    entries: &'a Option<Vec<R>>,
) -> Category<'a> {
    Category {
        name,
        date_type,
        records: entries
            .iter()
            .flatten()
            .map(|e| e as &dyn FieldRecord)
            .collect(),
    }
}

/// All known categories in walk order
pub(crate) fn categories(fields: &StructuredFields) -> Vec<Category<'_>> {
    vec![
        category("diagnoses", DateType::Visit, &fields.diagnoses),
        category("examinations", DateType::Test, &fields.examinations),
        category("treatments", DateType::Visit, &fields.treatments),
        category("hospitalizations", DateType::Admission, &fields.hospitalizations),
        category("surgeries", DateType::Surgery, &fields.surgeries),
        category("prescriptions", DateType::Prescription, &fields.prescriptions),
        category("insurance", DateType::Insurance, &fields.insurance),
    ]
}
