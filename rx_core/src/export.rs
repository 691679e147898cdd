//! CSV export of the prescription registry.
//!
//! The export is written to a temp file next to the target, synced, and
//! renamed over it, so readers never see a half-written CSV.

use crate::{Error, Prescription, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    patient: &'a str,
    doctor: &'a str,
    drug: &'a str,
    dosage: u64,
    units: &'a str,
    description: &'a str,
    filled: bool,
    pharmacist: &'a str,
}

impl<'a> From<&'a Prescription> for CsvRow<'a> {
    fn from(rx: &'a Prescription) -> Self {
        CsvRow {
            id: &rx.id,
            patient: &rx.patient,
            doctor: &rx.doctor,
            drug: &rx.drug,
            dosage: rx.dosage,
            units: &rx.units,
            description: &rx.description,
            filled: rx.filled,
            pharmacist: &rx.pharmacist,
        }
    }
}

/// Write `prescriptions` to `path` as CSV with a header row
///
/// Returns the number of rows written. Replaces any existing file.
pub fn export_csv<'a, I>(prescriptions: I, path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = &'a Prescription>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = NamedTempFile::new_in(dir)?;
    let mut count = 0;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());
        for rx in prescriptions {
            writer.serialize(CsvRow::from(rx))?;
            count += 1;
        }
        // Header is emitted with the first row; write it explicitly when empty
        if count == 0 {
            writer.write_record([
                "id",
                "patient",
                "doctor",
                "drug",
                "dosage",
                "units",
                "description",
                "filled",
                "pharmacist",
            ])?;
        }
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} prescriptions to {:?}", count, path);
    Ok(count)
}
