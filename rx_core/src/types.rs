//! Core domain types for the prescription ledger.
//!
//! - [`Prescription`]: one prescription, stored under its own id
//! - [`Registry`]: the aggregate list of every prescription ever created

use serde::{Deserialize, Serialize};

/// A single prescription record
///
/// `filled` is true exactly when `pharmacist` is non-empty, and never goes
/// back to false once set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    pub id: String,
    /// Patient's full name
    pub patient: String,
    /// Prescribing doctor
    pub doctor: String,
    pub drug: String,
    pub dosage: u64,
    /// e.g. "mg", "ml"
    pub units: String,
    pub description: String,
    #[serde(default)]
    pub filled: bool,
    #[serde(default)]
    pub pharmacist: String,
}

impl Prescription {
    /// Create an unfilled prescription
    pub fn new(
        id: impl Into<String>,
        patient: impl Into<String>,
        doctor: impl Into<String>,
        drug: impl Into<String>,
        dosage: u64,
        units: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            patient: patient.into(),
            doctor: doctor.into(),
            drug: drug.into(),
            dosage,
            units: units.into(),
            description: description.into(),
            filled: false,
            pharmacist: String::new(),
        }
    }

    /// Mark as filled by `pharmacist`
    pub fn fill(&mut self, pharmacist: &str) {
        self.filled = true;
        self.pharmacist = pharmacist.to_string();
    }
}

/// Aggregate list of prescriptions, in creation order
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    #[serde(rename = "prescriptionList", default, deserialize_with = "null_as_empty")]
    pub list: Vec<Prescription>,
}

// An empty registry has historically been persisted as `{"prescriptionList":null}`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Prescription>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Prescription>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Registry {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// First entry with the given id
    pub fn find(&self, id: &str) -> Option<&Prescription> {
        self.list.iter().find(|p| p.id == id)
    }

    /// First entry with the given id, for in-place updates
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Prescription> {
        self.list.iter_mut().find(|p| p.id == id)
    }

    /// Prescriptions still waiting to be filled
    pub fn pending(&self) -> impl Iterator<Item = &Prescription> {
        self.list.iter().filter(|p| !p.filled)
    }

    /// Prescriptions already filled
    pub fn filled(&self) -> impl Iterator<Item = &Prescription> {
        self.list.iter().filter(|p| p.filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amoxicillin() -> Prescription {
        Prescription::new(
            "rx1",
            "Jane Doe",
            "Dr. Smith",
            "Amoxicillin",
            500,
            "mg",
            "twice daily",
        )
    }

    #[test]
    fn test_new_prescription_is_unfilled() {
        let rx = amoxicillin();
        assert!(!rx.filled);
        assert!(rx.pharmacist.is_empty());
    }

    #[test]
    fn test_record_field_names() {
        let value = serde_json::to_value(amoxicillin()).unwrap();
        assert_eq!(value["id"], "rx1");
        assert_eq!(value["dosage"], 500);
        assert_eq!(value["filled"], false);
        assert_eq!(value["pharmacist"], "");
    }

    #[test]
    fn test_registry_wire_name() {
        let mut registry = Registry::default();
        registry.list.push(amoxicillin());
        let json = serde_json::to_string(&registry).unwrap();
        assert!(json.starts_with("{\"prescriptionList\":["));
    }

    #[test]
    fn test_registry_accepts_null_list() {
        let registry: Registry = serde_json::from_str(r#"{"prescriptionList":null}"#).unwrap();
        assert!(registry.is_empty());

        let registry: Registry = serde_json::from_str("{}").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut registry = Registry::default();
        registry.list.push(amoxicillin());
        let mut dup = amoxicillin();
        dup.drug = "Ibuprofen".into();
        registry.list.push(dup);

        assert_eq!(registry.find("rx1").unwrap().drug, "Amoxicillin");
        registry.find_mut("rx1").unwrap().fill("PharmA");
        assert!(registry.list[0].filled);
        assert!(!registry.list[1].filled);
    }

    #[test]
    fn test_pending_and_filled_views() {
        let mut registry = Registry::default();
        registry.list.push(amoxicillin());
        let mut other = amoxicillin();
        other.id = "rx2".into();
        other.fill("PharmA");
        registry.list.push(other);

        let pending: Vec<_> = registry.pending().map(|p| p.id.as_str()).collect();
        let filled: Vec<_> = registry.filled().map(|p| p.id.as_str()).collect();
        assert_eq!(pending, vec!["rx1"]);
        assert_eq!(filled, vec!["rx2"]);
    }
}
