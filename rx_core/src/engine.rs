//! Prescription lifecycle engine.
//!
//! Every prescription lives in two places on the ledger:
//! 1. its own record, keyed by prescription id
//! 2. an entry in the registry, a single list under the registry key
//!
//! The engine is the only writer of both. Each mutation writes the record
//! first and then read-modify-writes the registry. The two writes are not
//! atomic with respect to each other unless the ledger passed in makes them
//! so (see [`crate::ledger::Transaction`] and [`crate::dispatch::invoke`]).

use crate::ledger::Ledger;
use crate::{Error, Prescription, Registry, Result};

/// Default ledger key of the registry
pub const DEFAULT_REGISTRY_KEY: &str = "_prescriptions";

/// Default ledger key written by `init`
pub const DEFAULT_PROBE_KEY: &str = "abc";

/// Creates and fills prescriptions, keeping record store and registry in step
#[derive(Clone, Debug)]
pub struct PrescriptionEngine {
    registry_key: String,
    probe_key: String,
}

impl Default for PrescriptionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_KEY)
    }
}

impl PrescriptionEngine {
    /// Engine storing its registry under `registry_key`
    pub fn new(registry_key: impl Into<String>) -> Self {
        Self {
            registry_key: registry_key.into(),
            probe_key: DEFAULT_PROBE_KEY.to_string(),
        }
    }

    /// Use `probe_key` for the value written by `init`
    pub fn with_probe_key(mut self, probe_key: impl Into<String>) -> Self {
        self.probe_key = probe_key.into();
        self
    }

    pub fn registry_key(&self) -> &str {
        &self.registry_key
    }

    pub fn probe_key(&self) -> &str {
        &self.probe_key
    }

    /// Reset the registry to empty
    ///
    /// Not a no-op when repeated: every prior registry entry is discarded.
    /// Standalone records are left in place.
    pub fn initialize<L: Ledger + ?Sized>(&self, ledger: &mut L) -> Result<()> {
        let bytes = serde_json::to_vec(&Registry::default())?;
        put(ledger, &self.registry_key, &bytes)?;
        tracing::info!("Initialized empty registry under {:?}", self.registry_key);
        Ok(())
    }

    /// `init [assetValue]`: record the integer probe value, then reset the registry
    pub fn init<L, S>(&self, ledger: &mut L, args: &[S]) -> Result<()>
    where
        L: Ledger + ?Sized,
        S: AsRef<str>,
    {
        let [value] = arity::<S, 1>("init", args)?;
        let value: i64 = value
            .parse()
            .map_err(|_| Error::InvalidAssetValue(value.to_string()))?;

        put(ledger, &self.probe_key, value.to_string().as_bytes())?;
        self.initialize(ledger)
    }

    /// `add_prescription [id, patient, doctor, drug, dosage, units, description]`
    pub fn add_prescription<L, S>(&self, ledger: &mut L, args: &[S]) -> Result<Prescription>
    where
        L: Ledger + ?Sized,
        S: AsRef<str>,
    {
        let [id, patient, doctor, drug, dosage, units, description] =
            arity::<S, 7>("add_prescription", args)?;
        let dosage: u64 = dosage
            .parse()
            .map_err(|_| Error::InvalidDosageFormat(dosage.to_string()))?;

        let rx = Prescription::new(id, patient, doctor, drug, dosage, units, description);
        self.create(ledger, rx.clone())?;
        Ok(rx)
    }

    /// Store a new prescription and append it to the registry
    ///
    /// Ids are not checked for uniqueness; a reused id overwrites the record
    /// and adds a second registry entry.
    pub fn create<L: Ledger + ?Sized>(&self, ledger: &mut L, rx: Prescription) -> Result<()> {
        tracing::debug!("Adding prescription {:?}", rx);

        put(ledger, &rx.id, &serde_json::to_vec(&rx)?)?;

        let mut registry = self.registry(ledger)?;
        let id = rx.id.clone();
        registry.list.push(rx);
        self.save_registry(ledger, &registry)?;

        tracing::info!(
            "Added prescription {} ({} in registry)",
            id,
            registry.len()
        );
        Ok(())
    }

    /// `fill_prescription [id, pharmacist]`
    pub fn fill_prescription<L, S>(&self, ledger: &mut L, args: &[S]) -> Result<Prescription>
    where
        L: Ledger + ?Sized,
        S: AsRef<str>,
    {
        let [id, pharmacist] = arity::<S, 2>("fill_prescription", args)?;
        self.fill(ledger, id, pharmacist)
    }

    /// Mark prescription `id` filled by `pharmacist` in both views
    pub fn fill<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        id: &str,
        pharmacist: &str,
    ) -> Result<Prescription> {
        // A filled prescription must name who filled it
        if pharmacist.trim().is_empty() {
            return Err(Error::MissingPharmacist(id.to_string()));
        }

        let mut rx = self.prescription(ledger, id)?;

        if rx.filled {
            tracing::warn!(
                "Double fill attempt on {} (already filled by {})",
                id,
                rx.pharmacist
            );
            return Err(Error::AlreadyFilled {
                id: id.to_string(),
                pharmacist: rx.pharmacist,
            });
        }

        rx.fill(pharmacist);
        put(ledger, id, &serde_json::to_vec(&rx)?)?;

        let mut registry = self.registry(ledger)?;
        match registry.find_mut(id) {
            Some(entry) => entry.fill(pharmacist),
            None => {
                tracing::warn!(
                    "Prescription {} has a record but no registry entry",
                    id
                );
                return Err(Error::RegistryEntryNotFound(id.to_string()));
            }
        }
        self.save_registry(ledger, &registry)?;

        tracing::info!("Filled prescription {} by {}", id, pharmacist);
        Ok(rx)
    }

    /// Raw bytes under `key`, empty if absent
    pub fn read<L: Ledger + ?Sized>(&self, ledger: &L, key: &str) -> Result<Vec<u8>> {
        let value = ledger
            .get(key)
            .map_err(|e| passthrough(e, |e| Error::store_read(key, e)))?;
        tracing::debug!("Read {:?} ({} bytes)", key, value.as_ref().map_or(0, Vec::len));
        Ok(value.unwrap_or_default())
    }

    /// Store raw bytes under `key` with no validation
    pub fn write<L: Ledger + ?Sized>(&self, ledger: &mut L, key: &str, value: &[u8]) -> Result<()> {
        put(ledger, key, value)?;
        tracing::debug!("Wrote {:?} ({} bytes)", key, value.len());
        Ok(())
    }

    /// Current registry; missing or empty reads as an empty registry
    pub fn registry<L: Ledger + ?Sized>(&self, ledger: &L) -> Result<Registry> {
        let bytes = ledger
            .get(&self.registry_key)
            .map_err(|e| Error::RegistryRead(e.to_string()))?;

        match bytes {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(&bytes).map_err(|e| Error::RegistryRead(e.to_string()))
            }
            _ => Ok(Registry::default()),
        }
    }

    /// Standalone record for `id`
    pub fn prescription<L: Ledger + ?Sized>(&self, ledger: &L, id: &str) -> Result<Prescription> {
        let bytes = ledger
            .get(id)
            .map_err(|e| passthrough(e, |e| Error::store_read(id, e)))?;

        match bytes {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(&bytes).map_err(|e| Error::CorruptRecord {
                    key: id.to_string(),
                    reason: e.to_string(),
                })
            }
            _ => Err(Error::PrescriptionNotFound(id.to_string())),
        }
    }

    fn save_registry<L: Ledger + ?Sized>(&self, ledger: &mut L, registry: &Registry) -> Result<()> {
        put(ledger, &self.registry_key, &serde_json::to_vec(registry)?)
    }
}

/// Destructure exactly `N` arguments or fail with the arity error
fn arity<'a, S: AsRef<str>, const N: usize>(
    operation: &str,
    args: &'a [S],
) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(Error::arity(operation, N, args.len()));
    }
    Ok(std::array::from_fn(move |i| args[i].as_ref()))
}

fn put<L: Ledger + ?Sized>(ledger: &mut L, key: &str, value: &[u8]) -> Result<()> {
    ledger
        .put(key, value)
        .map_err(|e| passthrough(e, |e| Error::store_write(key, e)))
}

// Keep ledger failures that are already classified, wrap anything else.
fn passthrough(err: Error, wrap: impl FnOnce(Error) -> Error) -> Error {
    match err {
        Error::StoreWrite { .. } | Error::StoreRead { .. } => err,
        other => wrap(other),
    }
}
