//! Operation routing.
//!
//! Maps an operation name plus string arguments onto the lifecycle engine.
//! Each invocation runs inside a [`Transaction`], so a failed operation
//! leaves the ledger exactly as it found it.

use crate::engine::PrescriptionEngine;
use crate::ledger::{Ledger, Transaction};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Operations routed to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Init,
    AddPrescription,
    FillPrescription,
    Query,
    Write,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::AddPrescription => "add_prescription",
            Operation::FillPrescription => "fill_prescription",
            Operation::Query => "query",
            Operation::Write => "write",
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "init" => Ok(Operation::Init),
            "add_prescription" => Ok(Operation::AddPrescription),
            "fill_prescription" => Ok(Operation::FillPrescription),
            "query" | "read" => Ok(Operation::Query),
            "write" => Ok(Operation::Write),
            other => Err(Error::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run the named operation against `ledger`
///
/// Returns the raw value for `query`/`read` and an empty payload otherwise.
/// Writes reach `ledger` only if the whole operation succeeds.
pub fn invoke<L, S>(
    engine: &PrescriptionEngine,
    ledger: &mut L,
    operation: &str,
    args: &[S],
) -> Result<Vec<u8>>
where
    L: Ledger + ?Sized,
    S: AsRef<str>,
{
    let op = operation.parse::<Operation>().map_err(|e| {
        tracing::warn!("invoke did not find func: {}", operation);
        e
    })?;
    tracing::info!("invoke is running {}", op);

    let mut tx = Transaction::begin(ledger);
    let payload = match op {
        Operation::Init => engine.init(&mut tx, args).map(|_| Vec::new()),
        Operation::AddPrescription => engine.add_prescription(&mut tx, args).map(|_| Vec::new()),
        Operation::FillPrescription => engine.fill_prescription(&mut tx, args).map(|_| Vec::new()),
        Operation::Query => match args {
            [key] => engine.read(&tx, key.as_ref()),
            _ => Err(Error::arity(op.name(), 1, args.len())),
        },
        Operation::Write => match args {
            [key, value] => engine
                .write(&mut tx, key.as_ref(), value.as_ref().as_bytes())
                .map(|_| Vec::new()),
            _ => Err(Error::arity(op.name(), 2, args.len())),
        },
    };

    match payload {
        Ok(payload) => {
            tx.commit()?;
            Ok(payload)
        }
        Err(e) => {
            tracing::warn!("{} failed: {}", op, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::Prescription;

    fn setup() -> (PrescriptionEngine, MemoryLedger) {
        crate::logging::init_test();
        let engine = PrescriptionEngine::default();
        let mut ledger = MemoryLedger::new();
        invoke(&engine, &mut ledger, "init", &["100"]).unwrap();
        (engine, ledger)
    }

    fn add_rx1(engine: &PrescriptionEngine, ledger: &mut MemoryLedger) {
        invoke(
            engine,
            ledger,
            "add_prescription",
            &[
                "rx1",
                "Jane Doe",
                "Dr. Smith",
                "Amoxicillin",
                "500",
                "mg",
                "twice daily",
            ],
        )
        .unwrap();
    }

    fn query(engine: &PrescriptionEngine, ledger: &mut MemoryLedger, key: &str) -> Prescription {
        let bytes = invoke(engine, ledger, "query", &[key]).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_operation_names() {
        assert_eq!("read".parse::<Operation>().unwrap(), Operation::Query);
        assert_eq!("query".parse::<Operation>().unwrap(), Operation::Query);
        assert_eq!(
            "fill_prescription".parse::<Operation>().unwrap().to_string(),
            "fill_prescription"
        );
    }

    #[test]
    fn test_unknown_operation() {
        let (engine, mut ledger) = setup();
        let err = invoke(&engine, &mut ledger, "delete", &["rx1"]).unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(ref op) if op == "delete"));
    }

    #[test]
    fn test_prescription_scenario() {
        let (engine, mut ledger) = setup();
        add_rx1(&engine, &mut ledger);

        let rx = query(&engine, &mut ledger, "rx1");
        assert_eq!(rx.patient, "Jane Doe");
        assert_eq!(rx.dosage, 500);
        assert!(!rx.filled);
        assert_eq!(rx.pharmacist, "");

        invoke(&engine, &mut ledger, "fill_prescription", &["rx1", "PharmA"]).unwrap();
        let filled = query(&engine, &mut ledger, "rx1");
        assert!(filled.filled);
        assert_eq!(filled.pharmacist, "PharmA");

        let err = invoke(&engine, &mut ledger, "fill_prescription", &["rx1", "PharmB"])
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyFilled { .. }));
        assert_eq!(query(&engine, &mut ledger, "rx1"), filled);
    }

    #[test]
    fn test_failed_operation_commits_nothing() {
        let (engine, mut ledger) = setup();
        // Record with no registry entry: the fill fails after its record write
        let record = Prescription::new("rx1", "p", "d", "drug", 1, "mg", "");
        engine
            .write(&mut ledger, "rx1", &serde_json::to_vec(&record).unwrap())
            .unwrap();

        let err = invoke(&engine, &mut ledger, "fill_prescription", &["rx1", "PharmA"])
            .unwrap_err();
        assert!(matches!(err, Error::RegistryEntryNotFound(_)));

        // Record write was rolled back with the rest of the operation
        let rx = query(&engine, &mut ledger, "rx1");
        assert!(!rx.filled);
    }

    #[test]
    fn test_query_and_write_arity() {
        let (engine, mut ledger) = setup();
        let err = invoke::<_, &str>(&engine, &mut ledger, "query", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentCount { expected: 1, .. }));

        let err = invoke(&engine, &mut ledger, "write", &["k"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentCount { expected: 2, .. }));
    }

    #[test]
    fn test_write_then_read_passthrough() {
        let (engine, mut ledger) = setup();
        invoke(&engine, &mut ledger, "write", &["greeting", "hello"]).unwrap();
        let value = invoke(&engine, &mut ledger, "read", &["greeting"]).unwrap();
        assert_eq!(value, b"hello".to_vec());
        assert_eq!(
            invoke(&engine, &mut ledger, "query", &["abc"]).unwrap(),
            b"100".to_vec()
        );
    }

    #[test]
    fn test_fill_against_corrupt_registry_commits_nothing() {
        let (engine, mut ledger) = setup();
        add_rx1(&engine, &mut ledger);
        engine
            .write(&mut ledger, engine.registry_key(), b"{ not json")
            .unwrap();

        let err = invoke(&engine, &mut ledger, "fill_prescription", &["rx1", "PharmA"])
            .unwrap_err();
        assert!(matches!(err, Error::RegistryRead(_)));

        let rx = query(&engine, &mut ledger, "rx1");
        assert!(!rx.filled);
        assert_eq!(rx.pharmacist, "");
        assert_eq!(
            invoke(&engine, &mut ledger, "query", &[engine.registry_key()]).unwrap(),
            b"{ not json".to_vec()
        );
    }
}
