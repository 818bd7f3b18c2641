//! Procedure registry contract (spec.md §4.4, §6).
//!
//! The engine never implements a procedure body — it only knows how to
//! call one through [`CallableProcedure`] and look one up through a
//! [`ProcedureRegistry`] a host populates. Generalized from the teacher's
//! `ProcedureRegistry` (which hard-coded a fixed set of APOC/db.* bodies);
//! here the registry is bare infrastructure, carrying no built-ins.

use std::collections::HashMap;

use crate::graph::model::{GraphModelError, ProcedureSignature};
use crate::value::Value;

/// A host-registered callable with typed inputs and tabular output
/// (spec.md GLOSSARY "Procedure").
pub trait CallableProcedure: Send + Sync {
    fn signature(&self) -> &ProcedureSignature;

    /// `call`'s row arity must equal `signature().outputs.len()` (spec.md §6).
    fn call(&self, args: &[Value]) -> Result<Vec<Vec<Value>>, GraphModelError>;
}

/// Namespace-qualified lookup table of procedures, keyed `"namespace.name"`.
#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: HashMap<String, Box<dyn CallableProcedure>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        namespace: &str,
        name: &str,
        procedure: impl CallableProcedure + 'static,
    ) {
        self.procedures
            .insert(format!("{namespace}.{name}"), Box::new(procedure));
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&dyn CallableProcedure> {
        self.procedures
            .get(&format!("{namespace}.{name}"))
            .map(|p| p.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(ProcedureSignature);

    impl CallableProcedure for Echo {
        fn signature(&self) -> &ProcedureSignature {
            &self.0
        }

        fn call(&self, args: &[Value]) -> Result<Vec<Vec<Value>>, GraphModelError> {
            Ok(vec![args.to_vec()])
        }
    }

    #[test]
    fn registers_and_looks_up_by_namespace_and_name() {
        let mut registry = ProcedureRegistry::new();
        registry.register(
            "db",
            "labels",
            Echo(ProcedureSignature {
                inputs: vec![],
                outputs: vec![("label".to_string(), crate::value::CypherType::String)],
            }),
        );
        assert!(registry.get("db", "labels").is_some());
        assert!(registry.get("db", "missing").is_none());
    }
}
