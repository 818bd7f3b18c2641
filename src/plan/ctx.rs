//! Explicit planner context (spec.md Design Note "Implicit planner context":
//! "re-architect as explicit context carried through plan construction").
//!
//! Generalized from the teacher's `query_planner::plan_ctx::PlanCtx` (which
//! tracked table aliases, tenant params, and CTE scopes for SQL rendering):
//! narrowed here to the two things the logical planner actually needs —
//! variable→type bindings for `Evaluator::type_of`, and a counter for
//! generating stable anonymous aliases for unnamed pattern elements.

use std::collections::HashMap;

use crate::value::CypherType;

#[derive(Debug, Clone, Default)]
pub struct PlanCtx {
    variable_types: HashMap<String, CypherType>,
    bound_order: Vec<String>,
    anon_counter: usize,
}

impl PlanCtx {
    pub fn new() -> Self {
        PlanCtx::default()
    }

    /// A fresh, query-unique alias for an unnamed node/relationship pattern
    /// element, e.g. `_n0`, `_r1`.
    pub fn fresh_alias(&mut self, prefix: &str) -> String {
        let alias = format!("_{prefix}{}", self.anon_counter);
        self.anon_counter += 1;
        alias
    }

    /// Records `name`'s static type, in first-bound order (consulted by
    /// `RETURN *` expansion).
    pub fn bind(&mut self, name: &str, ty: CypherType) {
        if !self.variable_types.contains_key(name) {
            self.bound_order.push(name.to_string());
        }
        self.variable_types.insert(name.to_string(), ty);
    }

    pub fn type_of(&self, name: &str) -> Option<&CypherType> {
        self.variable_types.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variable_types.contains_key(name)
    }

    /// Variables in first-bound order, the expansion order for `RETURN *`
    /// (spec.md §4.5).
    pub fn bound_variables(&self) -> &[String] {
        &self.bound_order
    }

    pub fn schema_map(&self) -> HashMap<String, CypherType> {
        self.variable_types.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_aliases_are_unique_and_ordered() {
        let mut ctx = PlanCtx::new();
        assert_eq!(ctx.fresh_alias("n"), "_n0");
        assert_eq!(ctx.fresh_alias("n"), "_n1");
        assert_eq!(ctx.fresh_alias("r"), "_r2");
    }

    #[test]
    fn bind_preserves_first_bound_order() {
        let mut ctx = PlanCtx::new();
        ctx.bind("b", CypherType::Node);
        ctx.bind("a", CypherType::Node);
        ctx.bind("b", CypherType::Node);
        assert_eq!(ctx.bound_variables(), &["b".to_string(), "a".to_string()]);
    }
}
