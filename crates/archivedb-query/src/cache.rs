//! Compiled statement plans and the per-entity plan cache.
//!
//! Each entity type owns one [`StatementCache`] holding three maps (insert,
//! update, upsert) from [`Signature`] to a shared, immutable [`Plan`]. Hits take
//! only the read lock. On a miss the plan is compiled outside any lock and then
//! inserted under the write lock; when two threads race on the same signature
//! both compile and the last insert wins, which is harmless because plans for
//! one signature are identical.

use crate::signature::{PlanKind, Signature};
use archivedb_core::Result;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A compiled statement: SQL text plus its binding plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// The finished SQL text.
    pub sql: String,
    /// Accessor indices supplying the parameters, in placeholder order.
    pub values: Vec<usize>,
    /// Accessor indices receiving `RETURNING` columns, in projection order.
    pub returning: Vec<usize>,
}

impl Plan {
    pub fn expects_returning(&self) -> bool {
        !self.returning.is_empty()
    }
}

type PlanMap = RwLock<HashMap<Signature, Arc<Plan>>>;

/// Read-mostly cache of compiled plans for one entity type.
#[derive(Debug, Default)]
pub struct StatementCache {
    insert: PlanMap,
    update: PlanMap,
    upsert: PlanMap,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: PlanKind) -> &PlanMap {
        match kind {
            PlanKind::Insert => &self.insert,
            PlanKind::Update => &self.update,
            PlanKind::Upsert => &self.upsert,
        }
    }

    /// Look up a cached plan.
    pub fn get(&self, kind: PlanKind, signature: &Signature) -> Option<Arc<Plan>> {
        self.map(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(signature)
            .cloned()
    }

    /// Return the cached plan for `signature`, compiling it on a miss.
    ///
    /// Compilation errors are returned as-is and leave the cache untouched.
    pub fn get_or_compile(
        &self,
        kind: PlanKind,
        signature: Signature,
        compile: impl FnOnce() -> Result<Plan>,
    ) -> Result<Arc<Plan>> {
        if let Some(plan) = self.get(kind, &signature) {
            tracing::trace!(kind = %kind, signature = %signature, "statement cache hit");
            return Ok(plan);
        }

        tracing::trace!(kind = %kind, signature = %signature, "statement cache miss");
        let plan = Arc::new(compile()?);
        self.map(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(signature, Arc::clone(&plan));
        Ok(plan)
    }

    pub fn contains(&self, kind: PlanKind, signature: &Signature) -> bool {
        self.map(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(signature)
    }

    /// Number of cached plans of one kind.
    pub fn len_of(&self, kind: PlanKind) -> usize {
        self.map(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total number of cached plans.
    pub fn len(&self) -> usize {
        [PlanKind::Insert, PlanKind::Update, PlanKind::Upsert]
            .into_iter()
            .map(|k| self.len_of(k))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached plan.
    pub fn clear(&self) {
        for kind in [PlanKind::Insert, PlanKind::Update, PlanKind::Upsert] {
            self.map(kind)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }
}
