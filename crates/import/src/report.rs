//! Import statistics.

use registry_core::Upserted;
use serde::Serialize;
use std::fmt;

/// Row outcomes for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    pub entity: &'static str,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl EntityStats {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: Upserted) {
        match outcome {
            Upserted::Created => self.created += 1,
            Upserted::Updated => self.updated += 1,
            Upserted::Unchanged => self.unchanged += 1,
        }
    }

    pub fn rows(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Per-entity statistics in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub dry_run: bool,
    pub entities: Vec<EntityStats>,
}

impl ImportReport {
    pub fn get(&self, entity: &str) -> Option<&EntityStats> {
        self.entities.iter().find(|s| s.entity == entity)
    }

    pub fn total_created(&self) -> usize {
        self.entities.iter().map(|s| s.created).sum()
    }

    pub fn total_rows(&self) -> usize {
        self.entities.iter().map(EntityStats::rows).sum()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stats in &self.entities {
            writeln!(
                f,
                "{:<40} created {:>6}  updated {:>6}  unchanged {:>6}",
                stats.entity, stats.created, stats.updated, stats.unchanged
            )?;
        }
        if self.dry_run {
            writeln!(f, "dry run: all changes rolled back")?;
        }
        Ok(())
    }
}
