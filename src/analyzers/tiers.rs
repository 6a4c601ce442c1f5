use tracing::{debug, warn};

use crate::analyzers::labels::ClassLabel;
use crate::analyzers::types::{ClassTable, TierAssignment};
use crate::config::TierConfig;

/// Splits the classes of `table` into the configured tiers.
///
/// Tiers keep their configured order and classes come back ascending, labelled
/// as they appear in the table. A tier without any class in the table is left
/// out. Classes that belong to no tier are excluded from the result; they are
/// only reported through the log.
pub fn group_by_tier<T: ClassTable + ?Sized>(table: &T, config: &TierConfig) -> Vec<TierAssignment> {
    let present = table.class_labels();
    let mut assignments = Vec::new();

    for tier in config.tiers() {
        let classes: Vec<ClassLabel> = present
            .iter()
            .filter(|class| tier.classes.contains(class))
            .cloned()
            .collect();

        if classes.is_empty() {
            debug!(tier = %tier.name, "No class of this tier in the table");
            continue;
        }

        assignments.push(TierAssignment {
            tier: tier.name.clone(),
            color: tier.color.clone(),
            classes,
        });
    }

    let unassigned = unassigned_classes(table, config);
    if !unassigned.is_empty() {
        let names: Vec<&str> = unassigned.iter().map(ClassLabel::as_str).collect();
        warn!(classes = ?names, "Classes without a tier are left out of tiered output");
    }

    assignments
}

/// Classes present in `table` that no configured tier lists.
pub fn unassigned_classes<T: ClassTable + ?Sized>(table: &T, config: &TierConfig) -> Vec<ClassLabel> {
    table
        .class_labels()
        .into_iter()
        .filter(|class| config.tier_of(class).is_none())
        .collect()
}
