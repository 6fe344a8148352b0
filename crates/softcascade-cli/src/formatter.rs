//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use softcascade_core::{AssociationTarget, CascadeResult, Catalog, EntityRef};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format the entity types of a validated catalog.
    fn format_catalog(&self, catalog: &Catalog) -> String;

    /// Format the associations a soft delete of `entity_type` visits.
    fn format_associations(&self, entity_type: &str, targets: &[AssociationTarget<'_>]) -> String;

    /// Format the outcome of a cascade run.
    fn format_cascade(&self, entity: &EntityRef, result: &CascadeResult, dry_run: bool) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn policy_token<'t>(target: &AssociationTarget<'t>) -> &'t str {
    target.association.on_soft_delete.as_deref().unwrap_or("-")
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_catalog(&self, catalog: &Catalog) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Entity", "Parent", "Deleted-at", "Fields"]);

        for entity_type in catalog.entity_types() {
            let parent = entity_type
                .parent
                .and_then(|index| catalog.entity_type_at(index))
                .map(|parent| parent.name.as_str())
                .unwrap_or("-");
            let deleted_at = entity_type
                .soft_delete
                .as_ref()
                .map(|sd| sd.field_name.as_str())
                .unwrap_or("-");
            let name = if entity_type.is_abstract {
                format!("{} (abstract)", entity_type.name)
            } else {
                entity_type.name.clone()
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(parent),
                Cell::new(deleted_at),
                Cell::new(entity_type.fields.len()),
            ]);
        }

        format!("{}\nModel version {} is valid", table, catalog.version())
    }

    fn format_associations(&self, entity_type: &str, targets: &[AssociationTarget<'_>]) -> String {
        if targets.is_empty() {
            return format!("No associations are visited when deleting {}", entity_type);
        }

        let mut table = Table::new();
        table.set_header(vec!["Owner", "Field", "Kind", "Policy"]);
        for target in targets {
            table.add_row(vec![
                Cell::new(&target.owner.name),
                Cell::new(&target.field.name),
                Cell::new(target.association.kind),
                Cell::new(policy_token(target)),
            ]);
        }
        table.to_string()
    }

    fn format_cascade(&self, entity: &EntityRef, result: &CascadeResult, dry_run: bool) -> String {
        let mut output = String::new();

        if !result.mutations.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Entity", "Field", "Change", "Old", "New"]);
            for mutation in &result.mutations {
                table.add_row(vec![
                    Cell::new(&mutation.entity),
                    Cell::new(&mutation.field),
                    Cell::new(format!("{:?}", mutation.kind)),
                    Cell::new(&mutation.old),
                    Cell::new(&mutation.new),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        for removed in &result.removed {
            output.push_str(&format!("hard-deleted {}\n", removed));
        }

        let verb = if dry_run { "would affect" } else { "affected" };
        output.push_str(&format!(
            "Soft delete of {} {} {} entit{}",
            entity,
            verb,
            result.affected_count(),
            if result.affected_count() == 1 { "y" } else { "ies" }
        ));
        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_catalog(&self, catalog: &Catalog) -> String {
        let entities: Vec<serde_json::Value> = catalog
            .entity_types()
            .map(|entity_type| {
                serde_json::json!({
                    "name": entity_type.name,
                    "abstract": entity_type.is_abstract,
                    "soft_delete": entity_type.soft_delete.as_ref().map(|sd| &sd.field_name),
                    "fields": entity_type.fields.iter().map(|f| &f.name).collect::<Vec<_>>(),
                })
            })
            .collect();

        serde_json::json!({
            "version": catalog.version(),
            "valid": true,
            "entities": entities,
        })
        .to_string()
    }

    fn format_associations(&self, entity_type: &str, targets: &[AssociationTarget<'_>]) -> String {
        let associations: Vec<serde_json::Value> = targets
            .iter()
            .map(|target| {
                serde_json::json!({
                    "owner": target.owner.name,
                    "field": target.field.name,
                    "kind": target.association.kind,
                    "policy": target.association.on_soft_delete,
                })
            })
            .collect();

        serde_json::json!({
            "entity": entity_type,
            "associations": associations,
        })
        .to_string()
    }

    fn format_cascade(&self, entity: &EntityRef, result: &CascadeResult, dry_run: bool) -> String {
        serde_json::json!({
            "entity": entity,
            "dry_run": dry_run,
            "affected": result.affected_count(),
            "result": result,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softcascade_core::{
        AssociationDef, EntityDef, FieldDef, FieldIndex, ModelBundle, Mutation, MutationKind,
        Value,
    };

    fn catalog() -> Catalog {
        let model = ModelBundle::new(3)
            .with_entity(
                EntityDef::new("Owner")
                    .with_field(FieldDef::new("deleted_at"))
                    .with_soft_delete("deleted_at"),
            )
            .with_entity(EntityDef::new("Tag").with_field(FieldDef::association(
                "owner",
                AssociationDef::many_to_one("Owner").with_on_soft_delete("SET_NULL"),
            )));
        Catalog::build(&model).unwrap()
    }

    fn result() -> CascadeResult {
        CascadeResult {
            mutations: vec![Mutation {
                entity: EntityRef::new("Tag", 7),
                field: "owner".into(),
                field_index: FieldIndex(0),
                old: Value::Ref(EntityRef::new("Owner", 1)),
                new: Value::Null,
                kind: MutationKind::SetNull,
            }],
            soft_deleted: vec![],
            removed: vec![],
        }
    }

    #[test]
    fn test_table_catalog() {
        let output = TableFormatter.format_catalog(&catalog());
        assert!(output.contains("Owner"));
        assert!(output.contains("deleted_at"));
        assert!(output.contains("Model version 3 is valid"));
    }

    #[test]
    fn test_table_associations() {
        let catalog = catalog();
        let targets = catalog.cascade_candidates(catalog.get("Owner").unwrap());
        let output = TableFormatter.format_associations("Owner", &targets);
        assert!(output.contains("Tag"));
        assert!(output.contains("ManyToOne"));
        assert!(output.contains("SET_NULL"));

        let empty = TableFormatter.format_associations("Tag", &[]);
        assert_eq!(empty, "No associations are visited when deleting Tag");
    }

    #[test]
    fn test_table_cascade() {
        let output = TableFormatter.format_cascade(&EntityRef::new("Owner", 1), &result(), true);
        assert!(output.contains("Tag#7"));
        assert!(output.contains("SetNull"));
        assert!(output.ends_with("Soft delete of Owner#1 would affect 1 entity"));
    }

    #[test]
    fn test_json_cascade() {
        let output = JsonFormatter.format_cascade(&EntityRef::new("Owner", 1), &result(), false);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["affected"], 1);
        assert_eq!(parsed["dry_run"], false);
        assert_eq!(parsed["result"]["mutations"][0]["kind"], "SetNull");
        assert_eq!(parsed["result"]["mutations"][0]["field"], "owner");
    }

    #[test]
    fn test_json_catalog() {
        let output = JsonFormatter.format_catalog(&catalog());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["version"], 3);
        assert_eq!(parsed["entities"][1]["name"], "Tag");
    }
}
