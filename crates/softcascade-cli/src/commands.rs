//! Subcommand implementations.
//!
//! Every command returns its formatted output; `main` prints it.

use std::path::Path;
use std::sync::Arc;

use softcascade_core::{CascadeExecutor, Catalog, EntityRef, Fixture, MemoryStore, ModelBundle};

use crate::config::DeleteArgs;
use crate::error::CliError;
use crate::formatter::Formatter;

/// Load a model file and build its catalog.
fn load_catalog(path: &Path) -> Result<Catalog, CliError> {
    let bundle = ModelBundle::load(path)?;
    let catalog = Catalog::build(&bundle)?;
    tracing::debug!(
        path = %path.display(),
        entity_types = catalog.entity_types().count(),
        "model loaded"
    );
    Ok(catalog)
}

/// Build the catalog and check every soft-delete declaration.
pub fn check(model: &Path, formatter: &dyn Formatter) -> Result<String, CliError> {
    let catalog = load_catalog(model)?;
    catalog.validate()?;
    Ok(formatter.format_catalog(&catalog))
}

/// List the associations a soft delete of `entity_type` visits.
pub fn describe(
    model: &Path,
    entity_type: &str,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let catalog = load_catalog(model)?;
    let entity_type = catalog
        .get(entity_type)
        .ok_or_else(|| CliError::UnknownEntityType(entity_type.to_string()))?;
    let targets = catalog.cascade_candidates(entity_type);
    Ok(formatter.format_associations(&entity_type.name, &targets))
}

/// Soft-delete one entity of a data fixture.
///
/// The updated fixture is written to `--output` unless `--dry-run` is set.
pub fn delete(args: DeleteArgs, formatter: &dyn Formatter) -> Result<String, CliError> {
    let entity: EntityRef = args
        .entity
        .parse()
        .map_err(|_| CliError::InvalidEntity(args.entity.clone()))?;

    let catalog = Arc::new(load_catalog(&args.model)?);
    let mut store = MemoryStore::new(catalog.clone());
    store.load_fixture(&Fixture::load(&args.data)?)?;

    let dry_run = args.dry_run;
    let output = args.output.clone();
    let config = args.into_config();
    tracing::info!(
        entity = %entity,
        dry_run,
        hard_delete_fallback = config.hard_delete_fallback,
        max_depth = ?config.max_depth,
        "running soft delete"
    );

    let executor = CascadeExecutor::new(&catalog).with_config(config);
    let mut tx = store.transaction();
    let result = executor.soft_delete(&mut tx, &entity)?;
    if dry_run {
        tx.rollback();
    } else {
        tx.commit()?;
    }

    if let (Some(path), false) = (output, dry_run) {
        std::fs::write(&path, store.to_fixture().to_json()?)?;
        tracing::info!(path = %path.display(), "fixture written");
    }

    Ok(formatter.format_cascade(&entity, &result, dry_run))
}
