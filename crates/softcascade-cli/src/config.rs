//! Arguments of the `delete` command.

use std::path::PathBuf;

use clap::Args;
use softcascade_core::CascadeConfig;

/// Options for running a soft delete against a data fixture.
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Model definition (JSON).
    #[arg(short, long)]
    pub model: PathBuf,

    /// Data fixture (JSON).
    #[arg(short, long)]
    pub data: PathBuf,

    /// Entity to soft-delete, as Type#id.
    #[arg(short, long)]
    pub entity: String,

    /// Run the cascade but discard every change.
    #[arg(long)]
    pub dry_run: bool,

    /// Fail instead of hard-deleting cascade targets that cannot be
    /// soft-deleted.
    #[arg(long)]
    pub no_hard_delete: bool,

    /// Maximum nested soft-delete depth (unbounded when omitted).
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Write the resulting data fixture to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DeleteArgs {
    /// Convert command-line arguments to cascade configuration.
    pub fn into_config(self) -> CascadeConfig {
        let config = CascadeConfig::new().with_hard_delete_fallback(!self.no_hard_delete);
        match self.max_depth {
            Some(depth) => config.with_max_depth(depth),
            None => config.without_max_depth(),
        }
    }
}
