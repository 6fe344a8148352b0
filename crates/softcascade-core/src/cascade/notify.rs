//! Change notification towards the persistence layer.

use crate::context::PersistenceContext;
use crate::error::Result;
use crate::mutation::Mutation;

/// Applies mutations through the persistence context and keeps a journal.
///
/// Every mutation is written, reported to change tracking, and scheduled as
/// an extra update so the next flush includes it.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    journal: Vec<Mutation>,
}

impl ChangeNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation and record it.
    pub fn apply(&mut self, ctx: &mut dyn PersistenceContext, mutation: Mutation) -> Result<()> {
        ctx.write_field(&mutation.entity, mutation.field_index, mutation.new.clone())?;
        ctx.mark_mutated(&mutation);
        ctx.schedule_update(&mutation.entity, mutation.change_set());

        tracing::debug!(
            entity = %mutation.entity,
            field = %mutation.field,
            kind = ?mutation.kind,
            old = %mutation.old,
            new = %mutation.new,
            "field mutated"
        );

        self.journal.push(mutation);
        Ok(())
    }

    /// Mutations applied so far.
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    /// Consume the notifier, returning its journal.
    pub fn into_journal(self) -> Vec<Mutation> {
        self.journal
    }
}
