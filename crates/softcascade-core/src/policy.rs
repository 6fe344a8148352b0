//! Soft-delete policies and their applicability rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::AssociationKind;
use crate::error::CascadeError;

/// What happens to a reference when its target is soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Null out the referencing field.
    #[serde(rename = "SET_NULL")]
    SetNull,
    /// Replace the reference with the deleted entity's successor.
    #[serde(rename = "SUCCESSOR")]
    Successor,
    /// Soft-delete (or hard-delete) the referencing entity.
    #[serde(rename = "CASCADE")]
    Cascade,
}

impl Policy {
    /// All policies.
    pub const ALL: [Policy; 3] = [Policy::SetNull, Policy::Successor, Policy::Cascade];

    /// Resolve a declared policy token.
    pub fn resolve(token: &str) -> Result<Self, CascadeError> {
        Self::ALL
            .into_iter()
            .find(|p| p.token() == token)
            .ok_or_else(|| CascadeError::UnknownPolicy {
                token: token.to_string(),
            })
    }

    /// Token used to declare this policy.
    pub fn token(&self) -> &'static str {
        match self {
            Policy::SetNull => "SET_NULL",
            Policy::Successor => "SUCCESSOR",
            Policy::Cascade => "CASCADE",
        }
    }

    /// Whether this policy can be applied to an association of `kind`.
    pub fn supports(&self, kind: AssociationKind) -> bool {
        !(*self == Policy::SetNull && kind == AssociationKind::ManyToMany)
    }
}

/// Check that `policy` is applicable to the association `owner.field`.
pub fn validate(
    policy: Policy,
    kind: AssociationKind,
    owner: &str,
    field: &str,
) -> Result<(), CascadeError> {
    if policy.supports(kind) {
        return Ok(());
    }
    Err(CascadeError::Applicability {
        policy,
        kind,
        owner: owner.to_string(),
        field: field.to_string(),
    })
}

impl FromStr for Policy {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
