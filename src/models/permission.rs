use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Concesión de una capacidad sobre un conjunto de uploads
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub ids: BTreeSet<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    pub fn with_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            description: None,
        }
    }
}

/// Clave de permiso → ids autorizados para el usuario de la sesión
pub type PermissionMap = BTreeMap<String, Permission>;

/// Operación de `UpdatePermissions`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionOp {
    Add,
    Delete,
}

impl FromStr for PermissionOp {
    type Err = ApiError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op {
            "add" => Ok(PermissionOp::Add),
            "delete" => Ok(PermissionOp::Delete),
            other => Err(ApiError::Validation(format!(
                "Invalid operation on permission object: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for PermissionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionOp::Add => f.write_str("add"),
            PermissionOp::Delete => f.write_str("delete"),
        }
    }
}

/// ¿Tiene el usuario la capacidad `key` sobre el upload `id`?
///
/// Solo orienta el render; una clave ausente equivale a "nada permitido".
pub fn has_capability(permissions: &PermissionMap, key: &str, id: i64) -> bool {
    permissions
        .get(key)
        .map(|permission| permission.ids.contains(&id))
        .unwrap_or(false)
}
