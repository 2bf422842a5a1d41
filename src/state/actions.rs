// ============================================================================
// ACTIONS - Conjunto cerrado de transiciones de estado
// ============================================================================

use std::collections::BTreeSet;

use crate::models::{PermissionMap, PermissionOp, TokenDescriptor, UploadRecord, UrlMap};

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Antepone un upload recién creado
    AddUpload(UploadRecord),
    /// Añade al final (hidratación / paginación)
    AddUploads(Vec<UploadRecord>),
    DeleteUpload(i64),
    /// Quita todos los uploads cuyo id esté en el conjunto
    DeleteUploads(BTreeSet<i64>),
    SetUploads(Vec<UploadRecord>),
    SetUploadsLoading(bool),
    SetTotalCount(u64),

    SetPermissions(PermissionMap),
    UpdatePermissions {
        keys: Vec<String>,
        id: i64,
        op: PermissionOp,
    },
    SetPermissionsLoading(bool),

    SetUsername(String),
    SetToken(TokenDescriptor),
    SetUrls(UrlMap),
}

impl Action {
    pub fn update_permissions<K, S>(keys: K, id: i64, op: PermissionOp) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Action::UpdatePermissions {
            keys: keys.into_iter().map(Into::into).collect(),
            id,
            op,
        }
    }

    /// Nombre corto para logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddUpload(_) => "ADD_UPLOAD",
            Action::AddUploads(_) => "ADD_UPLOADS",
            Action::DeleteUpload(_) => "DELETE_UPLOAD",
            Action::DeleteUploads(_) => "DELETE_UPLOADS",
            Action::SetUploads(_) => "SET_UPLOADS",
            Action::SetUploadsLoading(_) => "UPLOADS_LOADING",
            Action::SetTotalCount(_) => "SET_TOTAL_COUNT",
            Action::SetPermissions(_) => "SET_PERMISSIONS",
            Action::UpdatePermissions { .. } => "UPDATE_PERMISSIONS",
            Action::SetPermissionsLoading(_) => "PERMISSIONS_LOADING",
            Action::SetUsername(_) => "SET_USERNAME",
            Action::SetToken(_) => "SET_TOKEN",
            Action::SetUrls(_) => "SET_URLS",
        }
    }
}
