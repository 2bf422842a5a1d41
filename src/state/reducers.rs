// ============================================================================
// REDUCERS - (estado, acción) → estado nuevo, sin mutar el anterior
// ============================================================================

use std::rc::Rc;

use crate::models::{PermissionMap, PermissionOp, TokenDescriptor, UploadRecord, UrlMap};
use crate::state::{Action, AppState};

/// Reducer raíz: combina los reducers de cada slice
pub fn reduce(state: &AppState, action: &Action) -> AppState {
    AppState {
        uploads: uploads(&state.uploads, action),
        uploads_loading: uploads_loading(state.uploads_loading, action),
        uploads_total_count: uploads_total_count(state.uploads_total_count, action),
        permissions: permissions(&state.permissions, action),
        permissions_loading: permissions_loading(state.permissions_loading, action),
        username: username(&state.username, action),
        token: token(&state.token, action),
        urls: urls(&state.urls, action),
    }
}

pub fn uploads(state: &Rc<Vec<UploadRecord>>, action: &Action) -> Rc<Vec<UploadRecord>> {
    match action {
        Action::AddUpload(upload) => {
            let mut next = Vec::with_capacity(state.len() + 1);
            next.push(upload.clone());
            next.extend(state.iter().cloned());
            Rc::new(next)
        }
        Action::AddUploads(new_uploads) => {
            let mut next = Vec::with_capacity(state.len() + new_uploads.len());
            next.extend(state.iter().cloned());
            next.extend(new_uploads.iter().cloned());
            Rc::new(next)
        }
        Action::DeleteUpload(id) => Rc::new(
            state.iter().filter(|upload| upload.id != *id).cloned().collect(),
        ),
        Action::DeleteUploads(ids) => Rc::new(
            state.iter().filter(|upload| !ids.contains(&upload.id)).cloned().collect(),
        ),
        Action::SetUploads(new_uploads) => Rc::new(new_uploads.clone()),
        _ => Rc::clone(state),
    }
}

pub fn uploads_loading(state: bool, action: &Action) -> bool {
    match action {
        Action::SetUploadsLoading(loading) => *loading,
        _ => state,
    }
}

pub fn uploads_total_count(state: u64, action: &Action) -> u64 {
    match action {
        Action::SetTotalCount(count) => *count,
        _ => state,
    }
}

pub fn permissions(state: &Rc<PermissionMap>, action: &Action) -> Rc<PermissionMap> {
    match action {
        Action::SetPermissions(map) => Rc::new(map.clone()),
        Action::UpdatePermissions { keys, id, op } => {
            Rc::new(update_current_permissions(state, keys, *id, *op))
        }
        _ => Rc::clone(state),
    }
}

/// Añade o quita `id` del conjunto de cada clave en `keys`.
///
/// Las claves que no están en el mapa se ignoran: una clave ausente
/// significa "nada permitido" y así sigue.
fn update_current_permissions(
    permissions: &PermissionMap,
    keys: &[String],
    id: i64,
    op: PermissionOp,
) -> PermissionMap {
    let mut next = permissions.clone();
    for key in keys {
        match next.get_mut(key) {
            Some(permission) => match op {
                PermissionOp::Add => {
                    permission.ids.insert(id);
                }
                PermissionOp::Delete => {
                    permission.ids.remove(&id);
                }
            },
            None => log::warn!("⚠️ Permiso '{}' desconocido, se ignora ({} {})", key, op, id),
        }
    }
    next
}

pub fn permissions_loading(state: bool, action: &Action) -> bool {
    match action {
        Action::SetPermissionsLoading(loading) => *loading,
        _ => state,
    }
}

pub fn username(state: &Option<Rc<String>>, action: &Action) -> Option<Rc<String>> {
    match action {
        Action::SetUsername(name) => Some(Rc::new(name.clone())),
        _ => state.clone(),
    }
}

pub fn token(state: &Option<Rc<TokenDescriptor>>, action: &Action) -> Option<Rc<TokenDescriptor>> {
    match action {
        Action::SetToken(token) => Some(Rc::new(token.clone())),
        _ => state.clone(),
    }
}

pub fn urls(state: &Rc<UrlMap>, action: &Action) -> Rc<UrlMap> {
    match action {
        Action::SetUrls(urls) => Rc::new(urls.clone()),
        _ => Rc::clone(state),
    }
}
