// ============================================================================
// APP STATE - Árbol de estado del gestor (serializable)
// ============================================================================
// Cada slice va detrás de un Rc: un reducer que no toca un slice devuelve el
// mismo Rc, así los suscriptores pueden comparar por puntero.
// ============================================================================

use std::rc::Rc;

use serde::Serialize;

use crate::models::{has_capability, PermissionMap, Session, TokenDescriptor, UploadRecord, UrlMap};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppState {
    pub uploads: Rc<Vec<UploadRecord>>,
    pub uploads_loading: bool,
    pub uploads_total_count: u64,
    pub permissions: Rc<PermissionMap>,
    pub permissions_loading: bool,

    pub username: Option<Rc<String>>,
    // Nunca sale en los snapshots entregados a JS
    #[serde(skip)]
    pub token: Option<Rc<TokenDescriptor>>,
    pub urls: Rc<UrlMap>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            uploads: Rc::new(Vec::new()),
            uploads_loading: true,
            uploads_total_count: 0,
            permissions: Rc::new(PermissionMap::new()),
            permissions_loading: true,
            username: None,
            token: None,
            urls: Rc::new(UrlMap::default()),
        }
    }
}

impl AppState {
    /// Sesión completa, si username y token ya fueron cargados
    pub fn session(&self) -> Option<Session> {
        Some(Session {
            username: self.username.as_deref()?.clone(),
            token: self.token.as_deref()?.clone(),
            urls: (*self.urls).clone(),
        })
    }

    /// Claves de permiso actuales (en el orden del mapa)
    pub fn permission_keys(&self) -> Vec<String> {
        self.permissions.keys().cloned().collect()
    }

    pub fn has_capability(&self, key: &str, id: i64) -> bool {
        has_capability(&self.permissions, key, id)
    }

    pub fn upload(&self, id: i64) -> Option<&UploadRecord> {
        self.uploads.iter().find(|upload| upload.id == id)
    }

    /// ¿Quedan uploads en el servidor sin cargar?
    pub fn has_more_uploads(&self) -> bool {
        (self.uploads.len() as u64) < self.uploads_total_count
    }
}
