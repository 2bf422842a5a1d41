// ============================================================================
// MANAGER VIEWMODEL - Listado, borrado y publicación de paquetes
// ============================================================================
// Lógica de negocio del panel - los resultados REST entran al store por
// dispatch, nunca mutando el estado directamente
// ============================================================================

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;

use crate::error::ApiError;
use crate::models::{CompatibleLayer, LayerSummary, PermissionOp, RemoteLayer, SchemaCheck, TaskState};
use crate::services::GeopackageApi;
use crate::state::{Action, Store};
use crate::utils::convert_to_slug;

/// Marca de "página en vuelo"; se libera al soltarla
struct PageRequest(Rc<Cell<bool>>);

impl PageRequest {
    fn acquire(flag: &Rc<Cell<bool>>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag.clone()))
    }
}

impl Drop for PageRequest {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Clone)]
pub struct ManagerViewModel {
    store: Store,
    api: GeopackageApi,
    page_limit: u32,
    page_in_flight: Rc<Cell<bool>>,
}

impl ManagerViewModel {
    pub fn new(store: Store, api: GeopackageApi, page_limit: u32) -> Self {
        Self {
            store,
            api,
            page_limit,
            page_in_flight: Rc::new(Cell::new(false)),
        }
    }

    /// Carga inicial: primera página de uploads + permisos, en paralelo
    pub fn hydrate(&self) {
        let vm = self.clone();
        spawn_local(async move {
            if let Err(e) = vm.load_uploads().await {
                log::error!("❌ Error cargando uploads: {}", e);
            }
        });
        let vm = self.clone();
        spawn_local(async move {
            if let Err(e) = vm.load_permissions().await {
                log::error!("❌ Error cargando permisos: {}", e);
            }
        });
    }

    /// Primera página → SetUploads
    pub async fn load_uploads(&self) -> Result<(), ApiError> {
        self.store.dispatch(Action::SetUploadsLoading(true));
        let result = self.api.get_uploads(0, self.page_limit).await;
        if let Ok(page) = &result {
            log::info!("✅ {} uploads de {}", page.objects.len(), page.meta.total_count);
            self.store.dispatch(Action::SetUploads(page.objects.clone()));
            self.store.dispatch(Action::SetTotalCount(page.meta.total_count));
        }
        self.store.dispatch(Action::SetUploadsLoading(false));
        result.map(|_| ())
    }

    /// Siguiente página → AddUploads. Devuelve cuántos llegaron; 0 si ya hay
    /// una página en camino
    pub async fn load_more_uploads(&self) -> Result<usize, ApiError> {
        let Some(_request) = PageRequest::acquire(&self.page_in_flight) else {
            log::info!("⏳ Ya hay una página de uploads en camino");
            return Ok(0);
        };
        let state = self.store.state();
        if !state.has_more_uploads() {
            log::info!("📋 No quedan más uploads por cargar");
            return Ok(0);
        }
        let page = self.api.get_uploads(state.uploads.len(), self.page_limit).await?;
        let count = page.objects.len();
        self.store.dispatch(Action::AddUploads(page.objects));
        self.store.dispatch(Action::SetTotalCount(page.meta.total_count));
        Ok(count)
    }

    /// Permisos → SetPermissions
    pub async fn load_permissions(&self) -> Result<(), ApiError> {
        self.store.dispatch(Action::SetPermissionsLoading(true));
        let result = self.api.get_permissions().await;
        if let Ok(permissions) = &result {
            log::info!("🔐 {} claves de permiso", permissions.len());
            self.store.dispatch(Action::SetPermissions(permissions.clone()));
        }
        self.store.dispatch(Action::SetPermissionsLoading(false));
        result.map(|_| ())
    }

    /// Borra un upload en el servidor y lo retira del store y de los permisos
    pub async fn delete_upload(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete_upload(id).await?;
        self.forget_uploads(&[id].into_iter().collect());
        Ok(())
    }

    /// Borrado en lote: secuencial, retira solo los que el servidor aceptó
    pub async fn delete_uploads(&self, ids: &[i64]) -> Result<BTreeSet<i64>, ApiError> {
        let mut deleted = BTreeSet::new();
        let mut last_error = None;
        for id in ids {
            match self.api.delete_upload(*id).await {
                Ok(_) => {
                    deleted.insert(*id);
                }
                Err(e) => {
                    log::error!("❌ No se pudo borrar el upload {}: {}", id, e);
                    last_error = Some(e);
                }
            }
        }
        if !deleted.is_empty() {
            self.forget_uploads(&deleted);
        }
        match (deleted.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(deleted),
        }
    }

    fn forget_uploads(&self, ids: &BTreeSet<i64>) {
        let keys = self.store.state().permission_keys();
        match ids.iter().next() {
            Some(id) if ids.len() == 1 => self.store.dispatch(Action::DeleteUpload(*id)),
            _ => self.store.dispatch(Action::DeleteUploads(ids.clone())),
        }
        for id in ids {
            self.store
                .dispatch(Action::update_permissions(keys.clone(), *id, PermissionOp::Delete));
        }
    }

    fn package_layer(&self, upload_id: i64, layer_name: &str) -> Result<LayerSummary, ApiError> {
        let state = self.store.state();
        let upload = state
            .upload(upload_id)
            .ok_or_else(|| ApiError::Validation(format!("Unknown upload {}", upload_id)))?;
        upload.layer(layer_name).cloned().ok_or_else(|| {
            ApiError::Validation(format!("Upload {} has no layer {}", upload_id, layer_name))
        })
    }

    fn publish_url(layer: &LayerSummary) -> Result<String, ApiError> {
        layer.urls.publish_url.clone().ok_or_else(|| {
            ApiError::Configuration(format!("Layer {} has no publish url", layer.name))
        })
    }

    /// Publica la capa `layer_name` del upload `upload_id`; devuelve su URL
    pub async fn publish_layer(
        &self,
        upload_id: i64,
        layer_name: &str,
        publish_name: &str,
    ) -> Result<String, ApiError> {
        let layer = self.package_layer(upload_id, layer_name)?;
        let publish_url = Self::publish_url(&layer)?;
        let name = resolve_publish_name(publish_name, layer.expected_name.as_deref(), &layer.name);
        self.api.publish_layer(&publish_url, &name).await
    }

    /// Publica la capa sobre la capa existente `alternate`; devuelve su URL
    pub async fn replace_layer(&self, upload_id: i64, layer_name: &str, alternate: &str) -> Result<String, ApiError> {
        let layer = self.package_layer(upload_id, layer_name)?;
        let publish_url = Self::publish_url(&layer)?;
        self.api.replace_layer(&publish_url, require_target(alternate)?).await
    }

    pub async fn compatible_layers(&self, upload_id: i64, layer_name: &str) -> Result<Vec<CompatibleLayer>, ApiError> {
        let layer = self.package_layer(upload_id, layer_name)?;
        self.api
            .compatible_layers(upload_id, &layer.name, layer.urls.compatible_layers_url.as_deref())
            .await
    }

    pub async fn compare_schema(&self, upload_id: i64, layer_name: &str, alternate: &str) -> Result<SchemaCheck, ApiError> {
        let layer = self.package_layer(upload_id, layer_name)?;
        self.api.compare_schema(upload_id, &layer.name, require_target(alternate)?).await
    }

    /// Sobrescribe los datos de `alternate` con la capa del paquete
    pub async fn reload_layer(&self, upload_id: i64, layer_name: &str, alternate: &str) -> Result<String, ApiError> {
        let layer = self.package_layer(upload_id, layer_name)?;
        self.api.reload_layer(upload_id, &layer.name, require_target(alternate)?).await
    }

    /// Descarga de capas publicadas (typenames `workspace:name`)
    pub async fn download_layers(&self, typenames: &[String]) -> Result<String, ApiError> {
        if typenames.iter().all(|name| name.trim().is_empty()) {
            return Err(ApiError::Validation("No layers provided".to_string()));
        }
        let typenames: Vec<String> = typenames
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self.api.download_layers(&typenames).await
    }

    pub async fn search_layers(&self, title: &str) -> Result<Vec<RemoteLayer>, ApiError> {
        self.api.search_layers(title).await
    }

    pub async fn publish_to_esri(&self, layer_url: &str) -> Result<String, ApiError> {
        if layer_url.trim().is_empty() {
            return Err(ApiError::Validation("layer_url not provided".to_string()));
        }
        self.api.publish_to_esri(layer_url.trim()).await
    }

    pub async fn task_state(&self, task_id: &str) -> Result<TaskState, ApiError> {
        self.api.task_state(task_id).await
    }
}

fn require_target(alternate: &str) -> Result<&str, ApiError> {
    let alternate = alternate.trim();
    if alternate.is_empty() {
        return Err(ApiError::Validation("Target layer not provided".to_string()));
    }
    Ok(alternate)
}

/// Nombre de publicación: el del usuario, o el sugerido, o el de la capa
pub fn resolve_publish_name(requested: &str, expected: Option<&str>, layer_name: &str) -> String {
    let requested = convert_to_slug(requested.trim());
    if !requested.is_empty() {
        return requested;
    }
    match expected.map(convert_to_slug).filter(|name| !name.is_empty()) {
        Some(name) => name,
        None => convert_to_slug(layer_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, PermissionMap, TokenDescriptor, UploadRecord, UploadUser, UrlMap};
    use crate::services::ApiClient;
    use crate::state::AppState;
    use crate::utils::constants::{DELETE_PACKAGE, DOWNLOAD_PACKAGE, VIEW_PACKAGE};
    use futures::executor::block_on;
    use std::cell::RefCell;

    fn record(id: i64) -> UploadRecord {
        UploadRecord {
            id,
            package: format!("geopackages/{}.gpkg", id),
            uploaded_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            user: UploadUser { username: "alice".to_string() },
            download_url: format!("/uploaded/{}.gpkg", id),
            layers: Vec::new(),
            resource_uri: None,
        }
    }

    fn manager(ids: &[i64]) -> ManagerViewModel {
        let store = Store::default();
        store.dispatch(Action::SetUploads(ids.iter().copied().map(record).collect()));
        let mut map = PermissionMap::new();
        for key in [VIEW_PACKAGE, DOWNLOAD_PACKAGE, DELETE_PACKAGE] {
            map.insert(key.to_string(), Permission::with_ids(ids.iter().copied()));
        }
        store.dispatch(Action::SetPermissions(map));
        let api = GeopackageApi::new(
            ApiClient::new("alice", TokenDescriptor::Unknown),
            UrlMap {
                uploads_url: "/api/data_manager/".to_string(),
                permissions_url: "/api/data_manager/permissions/".to_string(),
                ..UrlMap::default()
            },
        );
        ManagerViewModel::new(store, api, 20)
    }

    fn record_states(vm: &ManagerViewModel) -> Rc<RefCell<Vec<AppState>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        vm.store.subscribe(move |state| sink.borrow_mut().push(state.clone()));
        seen
    }

    fn upload_ids(state: &AppState) -> Vec<i64> {
        state.uploads.iter().map(|upload| upload.id).collect()
    }

    #[test]
    fn forgetting_one_upload_drops_it_then_revokes_every_key() {
        let vm = manager(&[1, 2, 3]);
        let seen = record_states(&vm);

        vm.forget_uploads(&[2].into_iter().collect());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        // DeleteUpload: permisos intactos todavía
        assert_eq!(upload_ids(&seen[0]), vec![1, 3]);
        assert!(seen[0].has_capability(DELETE_PACKAGE, 2));
        // UpdatePermissions(delete) sobre todas las claves
        for key in [VIEW_PACKAGE, DOWNLOAD_PACKAGE, DELETE_PACKAGE] {
            assert!(!seen[1].has_capability(key, 2));
            assert!(seen[1].has_capability(key, 1));
        }
    }

    #[test]
    fn forgetting_several_uploads_removes_them_in_one_step() {
        let vm = manager(&[1, 2, 3, 4]);
        let seen = record_states(&vm);

        vm.forget_uploads(&[1, 3, 4].into_iter().collect());

        let seen = seen.borrow();
        // Un DeleteUploads + un UpdatePermissions por id
        assert_eq!(seen.len(), 4);
        assert_eq!(upload_ids(&seen[0]), vec![2]);
        let state = vm.store.state();
        for id in [1, 3, 4] {
            assert!(!state.has_capability(DELETE_PACKAGE, id));
            assert!(!state.has_capability(VIEW_PACKAGE, id));
        }
        assert!(state.has_capability(DELETE_PACKAGE, 2));
    }

    #[test]
    fn page_request_is_exclusive_until_dropped() {
        let flag = Rc::new(Cell::new(false));
        let first = PageRequest::acquire(&flag);
        assert!(first.is_some());
        assert!(PageRequest::acquire(&flag).is_none());
        drop(first);
        assert!(!flag.get());
        assert!(PageRequest::acquire(&flag).is_some());
    }

    #[test]
    fn load_more_is_a_no_op_while_a_page_is_in_flight() {
        let vm = manager(&[1, 2]);
        vm.store.dispatch(Action::SetTotalCount(40));
        let seen = record_states(&vm);

        let _running = PageRequest::acquire(&vm.page_in_flight);
        assert_eq!(block_on(vm.load_more_uploads()), Ok(0));

        assert!(seen.borrow().is_empty());
        assert_eq!(upload_ids(&vm.store.state()), vec![1, 2]);
    }

    #[test]
    fn load_more_stops_when_everything_is_loaded() {
        let vm = manager(&[1, 2]);
        vm.store.dispatch(Action::SetTotalCount(2));
        assert_eq!(block_on(vm.load_more_uploads()), Ok(0));
        assert!(!vm.page_in_flight.get());
    }

    #[test]
    fn layer_operations_validate_upload_layer_and_target() {
        let vm = manager(&[1]);
        assert!(matches!(vm.package_layer(7, "roads"), Err(ApiError::Validation(_))));
        assert!(matches!(vm.package_layer(1, "roads"), Err(ApiError::Validation(_))));
        assert!(matches!(
            block_on(vm.replace_layer(7, "roads", "geonode:roads")),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(require_target("  "), Err(ApiError::Validation(_))));
        assert_eq!(require_target(" geonode:roads "), Ok("geonode:roads"));
        assert!(matches!(
            block_on(vm.download_layers(&[" ".to_string()])),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn requested_name_wins_and_is_slugified() {
        assert_eq!(resolve_publish_name("Main Roads", Some("roads_1"), "roads"), "main_roads");
    }

    #[test]
    fn falls_back_to_expected_then_layer_name() {
        assert_eq!(resolve_publish_name("  ", Some("roads_1"), "roads"), "roads_1");
        assert_eq!(resolve_publish_name("", None, "Rivers Main"), "rivers_main");
        assert_eq!(resolve_publish_name("!!", Some("??"), "lakes"), "lakes");
    }
}
