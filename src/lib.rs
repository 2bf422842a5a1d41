// ============================================================================
// GEOPACKAGE MANAGER - NÚCLEO WASM (RUST PURO)
// ============================================================================
// Arquitectura:
// - Services: SOLO comunicación HTTP (fetch + XHR con progreso)
// - State: Store unidireccional (acciones + reducers puros)
// - ViewModels: cola de subida + operaciones del panel
// - Models: Estructuras compartidas con backend
// La página anfitriona monta el núcleo y renderiza desde los snapshots.
// ============================================================================

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod viewmodels;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::FileList;

use crate::config::CONFIG;
use crate::error::ApiError;
use crate::models::{PermissionOp, TokenDescriptor, TokenInput, UrlMap};
use crate::services::{ApiClient, GeopackageApi};
use crate::state::{Action, Store, SubscriptionId};
use crate::viewmodels::{ManagerViewModel, UploadViewModel};

static LOGGER: Once = Once::new();

/// Props que la página pasa al montar el widget
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MountProps {
    username: String,
    token: TokenInput,
    urls: UrlMap,
    #[serde(default)]
    upload_settle_delay_ms: Option<u32>,
    #[serde(default)]
    page_limit: Option<u32>,
}

fn validate_mount_props(props: MountProps) -> Result<MountProps, ApiError> {
    if props.urls.uploads_url.is_empty() || props.urls.permissions_url.is_empty() {
        return Err(ApiError::Configuration(
            "uploadsURL and permissionsURL are required".to_string(),
        ));
    }
    Ok(props)
}

/// Objetos JS planos (no `Map`) para que la página los lea con notación de punto
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// Cada elemento debe ser un string; `what` nombra la lista en el error
fn string_items<I>(items: I, what: &str) -> Result<Vec<String>, ApiError>
where
    I: IntoIterator<Item = Option<String>>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            item.ok_or_else(|| ApiError::Validation(format!("{}[{}] is not a string", what, index)))
        })
        .collect()
}

fn js_strings(array: &js_sys::Array, what: &str) -> Result<Vec<String>, ApiError> {
    string_items(array.iter().map(|value| value.as_string()), what)
}

/// Handle del núcleo montado en un elemento de la página
#[wasm_bindgen]
pub struct GeopackageManager {
    store: Store,
    manager: ManagerViewModel,
    uploads: UploadViewModel,
    subscriptions: RefCell<BTreeMap<u32, (SubscriptionId, u64)>>,
    next_subscription: Cell<u32>,
}

#[wasm_bindgen]
impl GeopackageManager {
    /// Monta el núcleo para `element_id` con la sesión de `props` y carga datos
    pub fn show(element_id: &str, props: JsValue) -> Result<GeopackageManager, JsValue> {
        let props = serde_wasm_bindgen::from_value::<MountProps>(props)
            .map_err(|e| ApiError::Configuration(format!("Invalid props: {}", e)))?;
        let props = validate_mount_props(props)?;
        let config = CONFIG.with_overrides(props.upload_settle_delay_ms, props.page_limit);

        LOGGER.call_once(|| {
            console_error_panic_hook::set_once();
            wasm_logger::init(wasm_logger::Config::new(config.log_level()));
        });
        log::info!("🚀 GeoPackage Manager ({})", config.environment);
        if !config.is_production() {
            log::debug!("⚙️ {:?}", config);
        }

        let element = web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| doc.get_element_by_id(element_id))
            .ok_or_else(|| ApiError::Configuration(format!("Element #{} not found", element_id)))?;
        element.set_attribute("data-gpkg-manager", "mounted")?;

        let store = Store::default();
        store.dispatch(Action::SetUsername(props.username));
        store.dispatch(Action::SetToken(TokenDescriptor::from(props.token)));
        store.dispatch(Action::SetUrls(props.urls));

        let session = store
            .state()
            .session()
            .ok_or_else(|| ApiError::Configuration("Session not initialized".to_string()))?;
        if session.token.authorization(&session.username).is_none() {
            log::warn!("⚠️ Token no reconocido: peticiones anónimas");
        }

        let client = ApiClient::new(session.username.clone(), session.token.clone());
        let api = GeopackageApi::new(client.clone(), session.urls.clone());
        let manager = ManagerViewModel::new(store.clone(), api, config.uploads_page_limit);
        let uploads = UploadViewModel::new(
            store.clone(),
            client,
            session.urls.uploads_url.clone(),
            config.upload_settle_delay_ms,
        );

        manager.hydrate();

        Ok(GeopackageManager {
            store,
            manager,
            uploads,
            subscriptions: RefCell::new(BTreeMap::new()),
            next_subscription: Cell::new(0),
        })
    }

    /// Encola los archivos elegidos; devuelve cuántos se aceptaron
    #[wasm_bindgen(js_name = uploadFiles)]
    pub fn upload_files(&self, files: FileList) -> usize {
        self.uploads.enqueue_files(&files)
    }

    /// Filas de la cola de subida
    pub fn uploads(&self) -> Result<JsValue, JsValue> {
        to_js(&self.uploads.snapshot())
    }

    /// Snapshot del store
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.state())
    }

    /// `callback()` tras cada cambio del store o de la cola. Devuelve el id
    /// que acepta `unsubscribe`
    pub fn subscribe(&self, callback: js_sys::Function) -> u32 {
        let on_store = callback.clone();
        let store_id = self.store.subscribe(move |_| {
            if let Err(e) = on_store.call0(&JsValue::NULL) {
                log::error!("❌ Error en suscriptor: {:?}", e);
            }
        });
        let queue_id = self.uploads.on_queue_change(move || {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log::error!("❌ Error en suscriptor: {:?}", e);
            }
        });

        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        self.subscriptions.borrow_mut().insert(id, (store_id, queue_id));
        id
    }

    /// false si `id` no estaba suscrito
    pub fn unsubscribe(&self, id: u32) -> bool {
        match self.subscriptions.borrow_mut().remove(&id) {
            Some((store_id, queue_id)) => {
                self.store.unsubscribe(store_id);
                self.uploads.remove_queue_listener(queue_id);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = hasCapability)]
    pub fn has_capability(&self, key: &str, id: i32) -> bool {
        self.store.state().has_capability(key, i64::from(id))
    }

    /// Falla si `op` no es "add" ni "delete" o si alguna clave no es string
    #[wasm_bindgen(js_name = updatePermissions)]
    pub fn update_permissions(&self, keys: js_sys::Array, id: i32, op: &str) -> Result<(), JsValue> {
        let op: PermissionOp = op.parse()?;
        let keys = js_strings(&keys, "keys")?;
        self.store.dispatch(Action::update_permissions(keys, i64::from(id), op));
        Ok(())
    }

    #[wasm_bindgen(js_name = deleteUpload)]
    pub fn delete_upload(&self, id: i32) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            manager.delete_upload(i64::from(id)).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = loadMore)]
    pub fn load_more(&self) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let count = manager.load_more_uploads().await?;
            Ok(JsValue::from_f64(count as f64))
        })
    }

    #[wasm_bindgen(js_name = publishLayer)]
    pub fn publish_layer(&self, upload_id: i32, layer_name: String, publish_name: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let layer_url = manager
                .publish_layer(i64::from(upload_id), &layer_name, &publish_name)
                .await?;
            Ok(JsValue::from_str(&layer_url))
        })
    }

    #[wasm_bindgen(js_name = searchLayers)]
    pub fn search_layers(&self, title: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let layers = manager.search_layers(&title).await?;
            to_js(&layers)
        })
    }

    #[wasm_bindgen(js_name = publishToEsri)]
    pub fn publish_to_esri(&self, layer_url: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let task_id = manager.publish_to_esri(&layer_url).await?;
            Ok(JsValue::from_str(&task_id))
        })
    }

    #[wasm_bindgen(js_name = taskState)]
    pub fn task_state(&self, task_id: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let state = manager.task_state(&task_id).await?;
            to_js(&state)
        })
    }

    #[wasm_bindgen(js_name = replaceLayer)]
    pub fn replace_layer(&self, upload_id: i32, layer_name: String, alternate: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let layer_url = manager
                .replace_layer(i64::from(upload_id), &layer_name, &alternate)
                .await?;
            Ok(JsValue::from_str(&layer_url))
        })
    }

    #[wasm_bindgen(js_name = compatibleLayers)]
    pub fn compatible_layers(&self, upload_id: i32, layer_name: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let layers = manager.compatible_layers(i64::from(upload_id), &layer_name).await?;
            to_js(&layers)
        })
    }

    #[wasm_bindgen(js_name = compareSchema)]
    pub fn compare_schema(&self, upload_id: i32, layer_name: String, alternate: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let check = manager
                .compare_schema(i64::from(upload_id), &layer_name, &alternate)
                .await?;
            to_js(&check)
        })
    }

    #[wasm_bindgen(js_name = reloadLayer)]
    pub fn reload_layer(&self, upload_id: i32, layer_name: String, alternate: String) -> js_sys::Promise {
        let manager = self.manager.clone();
        future_to_promise(async move {
            let status = manager
                .reload_layer(i64::from(upload_id), &layer_name, &alternate)
                .await?;
            Ok(JsValue::from_str(&status))
        })
    }

    /// `typenames`: array de strings `workspace:capa`
    #[wasm_bindgen(js_name = downloadLayers)]
    pub fn download_layers(&self, typenames: js_sys::Array) -> js_sys::Promise {
        let manager = self.manager.clone();
        let typenames = js_strings(&typenames, "typenames");
        future_to_promise(async move {
            let download_url = manager.download_layers(&typenames?).await?;
            Ok(JsValue::from_str(&download_url))
        })
    }
}
