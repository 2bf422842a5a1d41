// ============================================================================
// UPLOAD VIEWMODEL - Cola de subida secuencial con progreso
// ============================================================================
// Sube un archivo cada vez. El progreso vive aquí (no en el store); el store
// solo recibe AddUpload + UpdatePermissions cuando el servidor crea el upload.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use wasm_bindgen_futures::spawn_local;
use web_sys::{File, FileList, FormData};

use crate::error::ApiError;
use crate::models::{PermissionOp, UploadRecord};
use crate::services::{ApiClient, XhrResponse};
use crate::state::{Action, Store};
use crate::utils::{is_geopackage, HTTP_CREATED, PACKAGE_FIELD};

/// Estado de un archivo de la cola
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadProgress {
    Pending,
    InProgress { percent: f64 },
    Done { id: i64 },
    Failed { reason: String },
}

impl UploadProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadProgress::Done { .. } | UploadProgress::Failed { .. })
    }

    /// Texto secundario de la fila ("42% Complete" o el error)
    pub fn label(&self) -> String {
        match self {
            UploadProgress::Pending => "Waiting".to_string(),
            UploadProgress::InProgress { percent } => format!("{:.0}% Complete", percent),
            UploadProgress::Done { .. } => "100% Complete".to_string(),
            UploadProgress::Failed { reason } => reason.clone(),
        }
    }
}

pub fn percent_complete(loaded: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (loaded / total * 100.0).clamp(0.0, 100.0)
}

/// Qué hacer con el evento "load" de una transferencia
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Created,
    Failed(String),
}

pub fn classify_load(response: &XhrResponse) -> LoadOutcome {
    if response.status == HTTP_CREATED {
        LoadOutcome::Created
    } else if response.is_client_or_server_error() {
        let reason = if response.status_text.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            response.status_text.clone()
        };
        LoadOutcome::Failed(reason)
    } else {
        LoadOutcome::Failed(format!("Unexpected response (HTTP {})", response.status))
    }
}

/// Fusiona en el store el upload que el servidor acaba de crear.
///
/// Despacha exactamente AddUpload y UpdatePermissions(todas las claves, id, add)
/// y después llama a `on_removed`. Si el cuerpo no es un UploadRecord no
/// despacha nada.
pub fn commit_created_upload<R>(store: &Store, body: &str, on_removed: R) -> Result<UploadRecord, ApiError>
where
    R: FnOnce(&UploadRecord),
{
    let record: UploadRecord =
        serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;
    let keys = store.state().permission_keys();

    store.dispatch(Action::AddUpload(record.clone()));
    store.dispatch(Action::update_permissions(keys, record.id, PermissionOp::Add));
    on_removed(&record);

    Ok(record)
}

/// Fila visible de la cola
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueuedUploadView {
    pub key: u64,
    pub name: String,
    pub progress: UploadProgress,
    pub label: String,
}

struct QueuedUpload<F> {
    key: u64,
    name: String,
    payload: F,
    progress: UploadProgress,
}

/// Cola local de archivos; a lo sumo uno en curso
pub struct UploadQueue<F> {
    next_key: u64,
    items: Vec<QueuedUpload<F>>,
}

impl<F: Clone> UploadQueue<F> {
    pub fn new() -> Self {
        Self {
            next_key: 0,
            items: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, name: impl Into<String>, payload: F) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.items.push(QueuedUpload {
            key,
            name: name.into(),
            payload,
            progress: UploadProgress::Pending,
        });
        key
    }

    pub fn is_busy(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item.progress, UploadProgress::InProgress { .. }))
    }

    /// Marca el siguiente pendiente como en curso, salvo que ya haya uno
    pub fn start_next(&mut self) -> Option<(u64, F)> {
        if self.is_busy() {
            return None;
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.progress == UploadProgress::Pending)?;
        item.progress = UploadProgress::InProgress { percent: 0.0 };
        Some((item.key, item.payload.clone()))
    }

    pub fn set_progress(&mut self, key: u64, progress: UploadProgress) -> bool {
        match self.items.iter_mut().find(|item| item.key == key) {
            Some(item) => {
                item.progress = progress;
                true
            }
            None => false,
        }
    }

    pub fn progress(&self, key: u64) -> Option<&UploadProgress> {
        self.items.iter().find(|item| item.key == key).map(|item| &item.progress)
    }

    pub fn remove(&mut self, key: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.key != key);
        self.items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<QueuedUploadView> {
        self.items
            .iter()
            .map(|item| QueuedUploadView {
                key: item.key,
                name: item.name.clone(),
                progress: item.progress.clone(),
                label: item.progress.label(),
            })
            .collect()
    }
}

impl<F: Clone> Default for UploadQueue<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// ViewModel de subida - conduce la cola contra `{uploadsURL}`
#[derive(Clone)]
pub struct UploadViewModel {
    store: Store,
    client: ApiClient,
    upload_url: String,
    settle_delay_ms: u32,
    queue: Rc<RefCell<UploadQueue<File>>>,
    listeners: Rc<RefCell<Vec<(u64, Rc<dyn Fn()>)>>>,
    next_listener: Rc<Cell<u64>>,
}

impl UploadViewModel {
    pub fn new(store: Store, client: ApiClient, upload_url: impl Into<String>, settle_delay_ms: u32) -> Self {
        Self {
            store,
            client,
            upload_url: upload_url.into(),
            settle_delay_ms,
            queue: Rc::new(RefCell::new(UploadQueue::new())),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Rc::new(Cell::new(0)),
        }
    }

    /// Callback cuando cambia la cola (progreso, errores, altas, bajas)
    pub fn on_queue_change<F: Fn() + 'static>(&self, callback: F) -> u64 {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn remove_queue_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    pub fn snapshot(&self) -> Vec<QueuedUploadView> {
        self.queue.borrow().snapshot()
    }

    /// Encola los `.gpkg` de la selección y arranca la cola
    pub fn enqueue_files(&self, files: &FileList) -> usize {
        let mut queued = 0;
        for index in 0..files.length() {
            let Some(file) = files.get(index) else { continue };
            let name = file.name();
            if !is_geopackage(&name) {
                log::warn!("⚠️ {} no es un GeoPackage, se omite", name);
                continue;
            }
            self.queue.borrow_mut().enqueue(name, file);
            queued += 1;
        }
        log::info!("📤 {} archivo(s) en cola", queued);
        self.notify();
        self.advance();
        queued
    }

    fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn set_progress(&self, key: u64, progress: UploadProgress) {
        self.queue.borrow_mut().set_progress(key, progress);
        self.notify();
    }

    /// Arranca el siguiente archivo si no hay otro en curso
    fn advance(&self) {
        let next = self.queue.borrow_mut().start_next();
        let Some((key, file)) = next else { return };
        self.notify();
        self.start_upload(key, file);
    }

    fn start_upload(&self, key: u64, file: File) {
        let form = match FormData::new() {
            Ok(form) => form,
            Err(e) => return self.fail(key, format!("{}", ApiError::from_js("FormData", &e))),
        };
        if let Err(e) = form.append_with_blob(PACKAGE_FIELD, &file) {
            return self.fail(key, format!("{}", ApiError::from_js("FormData.append", &e)));
        }

        log::info!("📤 Subiendo {} ({} bytes)", file.name(), file.size());

        let on_progress = {
            let vm = self.clone();
            move |loaded: f64, total: f64| {
                let percent = percent_complete(loaded, total);
                vm.set_progress(key, UploadProgress::InProgress { percent });
            }
        };
        let on_load = {
            let vm = self.clone();
            move |response: XhrResponse| vm.handle_load(key, response)
        };
        let on_error = {
            let vm = self.clone();
            move |response: XhrResponse| {
                let error = ApiError::Transport(response.status_text);
                vm.fail(key, error.to_string());
            }
        };

        self.client.upload_with_progress(
            &self.upload_url,
            &form,
            |text: String| log::debug!("📨 Respuesta de upload ({} bytes)", text.len()),
            on_progress,
            on_load,
            on_error,
        );
    }

    fn handle_load(&self, key: u64, response: XhrResponse) {
        match classify_load(&response) {
            LoadOutcome::Created => {
                let vm = self.clone();
                spawn_local(async move {
                    // Deja que el servidor termine su post-proceso
                    TimeoutFuture::new(vm.settle_delay_ms).await;
                    vm.commit(key, &response.body);
                });
            }
            LoadOutcome::Failed(reason) => self.fail(key, reason),
        }
    }

    fn commit(&self, key: u64, body: &str) {
        let queue = self.queue.clone();
        let result = commit_created_upload(&self.store, body, |record| {
            let mut queue = queue.borrow_mut();
            queue.set_progress(key, UploadProgress::Done { id: record.id });
            queue.remove(key);
        });
        match result {
            Ok(record) => {
                log::info!("✅ Upload {} creado ({} capas)", record.id, record.layers.len());
                self.notify();
                self.advance();
            }
            Err(e) => self.fail(key, e.to_string()),
        }
    }

    fn fail(&self, key: u64, reason: String) {
        log::error!("❌ Upload fallido: {}", reason);
        self.set_progress(key, UploadProgress::Failed { reason });
        self.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, PermissionMap};
    use crate::models::TokenDescriptor;
    use crate::utils::constants::{DELETE_PACKAGE, DOWNLOAD_PACKAGE};

    fn response(status: u16, status_text: &str, body: &str) -> XhrResponse {
        XhrResponse {
            status,
            status_text: status_text.to_string(),
            body: body.to_string(),
        }
    }

    const CREATED_BODY: &str = r#"{
        "id": 9,
        "package": "geopackages/roads.gpkg",
        "uploaded_at": "2024-03-01T10:15:30",
        "user": {"username": "alice"},
        "download_url": "/uploaded/geopackages/roads.gpkg",
        "layers": []
    }"#;

    fn store_with_permissions() -> Store {
        let store = Store::default();
        let mut map = PermissionMap::new();
        map.insert(DELETE_PACKAGE.to_string(), Permission::with_ids([1]));
        map.insert(DOWNLOAD_PACKAGE.to_string(), Permission::with_ids([1]));
        store.dispatch(Action::SetPermissions(map));
        store
    }

    #[test]
    fn created_status_is_success_and_errors_keep_status_text() {
        assert_eq!(classify_load(&response(201, "Created", "{}")), LoadOutcome::Created);
        assert_eq!(
            classify_load(&response(413, "Request Entity Too Large", "")),
            LoadOutcome::Failed("Request Entity Too Large".to_string())
        );
        assert_eq!(
            classify_load(&response(500, "", "")),
            LoadOutcome::Failed("HTTP 500".to_string())
        );
        assert_eq!(
            classify_load(&response(200, "OK", "{}")),
            LoadOutcome::Failed("Unexpected response (HTTP 200)".to_string())
        );
    }

    #[test]
    fn created_upload_dispatches_exactly_two_actions_and_removes_once() {
        let store = store_with_permissions();
        let dispatches = Rc::new(RefCell::new(Vec::new()));
        {
            let dispatches = dispatches.clone();
            store.subscribe(move |state| {
                dispatches.borrow_mut().push((
                    state.uploads.iter().map(|u| u.id).collect::<Vec<_>>(),
                    state.has_capability(DELETE_PACKAGE, 9),
                ))
            });
        }
        let removed = Cell::new(0);

        let record = commit_created_upload(&store, CREATED_BODY, |record| {
            assert_eq!(record.id, 9);
            removed.set(removed.get() + 1);
        })
        .unwrap();

        assert_eq!(record.id, 9);
        assert_eq!(removed.get(), 1);
        // 1º AddUpload (aún sin permiso), 2º UpdatePermissions
        assert_eq!(*dispatches.borrow(), vec![(vec![9], false), (vec![9], true)]);

        let state = store.state();
        assert!(state.has_capability(DELETE_PACKAGE, 9));
        assert!(state.has_capability(DOWNLOAD_PACKAGE, 9));
        assert!(state.has_capability(DELETE_PACKAGE, 1));
    }

    #[test]
    fn created_body_with_utc_timestamp_is_committed() {
        for stamp in ["2024-03-01T10:15:30Z", "2024-03-01T10:15:30+00:00"] {
            let store = store_with_permissions();
            let body = CREATED_BODY.replace("2024-03-01T10:15:30", stamp);
            let removed = Cell::new(0);

            let record = commit_created_upload(&store, &body, |_| removed.set(removed.get() + 1))
                .unwrap();

            assert_eq!(record.uploaded_at.to_string(), "2024-03-01 10:15:30");
            assert_eq!(removed.get(), 1);
            assert_eq!(store.state().uploads.len(), 1);
            assert!(store.state().has_capability(DELETE_PACKAGE, 9));
        }
    }

    #[test]
    fn unparsable_created_body_dispatches_nothing() {
        let store = store_with_permissions();
        let dispatches = Rc::new(Cell::new(0));
        {
            let dispatches = dispatches.clone();
            store.subscribe(move |_| dispatches.set(dispatches.get() + 1));
        }
        let removed = Cell::new(false);

        let result = commit_created_upload(&store, "<html>502</html>", |_| removed.set(true));

        assert!(matches!(result, Err(ApiError::Parse(_))));
        assert_eq!(dispatches.get(), 0);
        assert!(!removed.get());
        assert!(store.state().uploads.is_empty());
    }

    #[test]
    fn queue_runs_one_upload_at_a_time() {
        let mut queue: UploadQueue<&str> = UploadQueue::new();
        let first = queue.enqueue("a.gpkg", "A");
        let second = queue.enqueue("b.gpkg", "B");

        assert_eq!(queue.start_next(), Some((first, "A")));
        assert!(queue.is_busy());
        assert_eq!(queue.start_next(), None);

        queue.set_progress(first, UploadProgress::Failed { reason: "Bad Request".to_string() });
        assert!(!queue.is_busy());
        assert_eq!(queue.start_next(), Some((second, "B")));

        queue.set_progress(second, UploadProgress::Done { id: 3 });
        assert!(queue.remove(second));
        assert_eq!(queue.start_next(), None);

        // El fallido sigue visible hasta que el usuario lo reintente
        let rows = queue.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "a.gpkg");
        assert_eq!(rows[0].label, "Bad Request");
    }

    #[test]
    fn progress_is_a_clamped_percentage() {
        assert_eq!(percent_complete(50.0, 200.0), 25.0);
        assert_eq!(percent_complete(300.0, 200.0), 100.0);
        assert_eq!(percent_complete(10.0, 0.0), 0.0);
        assert_eq!(UploadProgress::InProgress { percent: 41.6 }.label(), "42% Complete");
        assert!(UploadProgress::Done { id: 1 }.is_terminal());
        assert!(!UploadProgress::Pending.is_terminal());
    }

    #[test]
    fn removing_unknown_key_is_reported() {
        let mut queue: UploadQueue<()> = UploadQueue::default();
        assert!(queue.is_empty());
        let key = queue.enqueue("a.gpkg", ());
        assert!(!queue.remove(key + 1));
        assert!(!queue.set_progress(key + 1, UploadProgress::Pending));
        assert_eq!(queue.progress(key), Some(&UploadProgress::Pending));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn removed_queue_listeners_stop_firing() {
        let vm = UploadViewModel::new(
            Store::default(),
            ApiClient::new("alice", TokenDescriptor::Unknown),
            "/api/data_manager/",
            0,
        );
        let calls = Rc::new(Cell::new(0));
        let first = {
            let calls = calls.clone();
            vm.on_queue_change(move || calls.set(calls.get() + 1))
        };
        let second = {
            let calls = calls.clone();
            vm.on_queue_change(move || calls.set(calls.get() + 10))
        };
        assert_ne!(first, second);

        vm.notify();
        assert_eq!(calls.get(), 11);

        assert!(vm.remove_queue_listener(first));
        assert!(!vm.remove_queue_listener(first));
        vm.notify();
        assert_eq!(calls.get(), 21);
    }
}
