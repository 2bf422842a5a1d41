use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// El valor esperado, o el `error_message` del servidor si no vino
fn expect_field<T>(value: Option<T>, error_message: Option<String>, missing: &str) -> Result<T, ApiError> {
    match (value, error_message) {
        (Some(value), _) => Ok(value),
        (None, Some(message)) => Err(ApiError::Application(message)),
        (None, None) => Err(ApiError::Application(missing.to_string())),
    }
}

/// Respuesta de `GET {publish_url}?publish_name=`
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct PublishResponse {
    #[serde(default)]
    pub layer_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PublishResponse {
    pub fn into_layer_url(self) -> Result<String, ApiError> {
        expect_field(self.layer_url, self.error_message, "Publish returned no layer url")
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct EsriPublishRequest<'a> {
    pub layer_url: &'a str,
}

/// Respuesta del volcado ESRI: id de la tarea en segundo plano
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct EsriPublishResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl EsriPublishResponse {
    pub fn into_task_id(self) -> Result<String, ApiError> {
        expect_field(self.task_id, self.error_message, "ESRI publish returned no task id")
    }
}

/// Campo de un esquema de capa: `[nombre, tipo, extra]`
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct SchemaField {
    pub name: String,
    pub field_type: String,
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Diferencias entre una capa del paquete y una capa publicada
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct SchemaCheck {
    pub compatible: bool,
    #[serde(default)]
    pub new_fields: Vec<SchemaField>,
    #[serde(default)]
    pub deleted_fields: Vec<SchemaField>,
}

#[derive(Clone, PartialEq, Deserialize, Debug)]
pub(crate) struct SchemaCheckResponse {
    #[serde(default)]
    pub compatible: Option<bool>,
    #[serde(default)]
    pub new_fields: Vec<SchemaField>,
    #[serde(default)]
    pub deleted_fields: Vec<SchemaField>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SchemaCheckResponse {
    pub fn into_check(self) -> Result<SchemaCheck, ApiError> {
        let compatible = expect_field(self.compatible, self.error_message, "Schema comparison returned no result")?;
        Ok(SchemaCheck {
            compatible,
            new_fields: self.new_fields,
            deleted_fields: self.deleted_fields,
        })
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct CompatibleLayerUrls {
    #[serde(default)]
    pub reload_url: Option<String>,
}

/// Capa publicada cuyo esquema admite recargar desde el paquete
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct CompatibleLayer {
    pub name: String,
    #[serde(default)]
    pub compatible: bool,
    #[serde(default)]
    pub new_fields: Vec<SchemaField>,
    #[serde(default)]
    pub deleted_fields: Vec<SchemaField>,
    #[serde(default)]
    pub urls: CompatibleLayerUrls,
}

#[derive(Clone, PartialEq, Deserialize, Debug)]
pub(crate) struct CompatibleLayersResponse {
    #[serde(default)]
    pub layers: Option<Vec<CompatibleLayer>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CompatibleLayersResponse {
    pub fn into_layers(self) -> Result<Vec<CompatibleLayer>, ApiError> {
        expect_field(self.layers, self.error_message, "Compatible layers response has no layers")
    }
}

/// Respuesta de recarga: `{status}` o `{error_message}`
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub(crate) struct ReloadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ReloadResponse {
    pub fn into_status(self) -> Result<String, ApiError> {
        expect_field(self.status, self.error_message, "Reload returned no status")
    }
}

/// Respuesta de `GET {downloadURL}?layer_names=`
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub(crate) struct DownloadResponse {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DownloadResponse {
    pub fn into_download_url(self) -> Result<String, ApiError> {
        expect_field(self.download_url, self.error_message, "Download returned no url")
    }
}

/// Estado de una tarea en segundo plano (`PENDING`, `SUCCESS`, `FAILURE`...)
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct TaskState {
    pub state: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self.state.as_str(), "SUCCESS" | "FAILURE" | "REVOKED")
    }
}

/// Capa existente del catálogo, candidata a ser reemplazada
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct RemoteLayer {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alternate: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub(crate) struct RemoteLayerList {
    #[serde(default)]
    pub objects: Vec<RemoteLayer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_response_carries_either_url_or_error() {
        let ok: PublishResponse =
            serde_json::from_str(r#"{"layer_url":"/layers/geonode:roads_1"}"#).unwrap();
        assert_eq!(ok.layer_url.as_deref(), Some("/layers/geonode:roads_1"));
        assert!(ok.error_message.is_none());

        let err: PublishResponse =
            serde_json::from_str(r#"{"error_message":"Layer already exists"}"#).unwrap();
        assert!(err.layer_url.is_none());
        assert_eq!(err.error_message.as_deref(), Some("Layer already exists"));
    }

    #[test]
    fn error_message_becomes_application_error() {
        let err: PublishResponse =
            serde_json::from_str(r#"{"error_message":"Layer Publish Failed"}"#).unwrap();
        assert_eq!(
            err.into_layer_url(),
            Err(ApiError::Application("Layer Publish Failed".to_string()))
        );

        let empty: EsriPublishResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(empty.into_task_id(), Err(ApiError::Application(_))));

        let reload: ReloadResponse =
            serde_json::from_str(r#"{"status":"Layer reloaded succesfully"}"#).unwrap();
        assert_eq!(reload.into_status().unwrap(), "Layer reloaded succesfully");

        let reload: ReloadResponse =
            serde_json::from_str(r#"{"error_message":"Invalid schema"}"#).unwrap();
        assert_eq!(reload.into_status(), Err(ApiError::Application("Invalid schema".to_string())));
    }

    #[test]
    fn schema_check_reads_field_tuples() {
        let response: SchemaCheckResponse = serde_json::from_str(
            r#"{"compatible": false,
                "new_fields": [["width", "Real", 0]],
                "deleted_fields": [["lanes", "Integer"]]}"#,
        )
        .unwrap();
        let check = response.into_check().unwrap();
        assert!(!check.compatible);
        assert_eq!(check.new_fields[0].name, "width");
        assert_eq!(check.new_fields[0].field_type, "Real");
        assert_eq!(check.deleted_fields[0].name, "lanes");
        assert!(check.deleted_fields[0].extra.is_null());

        let missing: SchemaCheckResponse =
            serde_json::from_str(r#"{"error_message":"No Layer with this name in the package"}"#).unwrap();
        assert!(matches!(missing.into_check(), Err(ApiError::Application(m)) if m.starts_with("No Layer")));
    }

    #[test]
    fn compatible_layers_and_download_branch_on_error_message() {
        let ok: CompatibleLayersResponse = serde_json::from_str(
            r#"{"layers":[{"name":"geonode:roads","compatible":true,"new_fields":[],"deleted_fields":[],
                "urls":{"reload_url":"/api/data_manager/9/roads/geonode:roads/reload/"}}]}"#,
        )
        .unwrap();
        let layers = ok.into_layers().unwrap();
        assert_eq!(layers.len(), 1);
        assert!(layers[0].compatible);
        assert!(layers[0].urls.reload_url.is_some());

        let denied: CompatibleLayersResponse =
            serde_json::from_str(r#"{"error_message":"You Don't Have Permission"}"#).unwrap();
        assert!(denied.into_layers().is_err());

        let download: DownloadResponse =
            serde_json::from_str(r#"{"download_url":"https://x/api/downloads/4/"}"#).unwrap();
        assert_eq!(download.into_download_url().unwrap(), "https://x/api/downloads/4/");
        let failed: DownloadResponse =
            serde_json::from_str(r#"{"error_message":"No Layer with this name roads"}"#).unwrap();
        assert_eq!(
            failed.into_download_url(),
            Err(ApiError::Application("No Layer with this name roads".to_string()))
        );
    }

    #[test]
    fn task_state_knows_terminal_states() {
        let pending: TaskState = serde_json::from_str(r#"{"state":"PENDING","result":null}"#).unwrap();
        assert!(!pending.is_finished());
        let done: TaskState =
            serde_json::from_str(r#"{"state":"SUCCESS","result":"/downloads/1.zip"}"#).unwrap();
        assert!(done.is_finished());
    }

    #[test]
    fn esri_request_serializes_layer_url() {
        let body = serde_json::to_string(&EsriPublishRequest { layer_url: "https://x/0" }).unwrap();
        assert_eq!(body, r#"{"layer_url":"https://x/0"}"#);
    }
}
