// ============================================================================
// GEOPACKAGE API - Endpoints REST del gestor de paquetes
// ============================================================================
// Traduce cada endpoint a una llamada del ApiClient. Las respuestas con
// `error_message` se convierten en ApiError::Application aquí, no antes.
// ============================================================================

use crate::error::ApiError;
use crate::models::publish::{
    CompatibleLayersResponse, DownloadResponse, EsriPublishRequest, ReloadResponse, RemoteLayerList,
    SchemaCheckResponse,
};
use crate::models::{
    CompatibleLayer, EsriPublishResponse, PermissionMap, PublishResponse, RemoteLayer, SchemaCheck,
    TaskState, UploadsPage, UrlMap,
};
use crate::services::ApiClient;

#[derive(Clone, Debug)]
pub struct GeopackageApi {
    client: ApiClient,
    urls: UrlMap,
}

impl GeopackageApi {
    pub fn new(client: ApiClient, urls: UrlMap) -> Self {
        Self { client, urls }
    }

    /// Página de uploads
    pub async fn get_uploads(&self, offset: usize, limit: u32) -> Result<UploadsPage, ApiError> {
        let url = with_query(
            &self.urls.uploads_url,
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        );
        log::info!("📦 Obteniendo uploads (offset {}, limit {})", offset, limit);
        self.client.get(&url, &[]).await
    }

    /// Mapa de permisos del usuario de la sesión
    pub async fn get_permissions(&self) -> Result<PermissionMap, ApiError> {
        log::info!("🔐 Obteniendo permisos");
        self.client.get(&self.urls.permissions_url, &[]).await
    }

    /// Borra un upload; el servidor responde texto
    pub async fn delete_upload(&self, id: i64) -> Result<String, ApiError> {
        log::info!("🗑️ Borrando upload {}", id);
        self.client.delete(&delete_url(&self.urls.uploads_url, id), &[]).await
    }

    /// Publica una capa del paquete; devuelve la URL de la capa publicada
    pub async fn publish_layer(&self, publish_url: &str, publish_name: &str) -> Result<String, ApiError> {
        let url = with_query(publish_url, &[("publish_name", encode(publish_name))]);
        log::info!("🗺️ Publicando capa como '{}'", publish_name);
        let response: PublishResponse = self.client.get(&url, &[]).await?;
        response.into_layer_url()
    }

    /// Publica la capa del paquete sobre una capa existente (`alternate`)
    pub async fn replace_layer(&self, publish_url: &str, alternate: &str) -> Result<String, ApiError> {
        let target = typename_table(alternate);
        let url = with_query(
            publish_url,
            &[("replace", "true".to_string()), ("publish_name", encode(target))],
        );
        log::info!("♻️ Reemplazando capa '{}'", alternate);
        let response: PublishResponse = self.client.get(&url, &[]).await?;
        response.into_layer_url()
    }

    /// Capas publicadas con esquema compatible con `layer_name`
    pub async fn compatible_layers(
        &self,
        upload_id: i64,
        layer_name: &str,
        compatible_layers_url: Option<&str>,
    ) -> Result<Vec<CompatibleLayer>, ApiError> {
        let url = match compatible_layers_url {
            Some(url) => url.to_string(),
            None => {
                let layer = encode(layer_name);
                layer_action_url(&self.urls.uploads_url, upload_id, &[layer.as_str()], "compatible_layers")
            }
        };
        let response: CompatibleLayersResponse = self.client.get(&url, &[]).await?;
        response.into_layers()
    }

    /// Compara el esquema de `layer_name` con la capa publicada `alternate`
    pub async fn compare_schema(
        &self,
        upload_id: i64,
        layer_name: &str,
        alternate: &str,
    ) -> Result<SchemaCheck, ApiError> {
        let (layer, target) = (encode(layer_name), encode(alternate));
        let url = layer_action_url(&self.urls.uploads_url, upload_id, &[layer.as_str(), target.as_str()], "compare");
        let response: SchemaCheckResponse = self.client.get(&url, &[]).await?;
        response.into_check()
    }

    /// Recarga (sobrescribe) los datos de `alternate` con la capa del paquete
    pub async fn reload_layer(&self, upload_id: i64, layer_name: &str, alternate: &str) -> Result<String, ApiError> {
        let (layer, target) = (encode(layer_name), encode(alternate));
        let url = layer_action_url(&self.urls.uploads_url, upload_id, &[layer.as_str(), target.as_str()], "reload");
        log::info!("🔄 Recargando '{}' desde {}/{}", alternate, upload_id, layer_name);
        let response: ReloadResponse = self.client.get(&url, &[]).await?;
        response.into_status()
    }

    /// Empaqueta capas publicadas en un GeoPackage; devuelve la URL de descarga
    pub async fn download_layers(&self, typenames: &[String]) -> Result<String, ApiError> {
        let download_url = required(&self.urls.download_url, "downloadURL")?;
        let names: Vec<String> = typenames.iter().map(|name| encode(typename_table(name))).collect();
        let url = with_query(download_url, &[("layer_names", names.join(","))]);
        log::info!("⬇️ Solicitando descarga de {} capa(s)", names.len());
        let response: DownloadResponse = self.client.get(&url, &[]).await?;
        response.into_download_url()
    }

    /// Capas existentes editables cuyo título contiene `title`
    pub async fn search_layers(&self, title: &str) -> Result<Vec<RemoteLayer>, ApiError> {
        let layers_url = required(&self.urls.layers_url, "layersURL")?;
        let url = with_query(
            layers_url,
            &[
                ("title__icontains", encode(title)),
                ("permission", "change_resourcebase".to_string()),
            ],
        );
        let list: RemoteLayerList = self.client.get(&url, &[]).await?;
        Ok(list.objects)
    }

    /// Lanza el volcado de una capa ArcGIS; devuelve el id de la tarea
    pub async fn publish_to_esri(&self, layer_url: &str) -> Result<String, ApiError> {
        let esri_url = required(&self.urls.esri_publish_url, "esriPublishURL")?;
        log::info!("🌐 Volcando capa ESRI: {}", layer_url);
        let response: EsriPublishResponse = self
            .client
            .post_json(esri_url, &EsriPublishRequest { layer_url }, &[])
            .await?;
        response.into_task_id()
    }

    /// Estado de una tarea en segundo plano
    pub async fn task_state(&self, task_id: &str) -> Result<TaskState, ApiError> {
        let task_url = required(&self.urls.task_state_url, "taskStateURL")?;
        let url = with_query(task_url, &[("task_id", encode(task_id))]);
        self.client.get(&url, &[]).await
    }
}

fn required<'a>(url: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    url.as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::Configuration(format!("{} not provided", name)))
}

fn encode(value: &str) -> String {
    js_sys::encode_uri_component(value).into()
}

/// `{uploadsURL}{id}/`
pub fn delete_url(uploads_url: &str, id: i64) -> String {
    format!("{}{}/", uploads_url, id)
}

/// `{uploadsURL}{id}/{segmentos...}/{acción}/` con segmentos ya codificados
pub fn layer_action_url(uploads_url: &str, upload_id: i64, segments: &[&str], action: &str) -> String {
    let mut url = format!("{}{}/", uploads_url, upload_id);
    for segment in segments {
        url.push_str(segment);
        url.push('/');
    }
    url.push_str(action);
    url.push('/');
    url
}

/// Nombre de tabla de un typename (`geonode:roads` → `roads`)
pub fn typename_table(typename: &str) -> &str {
    typename.rsplit(':').next().unwrap_or(typename)
}

/// Añade parámetros ya codificados a `base`, respetando una query existente
pub fn with_query(base: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_url_appends_id_and_trailing_slash() {
        assert_eq!(delete_url("/api/data_manager/", 12), "/api/data_manager/12/");
    }

    #[test]
    fn query_is_appended_with_the_right_separator() {
        let params = [("offset", "0".to_string()), ("limit", "20".to_string())];
        assert_eq!(
            with_query("/api/data_manager/", &params),
            "/api/data_manager/?offset=0&limit=20"
        );
        assert_eq!(
            with_query("/api/layers/?format=json", &params),
            "/api/layers/?format=json&offset=0&limit=20"
        );
        assert_eq!(with_query("/x/", &[]), "/x/");
    }

    #[test]
    fn layer_actions_hang_from_the_upload_resource() {
        assert_eq!(
            layer_action_url("/api/data_manager/", 9, &["roads"], "compatible_layers"),
            "/api/data_manager/9/roads/compatible_layers/"
        );
        assert_eq!(
            layer_action_url("/api/data_manager/", 9, &["roads", "geonode:roads_1"], "reload"),
            "/api/data_manager/9/roads/geonode:roads_1/reload/"
        );
        assert_eq!(
            layer_action_url("/api/data_manager/", 9, &["roads", "geonode:roads_1"], "compare"),
            "/api/data_manager/9/roads/geonode:roads_1/compare/"
        );
    }

    #[test]
    fn replace_and_download_use_table_names() {
        assert_eq!(typename_table("geonode:roads_1"), "roads_1");
        assert_eq!(typename_table("roads_1"), "roads_1");

        let names: Vec<&str> = ["geonode:roads", "geonode:rivers"].iter().map(|t| typename_table(t)).collect();
        assert_eq!(
            with_query("/api/data_manager/download_request/", &[("layer_names", names.join(","))]),
            "/api/data_manager/download_request/?layer_names=roads,rivers"
        );
        assert_eq!(
            with_query(
                "/api/data_manager/9/roads/publish/",
                &[("replace", "true".to_string()), ("publish_name", typename_table("geonode:roads_1").to_string())]
            ),
            "/api/data_manager/9/roads/publish/?replace=true&publish_name=roads_1"
        );
    }

    #[test]
    fn optional_urls_must_be_configured() {
        assert_eq!(required(&Some("/esri/".to_string()), "esriPublishURL"), Ok("/esri/"));
        assert!(matches!(
            required(&None, "esriPublishURL"),
            Err(ApiError::Configuration(msg)) if msg.contains("esriPublishURL")
        ));
        assert!(required(&Some(String::new()), "layersURL").is_err());
    }
}
