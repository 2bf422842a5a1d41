use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Paquete subido (creado solo por el servidor)
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct UploadRecord {
    pub id: i64,
    pub package: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub uploaded_at: NaiveDateTime,
    pub user: UploadUser,
    pub download_url: String,
    #[serde(default)]
    pub layers: Vec<LayerSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

impl UploadRecord {
    /// Nombre de archivo del paquete, sin la ruta de almacenamiento
    pub fn file_name(&self) -> &str {
        self.package.rsplit('/').next().unwrap_or(&self.package)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerSummary> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}

/// Acepta ISO-8601 con zona (`Z`, `+02:00`), normalizado a UTC, o sin zona
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(with_offset) => Ok(with_offset.naive_utc()),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"),
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct UploadUser {
    pub username: String,
}

/// Capa contenida en un paquete (solo lectura)
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct LayerSummary {
    pub name: String,
    pub geometry_type_name: String,
    pub feature_count: u64,

    // Nombre sugerido por el servidor para publicar
    #[serde(default)]
    pub expected_name: Option<String>,
    #[serde(default)]
    pub urls: LayerUrls,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct LayerUrls {
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub publish_url: Option<String>,
    #[serde(default)]
    pub compatible_layers_url: Option<String>,
    #[serde(default)]
    pub download_request_url: Option<String>,
}

/// Página de `GET {uploadsURL}?offset&limit`
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct UploadsPage {
    pub objects: Vec<UploadRecord>,
    pub meta: PageMeta,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct PageMeta {
    pub total_count: u64,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
}

impl PageMeta {
    pub fn has_more(&self, loaded: usize) -> bool {
        (loaded as u64) < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "id": 9,
        "package": "geopackages/2024/roads.gpkg",
        "uploaded_at": "2024-03-01T10:15:30.123456",
        "user": {"username": "alice"},
        "download_url": "/uploaded/geopackages/2024/roads.gpkg",
        "resource_uri": "/api/data_manager/9/",
        "layers": [{
            "name": "roads",
            "expected_name": "roads_1",
            "geometry_type_name": "LineString",
            "feature_count": 1204,
            "urls": {
                "publish_url": "/api/data_manager/9/roads/publish/",
                "compatible_layers_url": "/api/data_manager/9/roads/compatible_layers/"
            }
        }]
    }"#;

    #[test]
    fn parses_server_upload_record() {
        let record: UploadRecord = serde_json::from_str(RECORD).unwrap();
        assert_eq!(record.id, 9);
        assert_eq!(record.user.username, "alice");
        assert_eq!(record.file_name(), "roads.gpkg");

        let layer = record.layer("roads").unwrap();
        assert_eq!(layer.feature_count, 1204);
        assert_eq!(layer.expected_name.as_deref(), Some("roads_1"));
        assert_eq!(
            layer.urls.publish_url.as_deref(),
            Some("/api/data_manager/9/roads/publish/")
        );
        assert!(layer.urls.details_url.is_none());
    }

    #[test]
    fn layers_and_urls_are_optional() {
        let record: UploadRecord = serde_json::from_str(
            r#"{"id":1,"package":"a.gpkg","uploaded_at":"2024-01-01T00:00:00",
                "user":{"username":"bob"},"download_url":"/a.gpkg"}"#,
        )
        .unwrap();
        assert!(record.layers.is_empty());
        assert!(record.layer("missing").is_none());
    }

    fn uploaded_at(raw: &str) -> NaiveDateTime {
        let body = format!(
            r#"{{"id":1,"package":"a.gpkg","uploaded_at":"{}",
                "user":{{"username":"bob"}},"download_url":"/a.gpkg"}}"#,
            raw
        );
        serde_json::from_str::<UploadRecord>(&body).unwrap().uploaded_at
    }

    #[test]
    fn timestamps_with_or_without_offset_are_accepted() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        assert_eq!(uploaded_at("2024-03-01T10:15:30"), expected);
        assert_eq!(uploaded_at("2024-03-01T10:15:30Z"), expected);
        assert_eq!(uploaded_at("2024-03-01T10:15:30+00:00"), expected);
        // Con desfase se guarda en UTC
        assert_eq!(uploaded_at("2024-03-01T12:15:30+02:00"), expected);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("01/03/2024 10:15").is_err());
        assert!(serde_json::from_str::<UploadRecord>(
            r#"{"id":1,"package":"a.gpkg","uploaded_at":"yesterday",
                "user":{"username":"bob"},"download_url":"/a.gpkg"}"#
        )
        .is_err());
    }

    #[test]
    fn page_meta_reports_remaining_items() {
        let page: UploadsPage = serde_json::from_str(
            r#"{"objects":[],"meta":{"total_count":45,"limit":20,"offset":0,"next":null}}"#,
        )
        .unwrap();
        assert!(page.meta.has_more(20));
        assert!(!page.meta.has_more(45));
    }
}
