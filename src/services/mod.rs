pub mod api_client;
pub mod geopackage_api;

pub use api_client::{ApiClient, XhrResponse};
pub use geopackage_api::GeopackageApi;
