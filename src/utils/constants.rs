/// Status HTTP con el que el servidor confirma un upload creado
pub const HTTP_CREATED: u16 = 201;

/// Nombre del campo multipart que transporta el paquete
pub const PACKAGE_FIELD: &str = "package";

/// Extensión aceptada por la zona de subida
pub const GEOPACKAGE_EXTENSION: &str = ".gpkg";

/// Cookie y header de protección CSRF
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

// Claves de permiso servidas por `{permissionsURL}`
pub const VIEW_PACKAGE: &str = "view_package";
pub const DOWNLOAD_PACKAGE: &str = "download_package";
pub const DELETE_PACKAGE: &str = "delete_package";
pub const PUBLISH_FROM_PACKAGE: &str = "publish_from_package";
