use serde::{Deserialize, Serialize};

/// Separador del sufijo de expiración en tokens legacy ("xyz for 2024-01-01")
const LEGACY_EXPIRY_SEPARATOR: &str = " for ";

/// Credencial con la que se construye el header Authorization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenDescriptor {
    /// Token crudo con sufijo de expiración embebido
    Legacy { raw: String },
    /// Token estilo OAuth con prefijo propio (p.ej. "Bearer")
    Oauth { prefix: String, token: String },
    /// API key simple
    Keyed { token: String },
    /// Cualquier otro tag: petición anónima
    #[serde(other)]
    Unknown,
}

impl TokenDescriptor {
    /// Valor del token tal como viaja en el header
    pub fn token_value(&self) -> Option<&str> {
        match self {
            TokenDescriptor::Legacy { raw } => raw.split(LEGACY_EXPIRY_SEPARATOR).next(),
            TokenDescriptor::Oauth { token, .. } | TokenDescriptor::Keyed { token } => Some(token),
            TokenDescriptor::Unknown => None,
        }
    }

    /// Header Authorization completo para `username`, o None si es anónimo
    pub fn authorization(&self, username: &str) -> Option<String> {
        match self {
            TokenDescriptor::Legacy { .. } | TokenDescriptor::Keyed { .. } => self
                .token_value()
                .map(|token| format!("ApiKey {}:{}", username, token)),
            TokenDescriptor::Oauth { prefix, token } => Some(format!("{} {}", prefix, token)),
            TokenDescriptor::Unknown => None,
        }
    }
}

/// El host puede pasar el token como string plano (formato legacy) o descriptor
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum TokenInput {
    Raw(String),
    Descriptor(TokenDescriptor),
}

impl From<TokenInput> for TokenDescriptor {
    fn from(input: TokenInput) -> Self {
        match input {
            TokenInput::Raw(raw) => TokenDescriptor::Legacy { raw },
            TokenInput::Descriptor(descriptor) => descriptor,
        }
    }
}

/// Endpoints REST entregados por la página anfitriona
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlMap {
    #[serde(rename = "uploadsURL")]
    pub uploads_url: String,
    #[serde(rename = "permissionsURL")]
    pub permissions_url: String,
    #[serde(rename = "layersURL", default, skip_serializing_if = "Option::is_none")]
    pub layers_url: Option<String>,
    #[serde(rename = "esriPublishURL", default, skip_serializing_if = "Option::is_none")]
    pub esri_publish_url: Option<String>,
    #[serde(rename = "taskStateURL", default, skip_serializing_if = "Option::is_none")]
    pub task_state_url: Option<String>,
    #[serde(rename = "downloadURL", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Sesión de la página: inmutable mientras dure la carga
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub username: String,
    pub token: TokenDescriptor,
    pub urls: UrlMap,
}
