// ============================================================================
// ERRORES - Taxonomía de errores del cliente
// ============================================================================

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Errores visibles por el llamador inmediato
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Fallo de red, sin cuerpo de respuesta
    #[error("Network error: {0}")]
    Transport(String),

    /// Cuerpo no-JSON donde se esperaba JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON bien formado que trae `error_message`
    #[error("{0}")]
    Application(String),

    /// Argumento inválido (p.ej. operación de permisos desconocida)
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Props de montaje incompletas o URL no configurada
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Una llamada DOM/JS falló
    #[error("Browser error: {0}")]
    Browser(String),
}

impl ApiError {
    pub(crate) fn from_js(context: &str, value: &JsValue) -> Self {
        ApiError::Browser(format!("{}: {:?}", context, value))
    }
}

impl From<ApiError> for JsValue {
    fn from(error: ApiError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_displays_server_message_verbatim() {
        let err = ApiError::Application("Layer already exists".to_string());
        assert_eq!(err.to_string(), "Layer already exists");
    }

    #[test]
    fn transport_and_parse_errors_are_prefixed() {
        assert_eq!(
            ApiError::Transport("offline".into()).to_string(),
            "Network error: offline"
        );
        assert_eq!(
            ApiError::Parse("expected value".into()).to_string(),
            "Parse error: expected value"
        );
    }
}
