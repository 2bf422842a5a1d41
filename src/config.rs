use serde::{Deserialize, Serialize};

/// Espera por defecto tras un 201 antes de fusionar el upload en el store
pub const DEFAULT_UPLOAD_SETTLE_DELAY_MS: u32 = 1000;

/// Tamaño de página por defecto del listado de uploads
pub const DEFAULT_UPLOADS_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub environment: String,
    pub enable_logging: bool,
    pub upload_settle_delay_ms: u32,
    pub uploads_page_limit: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            enable_logging: true,
            upload_settle_delay_ms: DEFAULT_UPLOAD_SETTLE_DELAY_MS,
            uploads_page_limit: DEFAULT_UPLOADS_PAGE_LIMIT,
        }
    }
}

impl ManagerConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        Self::from_values(
            option_env!("ENVIRONMENT"),
            option_env!("ENABLE_LOGGING"),
            option_env!("UPLOAD_SETTLE_DELAY_MS"),
            option_env!("UPLOADS_PAGE_LIMIT"),
        )
    }

    fn from_values(
        environment: Option<&str>,
        enable_logging: Option<&str>,
        upload_settle_delay_ms: Option<&str>,
        uploads_page_limit: Option<&str>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            environment: environment.unwrap_or(&defaults.environment).to_string(),
            enable_logging: enable_logging
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_logging),
            upload_settle_delay_ms: upload_settle_delay_ms
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_settle_delay_ms),
            uploads_page_limit: uploads_page_limit
                .and_then(|v| v.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.uploads_page_limit),
        }
    }

    /// Aplica los overrides de las props de montaje
    pub fn with_overrides(&self, settle_delay_ms: Option<u32>, page_limit: Option<u32>) -> Self {
        Self {
            upload_settle_delay_ms: settle_delay_ms.unwrap_or(self.upload_settle_delay_ms),
            uploads_page_limit: page_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(self.uploads_page_limit),
            ..self.clone()
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn log_level(&self) -> log::Level {
        if self.enable_logging {
            log::Level::Info
        } else {
            log::Level::Warn
        }
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: ManagerConfig = ManagerConfig::from_env();
}
