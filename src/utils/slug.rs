/// Normaliza un nombre de publicación: minúsculas, espacios → `_`,
/// solo se conservan `[A-Za-z0-9_-]`
pub fn convert_to_slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// ¿El nombre de archivo es un GeoPackage?
pub fn is_geopackage(file_name: &str) -> bool {
    file_name
        .to_ascii_lowercase()
        .ends_with(crate::utils::constants::GEOPACKAGE_EXTENSION)
}
