use wasm_bindgen::JsCast;
use web_sys::{window, HtmlDocument};

use crate::utils::constants::CSRF_COOKIE;

/// Busca `name` en un string `document.cookie` ("a=1; b=2")
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Token CSRF de la sesión Django, si la cookie existe
pub fn csrf_token() -> Option<String> {
    let document = window()?.document()?.dyn_into::<HtmlDocument>().ok()?;
    let cookies = document.cookie().ok()?;
    cookie_value(&cookies, CSRF_COOKIE)
}
