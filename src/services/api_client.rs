// ============================================================================
// API CLIENT - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// NO tiene lógica de negocio, solo hace requests HTTP autenticados.
// Un status no-2xx NO es un error aquí: el cuerpo se devuelve al llamador.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, FormData, ProgressEvent, RequestCredentials, XmlHttpRequest};

use crate::error::ApiError;
use crate::models::TokenDescriptor;
use crate::utils::{csrf_token, CSRF_HEADER};

/// Resultado crudo de una transferencia XHR, tal como lo vio el navegador
#[derive(Clone, Debug, PartialEq)]
pub struct XhrResponse {
    /// 0 cuando no hubo respuesta HTTP (fallo de red)
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl XhrResponse {
    pub fn network_failure(reason: impl Into<String>) -> Self {
        Self {
            status: 0,
            status_text: reason.into(),
            body: String::new(),
        }
    }

    fn from_xhr(xhr: &XmlHttpRequest) -> Self {
        Self {
            status: xhr.status().unwrap_or(0),
            status_text: xhr.status_text().unwrap_or_default(),
            body: xhr.response_text().ok().flatten().unwrap_or_default(),
        }
    }

    pub fn is_client_or_server_error(&self) -> bool {
        self.status >= 400
    }
}

/// Cliente API - SOLO comunicación HTTP (stateless)
#[derive(Clone, Debug)]
pub struct ApiClient {
    username: String,
    token: TokenDescriptor,
}

impl ApiClient {
    pub fn new(username: impl Into<String>, token: TokenDescriptor) -> Self {
        Self {
            username: username.into(),
            token,
        }
    }

    /// Header Authorization de la sesión (None = anónimo)
    pub fn authorization(&self) -> Option<String> {
        self.token.authorization(&self.username)
    }

    fn authorize(
        &self,
        builder: RequestBuilder,
        extra_headers: &[(&str, &str)],
        with_csrf: bool,
    ) -> RequestBuilder {
        let mut builder = builder.credentials(RequestCredentials::Include);
        if let Some(authorization) = self.authorization() {
            builder = builder.header("Authorization", &authorization);
        }
        if with_csrf {
            if let Some(token) = csrf_token() {
                builder = builder.header(CSRF_HEADER, &token);
            }
        }
        for (name, value) in extra_headers {
            builder = builder.header(name, value);
        }
        builder
    }

    /// GET → JSON
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self
            .authorize(Request::get(url), extra_headers, false)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_json(url, response).await
    }

    /// POST con cuerpo arbitrario (FormData, Blob, string...) → JSON
    pub async fn post<T, B>(
        &self,
        url: &str,
        body: B,
        extra_headers: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Into<JsValue>,
    {
        let request = self
            .authorize(Request::post(url), extra_headers, true)
            .body(body)
            .map_err(|e| ApiError::Transport(format!("Request build error: {}", e)))?;
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_json(url, response).await
    }

    /// POST con cuerpo JSON → JSON
    pub async fn post_json<T, B>(
        &self,
        url: &str,
        body: &B,
        extra_headers: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self
            .authorize(Request::post(url), extra_headers, true)
            .json(body)
            .map_err(|e| ApiError::Parse(format!("Serialization error: {}", e)))?;
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_json(url, response).await
    }

    /// DELETE → texto crudo
    pub async fn delete(&self, url: &str, extra_headers: &[(&str, &str)]) -> Result<String, ApiError> {
        let response = self
            .authorize(Request::delete(url), extra_headers, true)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        log::debug!("🗑️ DELETE {} → HTTP {}", url, response.status());
        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// POST binario con progreso vía XHR.
    ///
    /// Nunca falla: todos los desenlaces llegan por los callbacks.
    /// - `on_done(texto)`: al llegar a `readyState == DONE`
    /// - `on_progress(loaded, total)`: solo si la longitud es computable
    /// - `on_load(respuesta)`: la transferencia terminó (cualquier status)
    /// - `on_error(respuesta)`: fallo de red, abort o timeout del transporte
    pub fn upload_with_progress<D, P, L, E>(
        &self,
        url: &str,
        body: &FormData,
        on_done: D,
        on_progress: P,
        on_load: L,
        mut on_error: E,
    ) where
        D: FnMut(String) + 'static,
        P: FnMut(f64, f64) + 'static,
        L: FnMut(XhrResponse) + 'static,
        E: FnMut(XhrResponse) + 'static,
    {
        let xhr = match XmlHttpRequest::new() {
            Ok(xhr) => xhr,
            Err(e) => {
                log::error!("❌ No se pudo crear XMLHttpRequest: {:?}", e);
                on_error(XhrResponse::network_failure("XMLHttpRequest unavailable"));
                return;
            }
        };

        // El mismo callback de error atiende error, abort y timeout
        let on_error = Rc::new(RefCell::new(on_error));

        if let Err(e) = self.wire_upload(&xhr, url, body, on_done, on_progress, on_load, on_error.clone()) {
            log::error!("❌ Error iniciando upload a {}: {:?}", url, e);
            (&mut *on_error.borrow_mut())(XhrResponse::network_failure(format!("{:?}", e)));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn wire_upload<D, P, L, E>(
        &self,
        xhr: &XmlHttpRequest,
        url: &str,
        body: &FormData,
        mut on_done: D,
        mut on_progress: P,
        mut on_load: L,
        on_error: Rc<RefCell<E>>,
    ) -> Result<(), JsValue>
    where
        D: FnMut(String) + 'static,
        P: FnMut(f64, f64) + 'static,
        L: FnMut(XhrResponse) + 'static,
        E: FnMut(XhrResponse) + 'static,
    {
        let progress_closure = Closure::wrap(Box::new(move |evt: ProgressEvent| {
            if evt.length_computable() {
                on_progress(evt.loaded(), evt.total());
            }
        }) as Box<dyn FnMut(ProgressEvent)>);
        xhr.upload()?
            .add_event_listener_with_callback("progress", progress_closure.as_ref().unchecked_ref())?;

        let load_closure = Closure::wrap(Box::new({
            let xhr = xhr.clone();
            move |_evt: Event| on_load(XhrResponse::from_xhr(&xhr))
        }) as Box<dyn FnMut(Event)>);
        xhr.add_event_listener_with_callback("load", load_closure.as_ref().unchecked_ref())?;

        let error_closure = Closure::wrap(Box::new({
            let xhr = xhr.clone();
            move |evt: Event| {
                let mut response = XhrResponse::from_xhr(&xhr);
                if response.status_text.is_empty() {
                    response.status_text = format!("Upload {}", evt.type_());
                }
                (&mut *on_error.borrow_mut())(response)
            }
        }) as Box<dyn FnMut(Event)>);
        for event in ["error", "abort", "timeout"] {
            xhr.add_event_listener_with_callback(event, error_closure.as_ref().unchecked_ref())?;
        }

        let ready_closure = Closure::wrap(Box::new({
            let xhr = xhr.clone();
            move |_evt: Event| {
                if xhr.ready_state() == XmlHttpRequest::DONE {
                    on_done(xhr.response_text().ok().flatten().unwrap_or_default());
                }
            }
        }) as Box<dyn FnMut(Event)>);
        xhr.set_onreadystatechange(Some(ready_closure.as_ref().unchecked_ref()));

        xhr.open_with_async("POST", url, true)?;
        xhr.set_with_credentials(true);
        xhr.set_request_header("Cache-Control", "no-cache")?;
        if let Some(authorization) = self.authorization() {
            xhr.set_request_header("Authorization", &authorization)?;
        }
        if let Some(token) = csrf_token() {
            xhr.set_request_header(CSRF_HEADER, &token)?;
        }
        xhr.send_with_opt_form_data(Some(body))?;

        // Los listeners viven lo que dure el XHR; forget() los mantiene vivos
        progress_closure.forget();
        load_closure.forget();
        error_closure.forget();
        ready_closure.forget();

        Ok(())
    }
}

async fn parse_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    if !response.ok() {
        log::warn!("⚠️ {} respondió HTTP {}", url, status);
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(format!("HTTP {} from {}: {}", status, url, e)))
}
