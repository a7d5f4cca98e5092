//! Session gate middleware.
//!
//! Every request is a navigation: the gate runs against the `token` cookie
//! carried by that request before any page is served. Denials and entry-page
//! bounces become `303 See Other`; when the gate clears a malformed or expired
//! credential the response also expires the cookie.

use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;

use sitedesk_core::credential::CredentialSlot;
use sitedesk_types::session::SessionDecision;

use crate::state::ConcreteGate;

/// State for the gate middleware.
#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<ConcreteGate>,
    pub cookie_name: String,
}

/// The credential as carried by one request's cookies.
pub struct CookieSlot {
    token: Mutex<Option<SecretString>>,
}

impl CookieSlot {
    pub fn from_headers(headers: &HeaderMap, name: &str) -> Self {
        Self {
            token: Mutex::new(read_cookie(headers, name).map(SecretString::from)),
        }
    }
}

impl CredentialSlot for CookieSlot {
    fn credential(&self) -> Option<SecretString> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn clear_credential(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Find cookie `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Header value that expires cookie `name` in the browser.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0")
}

/// Middleware: evaluate the gate for the request path, then serve, redirect,
/// or both clear and redirect.
pub async fn session_gate(State(state): State<GateState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let slot = CookieSlot::from_headers(request.headers(), &state.cookie_name);
    let evaluation = state.gate.evaluate_detailed(&path, &slot).await;

    let mut response = match &evaluation.decision {
        SessionDecision::Allow => next.run(request).await,
        SessionDecision::DenyRedirect(target) | SessionDecision::AllowRedirect(target) => {
            tracing::debug!(path = %path, location = %target, decision = %evaluation.decision, "redirecting");
            redirect(target)
        }
    };

    if evaluation.cleared {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie(&state.cookie_name)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn redirect(target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(location) => (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(location = target, "redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
