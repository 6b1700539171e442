//! The error boundary.
//!
//! Every error that escapes the pipeline ends up here: it is logged once,
//! then rendered either as a JSON envelope or as a `"{status} | {message}"`
//! text page, depending on what the client asked for.

use http::StatusCode;
use tracing::{error, warn};
use velolia_core::{Response, ResponseExt, VeloliaError};

/// Reports and renders dispatch errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandler {
    debug: bool,
}

impl ErrorHandler {
    /// An error handler; with `debug` set, server errors show their message.
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Whether server error messages are shown to clients.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Logs `err`: `warn` for client errors, `error` for the rest.
    pub fn report(&self, err: &VeloliaError) {
        let status = err.status_code().as_u16();
        if err.is_client_error() {
            warn!(status, code = err.error_code(), error = %err, "client error");
        } else {
            error!(status, code = err.error_code(), error = %err, "server error");
        }
    }

    /// Renders `err` as a response.
    ///
    /// `Http` errors raised by middleware always keep their message. Other
    /// server errors read `Server Error` unless debug is on.
    #[must_use]
    pub fn render(&self, err: &VeloliaError, wants_json: bool, request_id: Option<&str>) -> Response {
        let status = err.status_code();
        let expose = self.debug || matches!(err, VeloliaError::Http { .. });

        if wants_json {
            let envelope = err.to_envelope(request_id, expose);
            return match serde_json::to_value(&envelope) {
                Ok(body) => Response::json(status, &body),
                Err(_) => Response::json_error(status, err.error_code(), &err.public_message(expose)),
            };
        }

        Response::error(status, &text_page(status, &err.public_message(expose)))
    }

    /// [`report`](Self::report) followed by [`render`](Self::render).
    pub fn handle(&self, err: &VeloliaError, wants_json: bool, request_id: Option<&str>) -> Response {
        self.report(err);
        self.render(err, wants_json, request_id)
    }
}

fn text_page(status: StatusCode, message: &str) -> String {
    format!("{} | {}", status.as_u16(), message)
}
