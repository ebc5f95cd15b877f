use shared::{ApiRequest, ApiResponse, HttpTransport, TaskError, TaskResult};
use tracing::debug;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

/// `fetch` against `base_url` (empty for the page's own origin).
#[derive(Debug, Clone, Default)]
pub struct FetchTransport {
    base_url: String,
}

impl FetchTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl HttpTransport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> TaskResult<ApiResponse> {
        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        if let Some(body) = &request.body {
            opts.set_body(&JsValue::from_str(body));
        }

        let url = format!("{}{}", self.base_url, request.path);
        let http_request = Request::new_with_str_and_init(&url, &opts)
            .map_err(|_| network("Failed to create request"))?;
        if request.body.is_some() {
            http_request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(|_| network("Failed to set header"))?;
        }

        let window = web_sys::window().ok_or_else(|| network("no window"))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&http_request))
            .await
            .map_err(|_| network("Failed to send request"))?
            .into();

        let text_promise = response
            .text()
            .map_err(|_| network("Failed to read response"))?;
        let body = JsFuture::from(text_promise)
            .await
            .map_err(|_| network("Failed to get text"))?
            .as_string()
            .ok_or_else(|| network("Failed to convert to string"))?;

        debug!(%url, status = response.status(), "fetch finished");
        Ok(ApiResponse {
            status: response.status(),
            body,
        })
    }
}

fn network(message: &str) -> TaskError {
    TaskError::Network(message.to_string())
}
