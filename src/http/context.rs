//! Per-request context.
//!
//! # Responsibilities
//! - Carry the request and the buffered response writer
//! - Expose path parameters, query and form values, cookies and client address
//! - Hold side-channel values shared between middleware and handlers
//! - Provide response helpers layered on [`Context::write_response`]
//!
//! Contexts are pooled by the dispatch core: reset when acquired, cleared when
//! released. A handler must not keep anything borrowed from the context past
//! its own return; copy the fields a background task needs first.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request, StatusCode};
use cookie::Cookie;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::{Error, HandlerResult};
use crate::http::mime;
use crate::http::response::ResponseWriter;
use crate::render::Renderer;
use crate::routing::RouteInfo;

pub struct Context {
    request: Request<Body>,
    response: ResponseWriter,
    remote_addr: Option<SocketAddr>,
    /// Lazily parsed query string.
    query: Option<HashMap<String, Vec<String>>>,
    /// Lazily parsed form body merged with the query string.
    form: Option<HashMap<String, Vec<String>>>,
    param_names: Arc<[String]>,
    param_values: Vec<String>,
    /// Side-channel values; also the data handed to the renderer.
    values: HashMap<String, Value>,
    route: Option<RouteInfo>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Context {
    /// Create a context for `request`. The peer address is taken from the
    /// axum `ConnectInfo` extension when present.
    pub fn new(request: Request<Body>) -> Self {
        let mut ctx = Self {
            request: Request::default(),
            response: ResponseWriter::new(),
            remote_addr: None,
            query: None,
            form: None,
            param_names: Arc::from(Vec::new()),
            param_values: Vec::new(),
            values: HashMap::new(),
            route: None,
            renderer: None,
        };
        ctx.reset(request);
        ctx
    }

    /// Prepare the context for a new request, discarding all previous state.
    pub fn reset(&mut self, request: Request<Body>) {
        self.remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        self.request = request;
        self.response.clear();
        self.query = None;
        self.form = None;
        self.param_names = Arc::from(Vec::new());
        self.param_values.clear();
        self.values.clear();
        self.route = None;
    }

    /// Drop the request and any response state so the pooled context does not
    /// pin memory between requests.
    pub(crate) fn release(&mut self) {
        self.request = Request::default();
        self.response.clear();
        self.remote_addr = None;
        self.query = None;
        self.form = None;
        self.param_values.clear();
        self.values.clear();
        self.route = None;
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote_addr(&mut self, addr: Option<SocketAddr>) {
        self.remote_addr = addr;
    }

    pub fn renderer(&self) -> Option<&Arc<dyn Renderer>> {
        self.renderer.as_ref()
    }

    pub fn set_renderer(&mut self, renderer: Option<Arc<dyn Renderer>>) {
        self.renderer = renderer;
    }

    /// The route that matched this request, if any.
    pub fn route(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Option<RouteInfo>) {
        self.route = route;
    }

    // ----- path parameters -----

    /// Path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.param_names
            .iter()
            .zip(&self.param_values)
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn param_values(&self) -> &[String] {
        &self.param_values
    }

    /// Set parameter names and values; extra values are dropped.
    pub fn set_params(&mut self, names: Arc<[String]>, mut values: Vec<String>) {
        values.truncate(names.len());
        self.param_names = names;
        self.param_values = values;
    }

    // ----- query, cookies, client -----

    pub fn query_string(&self) -> &str {
        self.request.uri().query().unwrap_or("")
    }

    /// All query parameters.
    pub fn query_params(&mut self) -> &HashMap<String, Vec<String>> {
        let query = self.request.uri().query().unwrap_or("");
        self.query.get_or_insert_with(|| {
            let mut params: HashMap<String, Vec<String>> = HashMap::new();
            parse_urlencoded(&mut params, query.as_bytes());
            params
        })
    }

    /// First value of the named query parameter.
    pub fn query_param(&mut self, name: &str) -> Option<&str> {
        self.query_params()
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Form values: the `application/x-www-form-urlencoded` body first, then
    /// the query string. The body is consumed on first use.
    pub async fn form_params(&mut self) -> Result<&HashMap<String, Vec<String>>, Error> {
        if self.form.is_none() {
            let mut params: HashMap<String, Vec<String>> = HashMap::new();
            if self.has_form_body() {
                let body = std::mem::take(self.request.body_mut());
                let bytes = axum::body::to_bytes(body, usize::MAX).await?;
                parse_urlencoded(&mut params, &bytes);
            }
            parse_urlencoded(&mut params, self.query_string().as_bytes());
            self.form = Some(params);
        }
        Ok(self.form.get_or_insert_with(HashMap::new))
    }

    /// First form value for `name`.
    pub async fn form_value(&mut self, name: &str) -> Result<Option<&str>, Error> {
        Ok(self
            .form_params()
            .await?
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str))
    }

    fn has_form_body(&self) -> bool {
        self.request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(mime::MIME_APPLICATION_FORM))
    }

    /// Cookies sent with the request.
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| Cookie::split_parse(v.to_string()).filter_map(Result::ok))
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies().into_iter().find(|c| c.name() == name)
    }

    /// Add a `Set-Cookie` header to the response.
    pub fn set_cookie(&mut self, cookie: &Cookie<'_>) {
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            self.response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    /// Host the request was addressed to.
    pub fn domain(&self) -> &str {
        self.request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.request.uri().host())
            .unwrap_or("")
    }

    /// Client IP: `X-Real-IP`, then the first valid `X-Forwarded-For` entry,
    /// then the peer address. Empty when none is known.
    pub fn real_ip(&self) -> String {
        let headers = self.request.headers();

        if let Some(ip) = headers
            .get(mime::HEADER_X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| ip.parse::<IpAddr>().is_ok())
        {
            return ip.to_string();
        }

        if let Some(ip) = headers
            .get(mime::HEADER_X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.split(',')
                    .map(str::trim)
                    .find(|ip| ip.parse::<IpAddr>().is_ok())
            })
        {
            return ip.to_string();
        }

        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request
            .headers()
            .get(mime::HEADER_X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
    }

    /// Decode the request body as JSON. The body can be read once.
    pub async fn decode<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let body = std::mem::take(self.request.body_mut());
        let bytes = axum::body::to_bytes(body, usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ----- side channel -----

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    // ----- response -----

    /// Write a complete response: content type (only if unset), status, body.
    pub fn write_response(&mut self, code: StatusCode, content_type: &str, body: &[u8]) -> HandlerResult {
        self.response.set_content_type_if_unset(content_type);
        self.response.write_header(code);
        self.response.write(body);
        Ok(())
    }

    pub fn blob(&mut self, code: StatusCode, content_type: &str, body: &[u8]) -> HandlerResult {
        self.write_response(code, content_type, body)
    }

    pub fn string(&mut self, code: StatusCode, s: impl AsRef<str>) -> HandlerResult {
        self.write_response(code, mime::MIME_TEXT_PLAIN_CHARSET_UTF8, s.as_ref().as_bytes())
    }

    pub fn html(&mut self, code: StatusCode, html: impl AsRef<str>) -> HandlerResult {
        self.html_blob(code, html.as_ref().as_bytes())
    }

    pub fn html_blob(&mut self, code: StatusCode, body: &[u8]) -> HandlerResult {
        self.write_response(code, mime::MIME_TEXT_HTML_CHARSET_UTF8, body)
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, data: &T) -> HandlerResult {
        let body = serde_json::to_vec(data)?;
        self.write_response(code, mime::MIME_APPLICATION_JSON_CHARSET_UTF8, &body)
    }

    /// Stream `reader` as the response body. Nothing is read until the
    /// response is sent.
    pub fn stream<R>(&mut self, code: StatusCode, content_type: &str, reader: R) -> HandlerResult
    where
        R: AsyncRead + Send + 'static,
    {
        self.response.set_content_type_if_unset(content_type);
        self.response.write_header(code);
        self.response
            .write_stream(Body::from_stream(ReaderStream::new(reader)));
        Ok(())
    }

    pub fn no_content(&mut self, code: StatusCode) -> HandlerResult {
        self.response.write_header(code);
        Ok(())
    }

    /// Redirect to `location` with a 3xx status.
    pub fn redirect(&mut self, code: StatusCode, location: &str) -> HandlerResult {
        if !code.is_redirection() {
            return Err(Error::InvalidRedirectCode(code.as_u16()));
        }
        let value = HeaderValue::from_str(location).map_err(Error::other)?;
        self.response.headers_mut().insert(header::LOCATION, value);
        self.response.write_header(code);
        Ok(())
    }

    /// Render `template` with the side-channel values and send it as HTML.
    pub fn render(&mut self, code: StatusCode, template: &str) -> HandlerResult {
        let renderer = self.renderer.clone().ok_or(Error::RendererNotRegistered)?;
        let mut out = Vec::new();
        renderer
            .render(&mut out, template, &self.values)
            .map_err(|source| Error::Render {
                template: template.to_string(),
                source,
            })?;
        self.html_blob(code, &out)
    }

    /// Send a file from disk. Directories are served through their
    /// `index.html`; anything unreadable is reported as not found.
    pub async fn file(&mut self, path: impl AsRef<Path>) -> HandlerResult {
        let mut path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path).await.map_err(|_| Error::NotFound)?;
        if meta.is_dir() {
            path.push("index.html");
        }

        let file = tokio::fs::File::open(&path).await.map_err(|_| Error::NotFound)?;
        let content_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(mime::MIME_OCTET_STREAM, mime::from_extension);

        self.stream(StatusCode::OK, content_type, file)
    }
}

fn parse_urlencoded(params: &mut HashMap<String, Vec<String>>, input: &[u8]) {
    for (k, v) in url::form_urlencoded::parse(input) {
        params.entry(k.into_owned()).or_default().push(v.into_owned());
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("remote_addr", &self.remote_addr)
            .field("params", &self.param_names.iter().zip(&self.param_values).collect::<Vec<_>>())
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}
