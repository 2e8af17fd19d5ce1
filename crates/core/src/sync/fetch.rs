use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use futures_channel::oneshot;
use responsive_review_protocol::{
    Body, FetchOptions, FetchRequest, FetchResponse, Headers, ResponseType, SyncMessage,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::channel::{ChannelError, SyncChannel};

const TARGET: &str = "responsive_review::fetch";

/// Length of the correlation ids handed out by [`FetchProxy`].
const ID_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The master could not perform the request; carries its message.
    #[error("{0}")]
    Remote(String),
    #[error("proxy shut down before a response arrived")]
    Abandoned,
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Runs host futures to completion. The browser passes
/// `wasm_bindgen_futures::spawn_local`; tests pass a `LocalPool` spawner.
pub type Spawner = Rc<dyn Fn(Pin<Box<dyn Future<Output = ()>>>)>;

/// What a page handed to `fetch(input, init)`, read off either the
/// `Request` object or the init dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParts {
    pub method: Option<String>,
    pub headers: Option<Headers>,
    pub body: Option<Body>,
    pub mode: Option<String>,
    pub credentials: Option<String>,
    pub cache: Option<String>,
    pub redirect: Option<String>,
    pub referrer: Option<String>,
    pub referrer_policy: Option<String>,
    pub integrity: Option<String>,
    pub keepalive: Option<bool>,
    /// Content type the browser derives from the body itself, e.g. the
    /// multipart boundary of a `FormData`.
    pub body_type: Option<String>,
    pub has_signal: bool,
}

/// Merge a `Request` input with explicit init options. Init wins field by
/// field. An abort signal on the init cannot cross the channel and is
/// dropped. The body's implied content type is made explicit unless the
/// caller set one.
pub fn normalize_request(request: Option<RequestParts>, init: RequestParts) -> FetchOptions {
    if init.has_signal {
        warn!(target: TARGET, "AbortSignal is not supported in proxy mode; ignoring it");
    }
    let request = request.unwrap_or_default();
    let (body, body_type) = match init.body {
        Some(body) => (Some(body), init.body_type),
        None => (request.body, request.body_type),
    };
    let mut headers = init.headers.or(request.headers).unwrap_or_default();
    if let (Some(_), Some(kind)) = (&body, body_type) {
        set_content_type(&mut headers, kind);
    }

    FetchOptions {
        method: init
            .method
            .or(request.method)
            .unwrap_or_else(|| "GET".to_owned()),
        headers,
        body,
        mode: init.mode.or(request.mode),
        credentials: init.credentials.or(request.credentials),
        cache: init.cache.or(request.cache),
        redirect: init.redirect.or(request.redirect),
        referrer: init.referrer.or(request.referrer),
        referrer_policy: init.referrer_policy.or(request.referrer_policy),
        integrity: init.integrity.or(request.integrity),
        keepalive: init.keepalive.or(request.keepalive),
    }
}

/// Add `content-type` unless a header of that name exists in any case.
fn set_content_type(headers: &mut Headers, kind: String) {
    if !headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("content-type"))
    {
        headers.insert("content-type".to_owned(), kind);
    }
}

/// A fully-read response, as handed back to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Body,
    pub url: String,
    pub redirected: bool,
    pub response_type: ResponseType,
}

impl ProxiedResponse {
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn into_wire(self, id: String) -> FetchResponse {
        FetchResponse {
            id,
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            body: self.body,
            url: self.url,
            response_type: self.response_type,
            redirected: self.redirected,
        }
    }
}

impl From<FetchResponse> for ProxiedResponse {
    fn from(wire: FetchResponse) -> Self {
        Self {
            status: wire.status,
            status_text: wire.status_text,
            headers: wire.headers,
            body: wire.body,
            url: wire.url,
            redirected: wire.redirected,
            response_type: wire.response_type,
        }
    }
}

type Reply = oneshot::Sender<Result<ProxiedResponse, ProxyError>>;

/// Slave side: ships requests to the master and matches the answers.
///
/// Requests stay pending until a `fetch-response` or `fetch-error` with
/// the same id arrives. There is no timeout. Dropping the proxy fails
/// every outstanding request with [`ProxyError::Abandoned`].
pub struct FetchProxy {
    channel: Rc<SyncChannel>,
    pending: RefCell<HashMap<String, Reply>>,
}

impl FetchProxy {
    pub fn new(channel: Rc<SyncChannel>) -> Self {
        Self {
            channel,
            pending: RefCell::new(HashMap::new()),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Publish the request now; the returned future resolves once the
    /// master answers.
    pub fn fetch(
        &self,
        url: impl Into<String>,
        options: FetchOptions,
    ) -> impl Future<Output = Result<ProxiedResponse, ProxyError>> + 'static {
        let registered = self.register(url.into(), options);
        async move {
            let reply = registered?;
            reply.await.unwrap_or(Err(ProxyError::Abandoned))
        }
    }

    fn register(
        &self,
        url: String,
        options: FetchOptions,
    ) -> Result<oneshot::Receiver<Result<ProxiedResponse, ProxyError>>, ProxyError> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = self.pending.borrow_mut();
            let id = loop {
                let candidate = short_id();
                if !pending.contains_key(&candidate) {
                    break candidate;
                }
            };
            pending.insert(id.clone(), tx);
            id
        };

        debug!(target: TARGET, %id, %url, method = %options.method, "proxying request");
        let message = SyncMessage::FetchRequest(FetchRequest {
            id: id.clone(),
            url,
            options,
        });
        if let Err(e) = self.channel.publish(&message) {
            self.pending.borrow_mut().remove(&id);
            return Err(e.into());
        }
        Ok(rx)
    }

    /// Settle the pending request a message answers. Returns whether the
    /// message belonged to this proxy.
    pub fn handle(&self, message: &SyncMessage) -> bool {
        let id = match message {
            SyncMessage::FetchResponse(resp) => &resp.id,
            SyncMessage::FetchError { id, .. } => id,
            _ => return false,
        };
        let Some(reply) = self.pending.borrow_mut().remove(id) else {
            return false;
        };

        let outcome = match message {
            SyncMessage::FetchResponse(resp) => Ok(ProxiedResponse::from(resp.clone())),
            SyncMessage::FetchError { error, .. } => Err(ProxyError::Remote(error.clone())),
            _ => return false,
        };
        if reply.send(outcome).is_err() {
            debug!(target: TARGET, %id, "caller dropped the request before it settled");
        }
        true
    }
}

impl Drop for FetchProxy {
    fn drop(&mut self) {
        for (_, reply) in self.pending.get_mut().drain() {
            let _ = reply.send(Err(ProxyError::Abandoned));
        }
    }
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(ID_LEN);
    id
}

/// The real network, as seen by the master.
#[allow(async_fn_in_trait)]
pub trait FetchExecutor {
    /// Perform the request and read the whole body. Errors are plain
    /// messages forwarded verbatim to the requesting slave.
    async fn execute(&self, url: &str, options: &FetchOptions) -> Result<ProxiedResponse, String>;
}

/// Master side: executes slave requests and publishes the outcome.
pub struct FetchRelay<E> {
    channel: Rc<SyncChannel>,
    executor: Rc<E>,
    spawner: Spawner,
}

impl<E: FetchExecutor + 'static> FetchRelay<E> {
    pub fn new(channel: Rc<SyncChannel>, executor: E, spawner: Spawner) -> Self {
        Self {
            channel,
            executor: Rc::new(executor),
            spawner,
        }
    }

    pub fn handle(&self, message: &SyncMessage) -> bool {
        let SyncMessage::FetchRequest(request) = message else {
            return false;
        };
        let channel = Rc::clone(&self.channel);
        let executor = Rc::clone(&self.executor);
        let request = request.clone();
        (self.spawner)(Box::pin(async move {
            let FetchRequest { id, url, options } = request;
            let reply = match executor.execute(&url, &options).await {
                Ok(response) => SyncMessage::FetchResponse(response.into_wire(id)),
                Err(error) => {
                    debug!(target: TARGET, %id, %url, "request failed: {error}");
                    SyncMessage::FetchError { id, error }
                }
            };
            if let Err(e) = channel.publish(&reply) {
                warn!(target: TARGET, "failed to publish fetch result: {e}");
            }
        }));
        true
    }
}
