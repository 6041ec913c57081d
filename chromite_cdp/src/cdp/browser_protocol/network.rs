//! The `Network` domain: request/response tracking and the request
//! interception surface.

use serde::{Deserialize, Serialize};

use super::page::FrameId;

string_id! {
    /// Unique loader identifier.
    LoaderId
}

string_id! {
    /// Unique request identifier.
    RequestId
}

string_id! {
    /// Unique intercepted request identifier.
    InterceptionId
}

/// Request / response headers as keys / values of a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Headers(serde_json::Value);

impl Headers {
    pub fn new(headers: serde_json::Value) -> Self {
        Self(headers)
    }

    pub fn inner(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Resource type as it was perceived by the rendering engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    Prefetch,
    EventSource,
    WebSocket,
    Manifest,
    SignedExchange,
    Ping,
    #[serde(rename = "CSPViolationReport")]
    CspViolationReport,
    Preflight,
    Other,
}

impl AsRef<str> for ResourceType {
    fn as_ref(&self) -> &str {
        match self {
            ResourceType::Document => "Document",
            ResourceType::Stylesheet => "Stylesheet",
            ResourceType::Image => "Image",
            ResourceType::Media => "Media",
            ResourceType::Font => "Font",
            ResourceType::Script => "Script",
            ResourceType::TextTrack => "TextTrack",
            ResourceType::Xhr => "XHR",
            ResourceType::Fetch => "Fetch",
            ResourceType::Prefetch => "Prefetch",
            ResourceType::EventSource => "EventSource",
            ResourceType::WebSocket => "WebSocket",
            ResourceType::Manifest => "Manifest",
            ResourceType::SignedExchange => "SignedExchange",
            ResourceType::Ping => "Ping",
            ResourceType::CspViolationReport => "CSPViolationReport",
            ResourceType::Preflight => "Preflight",
            ResourceType::Other => "Other",
        }
    }
}

/// Network level fetch failure reason.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReason {
    Failed,
    Aborted,
    TimedOut,
    AccessDenied,
    ConnectionClosed,
    ConnectionReset,
    ConnectionRefused,
    ConnectionAborted,
    ConnectionFailed,
    NameNotResolved,
    InternetDisconnected,
    AddressUnreachable,
    BlockedByClient,
    BlockedByResponse,
}

/// HTTP request data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request URL (without fragment).
    pub url: String,
    /// Fragment of the requested URL starting with hash, if present.
    pub url_fragment: Option<String>,
    /// HTTP request method.
    pub method: String,
    /// HTTP request headers.
    pub headers: Headers,
    /// HTTP POST request data.
    pub post_data: Option<String>,
    /// True when the request has POST data.
    pub has_post_data: Option<bool>,
    /// Priority of the resource request at the time request is sent.
    pub initial_priority: Option<String>,
    /// The referrer policy of the request.
    pub referrer_policy: Option<String>,
    /// Whether is loaded via link preload.
    pub is_link_preload: Option<bool>,
}

/// Security details about a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDetails {
    /// Protocol name (e.g. "TLS 1.2" or "QUIC").
    pub protocol: String,
    /// Key Exchange used by the connection.
    pub key_exchange: String,
    /// Cipher name.
    pub cipher: String,
    /// Certificate subject name.
    pub subject_name: String,
    /// Name of the issuing CA.
    pub issuer: String,
    /// Certificate valid from date.
    pub valid_from: Option<f64>,
    /// Certificate valid to (expiration) date.
    pub valid_to: Option<f64>,
}

/// HTTP response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Response URL. This URL can be different from CachedResource.url in
    /// case of redirect.
    pub url: String,
    /// HTTP response status code.
    pub status: i64,
    /// HTTP response status text.
    pub status_text: String,
    /// HTTP response headers.
    pub headers: Headers,
    /// Resource mimeType as determined by the browser.
    pub mime_type: Option<String>,
    /// Refined HTTP request headers that were actually transmitted over the
    /// network.
    pub request_headers: Option<Headers>,
    /// Remote IP address.
    pub remote_ip_address: Option<String>,
    /// Remote port.
    pub remote_port: Option<i64>,
    /// Specifies that the request was served from the disk cache.
    pub from_disk_cache: Option<bool>,
    /// Specifies that the request was served from the ServiceWorker.
    pub from_service_worker: Option<bool>,
    /// Total number of bytes received for this request so far.
    pub encoded_data_length: Option<f64>,
    /// Protocol used to fetch this request.
    pub protocol: Option<String>,
    /// Security details for the request.
    pub security_details: Option<SecurityDetails>,
}

/// Information about the request initiator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    pub r#type: String,
    pub url: Option<String>,
    pub line_number: Option<f64>,
}

/// Authorization challenge for HTTP status code 401 or 407.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    /// Source of the authentication challenge.
    pub source: Option<String>,
    /// Origin of the challenger.
    pub origin: String,
    /// The authentication scheme used, such as basic or digest.
    pub scheme: String,
    /// The realm of the challenge. May be empty.
    pub realm: String,
}

/// The decision on what to do in response to an [`AuthChallenge`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChallengeResponseResponse {
    Default,
    CancelAuth,
    ProvideCredentials,
}

/// Response to an [`AuthChallenge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallengeResponse {
    /// The decision on what to do in response to the authorization challenge.
    pub response: AuthChallengeResponseResponse,
    /// The username to provide, possibly empty. Should only be set if
    /// response is `ProvideCredentials`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// The password to provide, possibly empty. Should only be set if
    /// response is `ProvideCredentials`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AuthChallengeResponse {
    pub fn new(response: AuthChallengeResponseResponse) -> Self {
        Self {
            response,
            username: None,
            password: None,
        }
    }
}

/// Request pattern for interception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    /// Wildcards (`'*'` -> zero or more, `'?'` -> exactly one) are allowed.
    /// Escape character is backslash. Omitting is equivalent to `"*"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
}

impl RequestPattern {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: Some(url_pattern.into()),
            resource_type: None,
        }
    }
}

/// Enables network tracking, network events will now be delivered to the
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resource_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_post_data_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableReturns {}

impl_command!(EnableParams, "Network.enable", EnableReturns);

/// Toggles ignoring cache for each request. If `true`, cache will not be
/// used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCacheDisabledParams {
    /// Cache disabled state.
    pub cache_disabled: bool,
}

impl SetCacheDisabledParams {
    pub fn new(cache_disabled: bool) -> Self {
        Self { cache_disabled }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetCacheDisabledReturns {}

impl_command!(SetCacheDisabledParams, "Network.setCacheDisabled", SetCacheDisabledReturns);

/// Sets the requests to intercept that match the provided patterns and
/// optionally resource types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRequestInterceptionParams {
    /// Requests matching any of these patterns will be paused until the
    /// client responds with a `continueInterceptedRequest` call.
    pub patterns: Vec<RequestPattern>,
}

impl SetRequestInterceptionParams {
    pub fn new(patterns: Vec<RequestPattern>) -> Self {
        Self { patterns }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetRequestInterceptionReturns {}

impl_command!(
    SetRequestInterceptionParams,
    "Network.setRequestInterception",
    SetRequestInterceptionReturns
);

/// Response to `Network.requestIntercepted` which either modifies the request
/// to continue with any modifications, or blocks it, or completes it with the
/// provided response bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueInterceptedRequestParams {
    pub interception_id: InterceptionId,
    /// If set this causes the request to fail with the given reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
    /// If set the requests completes using with the provided base64 encoded
    /// raw response, including HTTP status line and headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<chromite_types::Binary>,
    /// If set the request url will be modified in a way that's not observable
    /// by page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// If set this allows the request method to be overridden.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// If set this allows postData to be set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
    /// If set this allows the request headers to be changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    /// Response to a requestIntercepted with an authChallenge. Must not be
    /// set otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_challenge_response: Option<AuthChallengeResponse>,
}

impl ContinueInterceptedRequestParams {
    pub fn new(interception_id: impl Into<InterceptionId>) -> Self {
        Self {
            interception_id: interception_id.into(),
            error_reason: None,
            raw_response: None,
            url: None,
            method: None,
            post_data: None,
            headers: None,
            auth_challenge_response: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContinueInterceptedRequestReturns {}

impl_command!(
    ContinueInterceptedRequestParams,
    "Network.continueInterceptedRequest",
    ContinueInterceptedRequestReturns
);

/// Activates emulation of network conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulateNetworkConditionsParams {
    /// True to emulate internet disconnection.
    pub offline: bool,
    /// Minimum latency from request sent to response headers received (ms).
    pub latency: f64,
    /// Maximal aggregated download throughput (bytes/sec). -1 disables
    /// download throttling.
    pub download_throughput: f64,
    /// Maximal aggregated upload throughput (bytes/sec). -1 disables upload
    /// throttling.
    pub upload_throughput: f64,
}

impl EmulateNetworkConditionsParams {
    pub fn new(offline: bool) -> Self {
        Self {
            offline,
            latency: 0.,
            download_throughput: -1.,
            upload_throughput: -1.,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmulateNetworkConditionsReturns {}

impl_command!(
    EmulateNetworkConditionsParams,
    "Network.emulateNetworkConditions",
    EmulateNetworkConditionsReturns
);

/// Specifies whether to always send extra HTTP headers with the requests from
/// this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExtraHttpHeadersParams {
    /// Map with extra HTTP headers.
    pub headers: Headers,
}

impl SetExtraHttpHeadersParams {
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetExtraHttpHeadersReturns {}

impl_command!(
    SetExtraHttpHeadersParams,
    "Network.setExtraHTTPHeaders",
    SetExtraHttpHeadersReturns
);

/// Allows overriding user agent with the given string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideParams {
    /// User agent to use.
    pub user_agent: String,
    /// Browser language to emulate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    /// The platform navigator.platform should return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl SetUserAgentOverrideParams {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: None,
            platform: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideReturns {}

impl_command!(
    SetUserAgentOverrideParams,
    "Network.setUserAgentOverride",
    SetUserAgentOverrideReturns
);

/// Returns content served for the given request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyParams {
    /// Identifier of the network request to get content for.
    pub request_id: RequestId,
}

impl GetResponseBodyParams {
    pub fn new(request_id: impl Into<RequestId>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponseBodyReturns {
    /// Response body.
    pub body: String,
    /// True, if content was sent as base64.
    pub base64_encoded: bool,
}

impl_command!(GetResponseBodyParams, "Network.getResponseBody", GetResponseBodyReturns);

/// Fired when page is about to send HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestWillBeSent {
    /// Request identifier.
    pub request_id: RequestId,
    /// Loader identifier. Empty string if the request is fetched from worker.
    pub loader_id: LoaderId,
    /// URL of the document this request is loaded for.
    pub document_url: String,
    /// Request data.
    pub request: Request,
    /// Timestamp.
    pub timestamp: Option<f64>,
    /// Request initiator.
    pub initiator: Option<Initiator>,
    /// Redirect response data, only set for requests finalizing a redirect.
    pub redirect_response: Option<Response>,
    /// Type of this resource.
    pub r#type: Option<ResourceType>,
    /// Frame identifier.
    pub frame_id: Option<FrameId>,
    /// Whether the request is initiated by a user gesture.
    pub has_user_gesture: Option<bool>,
}

impl_event!(EventRequestWillBeSent, "Network.requestWillBeSent");

/// Details of an intercepted HTTP request, which must be either allowed,
/// blocked, modified or mocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestIntercepted {
    /// Each request the page makes will have a unique id, however if any
    /// redirects are encountered while processing that fetch, they will be
    /// reported with the same id as the original fetch.
    pub interception_id: InterceptionId,
    pub request: Request,
    /// The id of the frame that initiated the request.
    pub frame_id: FrameId,
    /// How the requested resource will be used.
    pub resource_type: ResourceType,
    /// Whether this is a navigation request, which can abort the navigation
    /// completely.
    pub is_navigation_request: bool,
    /// Set if the request is a navigation that will result in a download.
    pub is_download: Option<bool>,
    /// Redirect location, only sent if a redirect was intercepted.
    pub redirect_url: Option<String>,
    /// Details of the Authorization Challenge encountered. If this is set the
    /// client should respond with continueRequest that contains
    /// AuthChallengeResponse.
    pub auth_challenge: Option<AuthChallenge>,
    /// Response error if intercepted at response stage or if redirect
    /// occurred while intercepting request.
    pub response_error_reason: Option<ErrorReason>,
    /// Response code if intercepted at response stage or if redirect occurred
    /// while intercepting request or auth retry occurred.
    pub response_status_code: Option<i64>,
    /// Response headers if intercepted at the response stage or if redirect
    /// occurred while intercepting request or auth retry occurred.
    pub response_headers: Option<Headers>,
    /// If the intercepted request had a corresponding requestWillBeSent event
    /// fired for it, then this requestId will be the same as the requestId
    /// present in the requestWillBeSent event.
    pub request_id: Option<RequestId>,
}

impl_event!(EventRequestIntercepted, "Network.requestIntercepted");

/// Fired if request ended up loading from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestServedFromCache {
    /// Request identifier.
    pub request_id: RequestId,
}

impl_event!(EventRequestServedFromCache, "Network.requestServedFromCache");

/// Fired when HTTP response is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseReceived {
    /// Request identifier.
    pub request_id: RequestId,
    /// Loader identifier. Empty string if the request is fetched from worker.
    pub loader_id: LoaderId,
    /// Timestamp.
    pub timestamp: Option<f64>,
    /// Resource type.
    pub r#type: ResourceType,
    /// Response data.
    pub response: Response,
    /// Frame identifier.
    pub frame_id: Option<FrameId>,
}

impl_event!(EventResponseReceived, "Network.responseReceived");

/// Fired when HTTP request has finished loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFinished {
    /// Request identifier.
    pub request_id: RequestId,
    /// Timestamp.
    pub timestamp: Option<f64>,
    /// Total number of bytes received for this request.
    pub encoded_data_length: Option<f64>,
}

impl_event!(EventLoadingFinished, "Network.loadingFinished");

/// Fired when HTTP request has failed to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFailed {
    /// Request identifier.
    pub request_id: RequestId,
    /// Timestamp.
    pub timestamp: Option<f64>,
    /// Resource type.
    pub r#type: Option<ResourceType>,
    /// User friendly error message.
    pub error_text: String,
    /// True if loading was canceled.
    pub canceled: Option<bool>,
    /// The reason why loading was blocked, if any.
    pub blocked_reason: Option<String>,
}

impl_event!(EventLoadingFailed, "Network.loadingFailed");
