use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chromite_cdp::cdp::browser_protocol::network::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueInterceptedRequestParams,
    EmulateNetworkConditionsParams, EnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestIntercepted, EventRequestServedFromCache, EventRequestWillBeSent,
    EventResponseReceived, Headers, InterceptionId, Request as CdpRequest, RequestId,
    RequestPattern, ResourceType, Response as CdpResponse, SecurityDetails,
    SetCacheDisabledParams, SetExtraHttpHeadersParams, SetRequestInterceptionParams,
};
use chromite_cdp::cdp::browser_protocol::page::FrameId;
use chromite_cdp::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromite_types::{Command, Method, MethodId};

use crate::cmd::CommandChain;
use crate::handler::REQUEST_TIMEOUT;
use crate::utils::MultiMap;

/// Basic auth credentials offered on auth challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Headers whose value differs between the two halves of an interception
/// pair and therefore must not participate in the correlation hash.
const HASH_IGNORED_HEADERS: [&str; 5] = [
    "accept",
    "referer",
    "x-devtools-emulate-network-conditions-client-id",
    "cookie",
    "user-agent",
];

/// The content-derived key used to correlate a `requestWillBeSent` event with
/// its `requestIntercepted` twin.
fn request_hash(request: &CdpRequest) -> String {
    let mut headers: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    if let Some(object) = request.headers.inner().as_object() {
        for (name, value) in object {
            let name = name.to_ascii_lowercase();
            if HASH_IGNORED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            headers.insert(name, value.clone());
        }
    }
    serde_json::json!({
        "url": request.url,
        "method": request.method,
        "postData": request.post_data,
        "headers": headers,
    })
    .to_string()
}

/// The state of one HTTP request tracked by the [`NetworkManager`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Protocol request id. `None` until an interception-created request has
    /// been paired with its `requestWillBeSent` event.
    pub request_id: Option<RequestId>,
    /// Identifier of the paused request while interception is active.
    pub interception_id: Option<InterceptionId>,
    /// The frame that issued the request.
    pub frame: Option<FrameId>,
    /// Whether this request is the document load of its frame.
    pub is_navigation_request: bool,
    /// Whether user level interception was enabled when this request started.
    pub allow_interception: bool,
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub post_data: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub from_memory_cache: bool,
    pub failure_text: Option<String>,
    pub response: Option<HttpResponse>,
    /// Requests that redirected to this one, oldest first.
    pub redirect_chain: Vec<HttpRequest>,
}

impl HttpRequest {
    fn new(
        request_id: Option<RequestId>,
        frame: Option<FrameId>,
        interception_id: Option<InterceptionId>,
        allow_interception: bool,
        redirect_chain: Vec<HttpRequest>,
    ) -> Self {
        Self {
            request_id,
            interception_id,
            frame,
            is_navigation_request: false,
            allow_interception,
            url: Default::default(),
            method: Default::default(),
            headers: Default::default(),
            post_data: None,
            resource_type: None,
            from_memory_cache: false,
            failure_text: None,
            response: None,
            redirect_chain,
        }
    }

    fn apply_request(&mut self, request: &CdpRequest) {
        self.url.clone_from(&request.url);
        self.method.clone_from(&request.method);
        self.headers.clone_from(&request.headers);
        self.post_data.clone_from(&request.post_data);
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn redirect_chain(&self) -> &[HttpRequest] {
        &self.redirect_chain
    }
}

/// The response attached to an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    inner: CdpResponse,
    /// Redirect responses never expose a body.
    body_unavailable: bool,
}

impl HttpResponse {
    pub(crate) fn new(inner: CdpResponse) -> Self {
        Self {
            inner,
            body_unavailable: false,
        }
    }

    /// A response that finalized a redirect hop. Its body can never be
    /// retrieved.
    pub(crate) fn redirect(inner: CdpResponse) -> Self {
        Self {
            inner,
            body_unavailable: true,
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn status(&self) -> i64 {
        self.inner.status
    }

    pub fn status_text(&self) -> &str {
        &self.inner.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    pub fn from_disk_cache(&self) -> bool {
        self.inner.from_disk_cache.unwrap_or_default()
    }

    pub fn from_service_worker(&self) -> bool {
        self.inner.from_service_worker.unwrap_or_default()
    }

    pub fn security_details(&self) -> Option<&SecurityDetails> {
        self.inner.security_details.as_ref()
    }

    /// Whether any attempt to load the body must fail, which is the case for
    /// redirect responses.
    pub fn body_unavailable(&self) -> bool {
        self.body_unavailable
    }

    pub fn inner(&self) -> &CdpResponse {
        &self.inner
    }
}

/// Tracks the request lifecycle of one target, including interception,
/// authentication and redirect chains.
#[derive(Debug)]
pub struct NetworkManager {
    queued_events: VecDeque<NetworkEvent>,
    ignore_https_errors: bool,
    request_timeout: Duration,
    /// Requests by their protocol request id, from start until their
    /// lifecycle is terminal
    requests: HashMap<RequestId, HttpRequest>,
    /// Requests created by interception that have not been paired with a
    /// `requestWillBeSent` yet, by interception id
    intercepted_requests: HashMap<InterceptionId, HttpRequest>,
    /// `requestWillBeSent` events waiting for their interception twin
    requests_will_be_sent: HashMap<RequestId, EventRequestWillBeSent>,
    /// Pending `requestWillBeSent` halves, by correlation hash
    request_hash_to_request_ids: MultiMap<String, RequestId>,
    /// Pending `requestIntercepted` halves, by correlation hash
    request_hash_to_interception_ids: MultiMap<String, InterceptionId>,
    /// Index from interception id to the request id it was paired with
    interception_to_request: HashMap<InterceptionId, RequestId>,
    /// Interception ids credentials have already been offered for
    attempted_authentications: HashSet<InterceptionId>,
    extra_headers: HashMap<String, String>,
    credentials: Option<Credentials>,
    user_request_interception_enabled: bool,
    protocol_request_interception_enabled: bool,
    user_cache_disabled: bool,
    offline: bool,
}

impl NetworkManager {
    pub fn new(ignore_https_errors: bool, request_timeout: Duration) -> Self {
        Self {
            queued_events: Default::default(),
            ignore_https_errors,
            request_timeout,
            requests: Default::default(),
            intercepted_requests: Default::default(),
            requests_will_be_sent: Default::default(),
            request_hash_to_request_ids: Default::default(),
            request_hash_to_interception_ids: Default::default(),
            interception_to_request: Default::default(),
            attempted_authentications: Default::default(),
            extra_headers: Default::default(),
            credentials: None,
            user_request_interception_enabled: false,
            protocol_request_interception_enabled: false,
            user_cache_disabled: false,
            offline: false,
        }
    }

    /// The commands to execute in order to initialize this network manager
    pub fn init_commands(&self) -> CommandChain {
        let enable = EnableParams::default();
        let mut cmds = Vec::with_capacity(2);
        if let Ok(params) = serde_json::to_value(&enable) {
            cmds.push((enable.identifier(), params));
        }
        if self.ignore_https_errors {
            let ignore = SetIgnoreCertificateErrorsParams::new(true);
            if let Ok(params) = serde_json::to_value(&ignore) {
                cmds.push((ignore.identifier(), params));
            }
        }
        CommandChain::new(cmds, self.request_timeout)
    }

    fn push_cdp_request<T: Command>(&mut self, cmd: T) {
        let method = cmd.identifier();
        if let Ok(params) = serde_json::to_value(cmd) {
            self.queued_events
                .push_back(NetworkEvent::SendCdpRequest(method, params));
        }
    }

    /// The next event to process
    pub fn poll(&mut self) -> Option<NetworkEvent> {
        self.queued_events.pop_front()
    }

    pub fn extra_headers(&self) -> &HashMap<String, String> {
        &self.extra_headers
    }

    /// Header names are lower-cased before they are transmitted.
    pub fn set_extra_headers(&mut self, headers: HashMap<String, String>) {
        self.extra_headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        if let Ok(headers) = serde_json::to_value(&self.extra_headers) {
            self.push_cdp_request(SetExtraHttpHeadersParams::new(Headers::new(headers)));
        }
    }

    pub fn request_interception_enabled(&self) -> bool {
        self.user_request_interception_enabled
    }

    pub fn set_request_interception(&mut self, enabled: bool) {
        self.user_request_interception_enabled = enabled;
        self.update_protocol_request_interception();
    }

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.user_cache_disabled = !enabled;
        self.update_protocol_cache_disabled();
    }

    pub fn authenticate(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
        self.update_protocol_request_interception()
    }

    pub fn set_offline_mode(&mut self, value: bool) {
        if self.offline == value {
            return;
        }
        self.offline = value;
        self.push_cdp_request(EmulateNetworkConditionsParams::new(self.offline));
    }

    fn update_protocol_cache_disabled(&mut self) {
        self.push_cdp_request(SetCacheDisabledParams::new(
            self.user_cache_disabled || self.protocol_request_interception_enabled,
        ));
    }

    fn update_protocol_request_interception(&mut self) {
        let enabled = self.user_request_interception_enabled || self.credentials.is_some();
        if enabled == self.protocol_request_interception_enabled {
            return;
        }
        self.protocol_request_interception_enabled = enabled;
        self.update_protocol_cache_disabled();

        let patterns = if enabled {
            vec![RequestPattern::new("*")]
        } else {
            Vec::new()
        };
        self.push_cdp_request(SetRequestInterceptionParams::new(patterns));
    }

    /// Request interception does not happen for data urls.
    pub fn on_request_will_be_sent(&mut self, event: &EventRequestWillBeSent) {
        if self.protocol_request_interception_enabled && !event.request.url.starts_with("data:") {
            let hash = request_hash(&event.request);
            if let Some(interception_id) = self
                .request_hash_to_interception_ids
                .first_value(&hash)
                .cloned()
            {
                self.request_hash_to_interception_ids
                    .delete(&hash, &interception_id);
                self.on_request(event, Some(interception_id));
            } else {
                self.request_hash_to_request_ids
                    .add(hash, event.request_id.clone());
                self.requests_will_be_sent
                    .insert(event.request_id.clone(), event.clone());
            }
        } else {
            self.on_request(event, None);
        }
    }

    pub fn on_request_intercepted(&mut self, event: &EventRequestIntercepted) {
        if let Some(challenge) = event.auth_challenge.as_ref() {
            tracing::debug!(origin = %challenge.origin, "auth challenge intercepted");
            self.respond_to_auth_challenge(event);
            return;
        }
        // interception that is only enabled to answer auth challenges is
        // transparent to the caller
        if !self.user_request_interception_enabled && self.protocol_request_interception_enabled {
            self.push_cdp_request(ContinueInterceptedRequestParams::new(
                event.interception_id.clone(),
            ));
        }

        if let Some(redirect_url) = event.redirect_url.clone() {
            self.on_intercepted_redirect(event, redirect_url);
            return;
        }

        let hash = request_hash(&event.request);
        if let Some(request_id) = self.request_hash_to_request_ids.first_value(&hash).cloned() {
            self.request_hash_to_request_ids.delete(&hash, &request_id);
            if let Some(will_be_sent) = self.requests_will_be_sent.remove(&request_id) {
                self.on_request(&will_be_sent, Some(event.interception_id.clone()));
            }
        } else {
            // the interception arrived first, track the request under its
            // interception id until the protocol assigns a request id
            self.request_hash_to_interception_ids
                .add(hash, event.interception_id.clone());
            let mut request = HttpRequest::new(
                None,
                Some(event.frame_id.clone()),
                Some(event.interception_id.clone()),
                self.user_request_interception_enabled,
                Vec::new(),
            );
            request.apply_request(&event.request);
            request.resource_type = Some(event.resource_type);
            request.is_navigation_request = event.is_navigation_request;
            let snapshot = Arc::new(request.clone());
            self.intercepted_requests
                .insert(event.interception_id.clone(), request);
            self.queued_events.push_back(NetworkEvent::Request(snapshot));
        }
    }

    /// An intercepted request was answered with a redirect: finalize the
    /// current hop and start the next one under the same identifiers.
    fn on_intercepted_redirect(&mut self, event: &EventRequestIntercepted, redirect_url: String) {
        let mut previous = self.intercepted_requests.remove(&event.interception_id);
        if previous.is_none() {
            if let Some(request_id) = self.interception_to_request.get(&event.interception_id) {
                let request_id = request_id.clone();
                previous = self.requests.remove(&request_id);
            }
        }
        let Some(previous) = previous else {
            tracing::debug!(interception = %event.interception_id, "redirect for unknown interception dropped");
            return;
        };

        let request_id = previous.request_id.clone();
        let response = CdpResponse {
            url: previous.url.clone(),
            status: event.response_status_code.unwrap_or_default(),
            status_text: String::new(),
            headers: event.response_headers.clone().unwrap_or_default(),
            mime_type: None,
            request_headers: None,
            remote_ip_address: None,
            remote_port: None,
            from_disk_cache: None,
            from_service_worker: None,
            encoded_data_length: None,
            protocol: None,
            security_details: None,
        };
        let redirect_chain = self.handle_request_redirect(previous, HttpResponse::redirect(response));

        let mut next = HttpRequest::new(
            request_id.clone(),
            Some(event.frame_id.clone()),
            Some(event.interception_id.clone()),
            self.user_request_interception_enabled,
            redirect_chain,
        );
        next.apply_request(&event.request);
        next.url = redirect_url;
        next.resource_type = Some(event.resource_type);
        next.is_navigation_request = event.is_navigation_request;

        let snapshot = Arc::new(next.clone());
        if let Some(request_id) = request_id {
            self.interception_to_request
                .insert(event.interception_id.clone(), request_id.clone());
            self.requests.insert(request_id, next);
        } else {
            self.intercepted_requests
                .insert(event.interception_id.clone(), next);
        }
        self.queued_events.push_back(NetworkEvent::Request(snapshot));
    }

    fn respond_to_auth_challenge(&mut self, event: &EventRequestIntercepted) {
        let response = if self
            .attempted_authentications
            .contains(&event.interception_id)
        {
            AuthChallengeResponseResponse::CancelAuth
        } else if self.credentials.is_some() {
            self.attempted_authentications
                .insert(event.interception_id.clone());
            AuthChallengeResponseResponse::ProvideCredentials
        } else {
            AuthChallengeResponseResponse::Default
        };

        let mut auth = AuthChallengeResponse::new(response);
        if response == AuthChallengeResponseResponse::ProvideCredentials {
            if let Some(credentials) = self.credentials.clone() {
                auth.username = Some(credentials.username);
                auth.password = Some(credentials.password);
            }
        }
        let mut params = ContinueInterceptedRequestParams::new(event.interception_id.clone());
        params.auth_challenge_response = Some(auth);
        // the response to this command is ignored by the handler, the target
        // may already be gone when it arrives
        self.push_cdp_request(params);
    }

    pub fn on_request_served_from_cache(&mut self, event: &EventRequestServedFromCache) {
        if let Some(request) = self.requests.get_mut(&event.request_id) {
            request.from_memory_cache = true;
        }
    }

    pub fn on_response_received(&mut self, event: &EventResponseReceived) {
        if let Some(request) = self.requests.get_mut(&event.request_id) {
            request.response = Some(HttpResponse::new(event.response.clone()));
            self.queued_events
                .push_back(NetworkEvent::Response(Arc::new(request.clone())));
        }
    }

    pub fn on_loading_finished(&mut self, event: &EventLoadingFinished) {
        if let Some(request) = self.requests.remove(&event.request_id) {
            self.forget_interception_state(&request);
            self.queued_events
                .push_back(NetworkEvent::RequestFinished(Arc::new(request)));
        }
    }

    pub fn on_loading_failed(&mut self, event: &EventLoadingFailed) {
        if let Some(mut request) = self.requests.remove(&event.request_id) {
            request.failure_text = Some(event.error_text.clone());
            self.forget_interception_state(&request);
            self.queued_events
                .push_back(NetworkEvent::RequestFailed(Arc::new(request)));
        }
    }

    fn forget_interception_state(&mut self, request: &HttpRequest) {
        if let Some(interception_id) = request.interception_id.as_ref() {
            self.attempted_authentications.remove(interception_id);
            self.interception_to_request.remove(interception_id);
        }
    }

    fn on_request(
        &mut self,
        event: &EventRequestWillBeSent,
        interception_id: Option<InterceptionId>,
    ) {
        let mut redirect_chain = Vec::new();
        if let Some(redirect_response) = event.redirect_response.as_ref() {
            // this event finalizes the previous hop carried under the same id
            if let Some(request) = self.requests.remove(&event.request_id) {
                redirect_chain = self
                    .handle_request_redirect(request, HttpResponse::redirect(redirect_response.clone()));
            }
        }

        let is_navigation = event.r#type == Some(ResourceType::Document)
            && event.request_id.as_ref() == event.loader_id.as_ref();

        if let Some(interception_id) = interception_id.as_ref() {
            // complete the request interception created before the protocol
            // assigned a request id
            if let Some(mut request) = self.intercepted_requests.remove(interception_id) {
                request.request_id = Some(event.request_id.clone());
                request.apply_request(&event.request);
                request.frame.clone_from(&event.frame_id);
                request.is_navigation_request = is_navigation;
                if request.redirect_chain.is_empty() {
                    request.redirect_chain = redirect_chain;
                }
                self.interception_to_request
                    .insert(interception_id.clone(), event.request_id.clone());
                self.requests.insert(event.request_id.clone(), request);
                return;
            }
        }

        let mut request = HttpRequest::new(
            Some(event.request_id.clone()),
            event.frame_id.clone(),
            interception_id.clone(),
            self.user_request_interception_enabled,
            redirect_chain,
        );
        request.apply_request(&event.request);
        request.resource_type = event.r#type;
        request.is_navigation_request = is_navigation;

        if let Some(interception_id) = interception_id {
            self.interception_to_request
                .insert(interception_id, event.request_id.clone());
        }
        let snapshot = Arc::new(request.clone());
        self.requests.insert(event.request_id.clone(), request);
        self.queued_events.push_back(NetworkEvent::Request(snapshot));
    }

    /// Attaches the redirect response to the finalized hop, emits its
    /// terminal events and returns the redirect chain extended by it.
    fn handle_request_redirect(
        &mut self,
        mut request: HttpRequest,
        response: HttpResponse,
    ) -> Vec<HttpRequest> {
        request.response = Some(response);
        if let Some(interception_id) = request.interception_id.as_ref() {
            self.attempted_authentications.remove(interception_id);
        }
        let mut chain = std::mem::take(&mut request.redirect_chain);
        let snapshot = Arc::new(request.clone());
        chain.push(request);
        self.queued_events
            .push_back(NetworkEvent::Response(Arc::clone(&snapshot)));
        self.queued_events
            .push_back(NetworkEvent::RequestFinished(snapshot));
        chain
    }
}

impl Default for NetworkManager {
    fn default() -> Self {
        NetworkManager::new(true, Duration::from_millis(REQUEST_TIMEOUT))
    }
}

#[derive(Debug)]
pub enum NetworkEvent {
    /// The manager needs this command sent to the browser. Failures of these
    /// sends are logged and swallowed.
    SendCdpRequest(MethodId, serde_json::Value),
    Request(Arc<HttpRequest>),
    Response(Arc<HttpRequest>),
    RequestFailed(Arc<HttpRequest>),
    RequestFinished(Arc<HttpRequest>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn will_be_sent(id: &str, url: &str) -> EventRequestWillBeSent {
        EventRequestWillBeSent {
            request_id: id.into(),
            loader_id: id.into(),
            document_url: url.to_string(),
            request: CdpRequest {
                url: url.to_string(),
                url_fragment: None,
                method: "GET".to_string(),
                headers: Headers::new(serde_json::json!({})),
                post_data: None,
                has_post_data: None,
                initial_priority: None,
                referrer_policy: None,
                is_link_preload: None,
            },
            timestamp: None,
            initiator: None,
            redirect_response: None,
            r#type: Some(ResourceType::Document),
            frame_id: Some("frame".into()),
            has_user_gesture: None,
        }
    }

    fn intercepted(id: &str, url: &str) -> EventRequestIntercepted {
        EventRequestIntercepted {
            interception_id: id.into(),
            request: CdpRequest {
                url: url.to_string(),
                url_fragment: None,
                method: "GET".to_string(),
                headers: Headers::new(serde_json::json!({})),
                post_data: None,
                has_post_data: None,
                initial_priority: None,
                referrer_policy: None,
                is_link_preload: None,
            },
            frame_id: "frame".into(),
            resource_type: ResourceType::Document,
            is_navigation_request: true,
            is_download: None,
            redirect_url: None,
            auth_challenge: None,
            response_error_reason: None,
            response_status_code: None,
            response_headers: None,
            request_id: None,
        }
    }

    fn response(url: &str, status: i64) -> CdpResponse {
        CdpResponse {
            url: url.to_string(),
            status,
            status_text: String::new(),
            headers: Headers::new(serde_json::json!({})),
            mime_type: None,
            request_headers: None,
            remote_ip_address: None,
            remote_port: None,
            from_disk_cache: None,
            from_service_worker: None,
            encoded_data_length: None,
            protocol: None,
            security_details: None,
        }
    }

    fn drain(manager: &mut NetworkManager) -> Vec<NetworkEvent> {
        let mut events = Vec::new();
        while let Some(ev) = manager.poll() {
            events.push(ev);
        }
        events
    }

    fn cdp_sends(events: &[NetworkEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|ev| match ev {
                NetworkEvent::SendCdpRequest(method, _) => Some(method.as_ref()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn successful_request_emits_ordered_events() {
        let mut nm = NetworkManager::default();
        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/"));
        nm.on_response_received(&EventResponseReceived {
            request_id: "r1".into(),
            loader_id: "r1".into(),
            timestamp: None,
            r#type: ResourceType::Document,
            response: response("http://example.com/", 200),
            frame_id: Some("frame".into()),
        });
        nm.on_loading_finished(&EventLoadingFinished {
            request_id: "r1".into(),
            timestamp: None,
            encoded_data_length: None,
        });

        let events = drain(&mut nm);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], NetworkEvent::Request(_)));
        match &events[1] {
            NetworkEvent::Response(req) => {
                assert_eq!(req.response().unwrap().status(), 200);
                assert!(req.is_navigation_request);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events[2], NetworkEvent::RequestFinished(_)));
        // terminal lifecycle removed the request from the id map
        assert!(nm.requests.is_empty());
    }

    #[test]
    fn failed_request_carries_error_text() {
        let mut nm = NetworkManager::default();
        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/"));
        nm.on_loading_failed(&EventLoadingFailed {
            request_id: "r1".into(),
            timestamp: None,
            r#type: None,
            error_text: "net::ERR_CONNECTION_REFUSED".to_string(),
            canceled: None,
            blocked_reason: None,
        });

        let events = drain(&mut nm);
        assert_eq!(events.len(), 2);
        match &events[1] {
            NetworkEvent::RequestFailed(req) => {
                assert_eq!(
                    req.failure_text.as_deref(),
                    Some("net::ERR_CONNECTION_REFUSED")
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_request_ids_are_dropped_silently() {
        let mut nm = NetworkManager::default();
        nm.on_response_received(&EventResponseReceived {
            request_id: "ghost".into(),
            loader_id: "ghost".into(),
            timestamp: None,
            r#type: ResourceType::Document,
            response: response("http://example.com/", 200),
            frame_id: None,
        });
        nm.on_loading_finished(&EventLoadingFinished {
            request_id: "ghost".into(),
            timestamp: None,
            encoded_data_length: None,
        });
        assert!(drain(&mut nm).is_empty());
    }

    #[test]
    fn served_from_cache_sets_flag_without_event() {
        let mut nm = NetworkManager::default();
        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/"));
        drain(&mut nm);

        nm.on_request_served_from_cache(&EventRequestServedFromCache {
            request_id: "r1".into(),
        });
        assert!(drain(&mut nm).is_empty());
        assert!(nm.requests.get("r1").unwrap().from_memory_cache);
    }

    #[test]
    fn interception_toggle_is_idempotent() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        let events = drain(&mut nm);
        assert_eq!(
            cdp_sends(&events),
            vec![
                "Network.setCacheDisabled",
                "Network.setRequestInterception"
            ]
        );

        nm.set_request_interception(true);
        assert!(drain(&mut nm).is_empty());

        nm.set_request_interception(false);
        let events = drain(&mut nm);
        assert_eq!(
            cdp_sends(&events),
            vec![
                "Network.setCacheDisabled",
                "Network.setRequestInterception"
            ]
        );
    }

    #[test]
    fn enabling_interception_sends_wildcard_pattern() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        let events = drain(&mut nm);
        let params = events
            .iter()
            .find_map(|ev| match ev {
                NetworkEvent::SendCdpRequest(method, params)
                    if method.as_ref() == "Network.setRequestInterception" =>
                {
                    Some(params.clone())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(params["patterns"][0]["urlPattern"], "*");

        nm.set_request_interception(false);
        let events = drain(&mut nm);
        let params = events
            .iter()
            .find_map(|ev| match ev {
                NetworkEvent::SendCdpRequest(method, params)
                    if method.as_ref() == "Network.setRequestInterception" =>
                {
                    Some(params.clone())
                }
                _ => None,
            })
            .unwrap();
        assert!(params["patterns"].as_array().unwrap().is_empty());
    }

    #[test]
    fn credentials_keep_protocol_interception_enabled() {
        let mut nm = NetworkManager::default();
        nm.authenticate(Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        });
        let events = drain(&mut nm);
        assert_eq!(
            cdp_sends(&events),
            vec![
                "Network.setCacheDisabled",
                "Network.setRequestInterception"
            ]
        );

        // disabling user interception while credentials are set keeps the
        // protocol toggle untouched
        nm.set_request_interception(false);
        assert!(drain(&mut nm).is_empty());
    }

    #[test]
    fn correlates_when_request_will_be_sent_arrives_first() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        drain(&mut nm);

        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/"));
        // no Request event until the interception twin arrives
        assert!(drain(&mut nm).is_empty());

        nm.on_request_intercepted(&intercepted("i1", "http://example.com/"));
        let events = drain(&mut nm);
        assert_eq!(events.len(), 1);
        match &events[0] {
            NetworkEvent::Request(req) => {
                assert_eq!(req.request_id().unwrap().as_ref(), "r1");
                assert_eq!(req.interception_id.as_ref().unwrap().as_ref(), "i1");
            }
            other => panic!("unexpected event {other:?}"),
        }
        // both pending multimaps drained
        assert!(nm.request_hash_to_request_ids.is_empty());
        assert!(nm.request_hash_to_interception_ids.is_empty());
        assert!(nm.intercepted_requests.is_empty());
        assert!(nm.requests.contains_key("r1"));
    }

    #[test]
    fn correlates_when_interception_arrives_first() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        drain(&mut nm);

        nm.on_request_intercepted(&intercepted("i1", "http://example.com/"));
        let events = drain(&mut nm);
        assert_eq!(events.len(), 1);
        match &events[0] {
            NetworkEvent::Request(req) => {
                // the protocol has not assigned a request id yet
                assert!(req.request_id().is_none());
                assert_eq!(req.interception_id.as_ref().unwrap().as_ref(), "i1");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(nm.intercepted_requests.contains_key("i1"));

        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/"));
        // pairing completes the request without a second Request event
        assert!(drain(&mut nm).is_empty());
        assert!(nm.intercepted_requests.is_empty());
        let request = nm.requests.get("r1").unwrap();
        assert_eq!(request.interception_id.as_ref().unwrap().as_ref(), "i1");
        assert!(nm.request_hash_to_interception_ids.is_empty());
    }

    #[test]
    fn redirect_extends_the_chain_and_fails_the_body() {
        let mut nm = NetworkManager::default();
        nm.on_request_will_be_sent(&will_be_sent("r1", "http://example.com/a"));
        drain(&mut nm);

        // the protocol reuses the request id for the redirect hop
        let mut hop = will_be_sent("r1", "http://example.com/b");
        hop.redirect_response = Some(response("http://example.com/a", 302));
        nm.on_request_will_be_sent(&hop);

        let events = drain(&mut nm);
        assert_eq!(events.len(), 3);
        match &events[0] {
            NetworkEvent::Response(req) => {
                let resp = req.response().unwrap();
                assert_eq!(resp.status(), 302);
                assert!(resp.body_unavailable());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events[1], NetworkEvent::RequestFinished(_)));
        match &events[2] {
            NetworkEvent::Request(req) => {
                assert_eq!(req.url, "http://example.com/b");
                assert_eq!(req.redirect_chain().len(), 1);
                assert_eq!(req.redirect_chain()[0].url, "http://example.com/a");
            }
            other => panic!("unexpected event {other:?}"),
        }

        // final hop completes normally
        nm.on_response_received(&EventResponseReceived {
            request_id: "r1".into(),
            loader_id: "r1".into(),
            timestamp: None,
            r#type: ResourceType::Document,
            response: response("http://example.com/b", 200),
            frame_id: None,
        });
        nm.on_loading_finished(&EventLoadingFinished {
            request_id: "r1".into(),
            timestamp: None,
            encoded_data_length: None,
        });
        let events = drain(&mut nm);
        assert!(matches!(events[0], NetworkEvent::Response(_)));
        match &events[1] {
            NetworkEvent::RequestFinished(req) => {
                assert!(!req.response().unwrap().body_unavailable());
                assert_eq!(req.redirect_chain().len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn auth_challenge_provides_credentials_once() {
        let mut nm = NetworkManager::default();
        nm.authenticate(Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        });
        drain(&mut nm);

        let mut challenge = intercepted("i1", "http://example.com/");
        challenge.auth_challenge = Some(
            chromite_cdp::cdp::browser_protocol::network::AuthChallenge {
                source: None,
                origin: "http://example.com".to_string(),
                scheme: "basic".to_string(),
                realm: String::new(),
            },
        );

        nm.on_request_intercepted(&challenge);
        let events = drain(&mut nm);
        let params = match &events[0] {
            NetworkEvent::SendCdpRequest(method, params) => {
                assert_eq!(method.as_ref(), "Network.continueInterceptedRequest");
                params.clone()
            }
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(
            params["authChallengeResponse"]["response"],
            "ProvideCredentials"
        );
        assert_eq!(params["authChallengeResponse"]["username"], "user");

        // a second challenge for the same interception id is always canceled
        nm.on_request_intercepted(&challenge);
        let events = drain(&mut nm);
        let params = match &events[0] {
            NetworkEvent::SendCdpRequest(_, params) => params.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(params["authChallengeResponse"]["response"], "CancelAuth");
    }

    #[test]
    fn auth_challenge_without_credentials_responds_default() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        drain(&mut nm);

        let mut challenge = intercepted("i1", "http://example.com/");
        challenge.auth_challenge = Some(
            chromite_cdp::cdp::browser_protocol::network::AuthChallenge {
                source: None,
                origin: "http://example.com".to_string(),
                scheme: "basic".to_string(),
                realm: String::new(),
            },
        );
        nm.on_request_intercepted(&challenge);
        let events = drain(&mut nm);
        let params = match &events[0] {
            NetworkEvent::SendCdpRequest(_, params) => params.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(params["authChallengeResponse"]["response"], "Default");
    }

    #[test]
    fn data_urls_bypass_interception() {
        let mut nm = NetworkManager::default();
        nm.set_request_interception(true);
        drain(&mut nm);

        nm.on_request_will_be_sent(&will_be_sent("r1", "data:text/plain,hello"));
        let events = drain(&mut nm);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], NetworkEvent::Request(_)));
    }

    #[test]
    fn auth_only_interception_continues_requests_transparently() {
        let mut nm = NetworkManager::default();
        nm.authenticate(Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        });
        drain(&mut nm);

        nm.on_request_intercepted(&intercepted("i1", "http://example.com/"));
        let events = drain(&mut nm);
        match &events[0] {
            NetworkEvent::SendCdpRequest(method, params) => {
                assert_eq!(method.as_ref(), "Network.continueInterceptedRequest");
                assert_eq!(params["interceptionId"], "i1");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn offline_toggle_is_idempotent() {
        let mut nm = NetworkManager::default();
        nm.set_offline_mode(true);
        nm.set_offline_mode(true);
        let events = drain(&mut nm);
        assert_eq!(cdp_sends(&events), vec!["Network.emulateNetworkConditions"]);
    }

    #[test]
    fn extra_header_names_are_lowercased() {
        let mut nm = NetworkManager::default();
        nm.set_extra_headers(
            std::iter::once(("X-Custom-Header".to_string(), "1".to_string())).collect(),
        );
        let events = drain(&mut nm);
        match &events[0] {
            NetworkEvent::SendCdpRequest(method, params) => {
                assert_eq!(method.as_ref(), "Network.setExtraHTTPHeaders");
                assert_eq!(params["headers"]["x-custom-header"], "1");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
