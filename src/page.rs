use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use futures::channel::mpsc::unbounded;
use futures::channel::oneshot::channel as oneshot_channel;

use chromite_cdp::cdp::browser_protocol::network::{
    ContinueInterceptedRequestParams, ErrorReason, GetResponseBodyParams, InterceptionId,
    SetUserAgentOverrideParams,
};
use chromite_cdp::cdp::browser_protocol::page::{
    FrameId, GetFrameTreeParams, NavigateParams, ReloadParams, SetBypassCspParams,
};
use chromite_cdp::cdp::browser_protocol::target::{ActivateTargetParams, SessionId, TargetId};
use chromite_cdp::cdp::js_protocol::runtime::EvaluateParams;
use chromite_cdp::cdp::IntoEventKind;
use chromite_types::{Command, CommandResponse};

use crate::dialog::Dialog;
use crate::error::{CdpError, Result};
use crate::fanout::InvocationList;
use crate::handler::frame::NavigationOptions;
use crate::handler::network::{Credentials, HttpRequest};
use crate::handler::target::TargetMessage;
use crate::handler::PageInner;
use crate::js::EvaluationResult;
use crate::listeners::{EventStream, Subscription};

/// A single browser page, backed by one target and its session.
#[derive(Debug, Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    /// Execute a protocol command scoped to this page's session
    pub async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        self.inner.execute(cmd).await
    }

    /// The identifier of the `Target` this page belongs to
    pub fn target_id(&self) -> &TargetId {
        self.inner.target_id()
    }

    /// The identifier of the `Session` this page's target is attached to
    pub fn session_id(&self) -> &SessionId {
        self.inner.session_id()
    }

    /// The target that opened this page, if any
    pub fn opener_id(&self) -> Option<&TargetId> {
        self.inner.opener_id()
    }

    /// Navigate to the given URL and resolve once the navigation settled
    /// according to the default options (`load`, default timeout).
    pub async fn goto(&self, params: impl Into<NavigateParams>) -> Result<&Self> {
        self.goto_with(params, NavigationOptions::default()).await
    }

    /// Navigate to the given URL with explicit completion options.
    pub async fn goto_with(
        &self,
        params: impl Into<NavigateParams>,
        opts: NavigationOptions,
    ) -> Result<&Self> {
        let resp = self
            .inner
            .navigation_future(params.into(), opts)?
            .await?;
        if let Some(err) = resp.result.error_text {
            return Err(CdpError::Navigation(err));
        }
        Ok(self)
    }

    /// Reload the page and resolve once the reload settled.
    pub async fn reload(&self) -> Result<&Self> {
        self.reload_with(NavigationOptions::default()).await
    }

    pub async fn reload_with(&self, opts: NavigationOptions) -> Result<&Self> {
        self.inner
            .navigation_future(ReloadParams::default(), opts)?
            .await?;
        Ok(self)
    }

    /// Resolves once the main frame finished its next document load, with the
    /// request that loaded it, if the network manager saw one.
    pub async fn wait_for_navigation(&self) -> Result<Option<Arc<HttpRequest>>> {
        let (tx, rx) = oneshot_channel();
        self.inner
            .send_message(TargetMessage::WaitForNavigation(tx))
            .await?;
        Ok(rx.await?)
    }

    /// Toggle bypassing of the page's Content-Security-Policy.
    ///
    /// Takes effect for documents loaded after the call, a reload is needed
    /// for the current one.
    pub async fn set_bypass_csp(&self, enabled: bool) -> Result<&Self> {
        self.execute(SetBypassCspParams::new(enabled)).await?;
        Ok(self)
    }

    /// Evaluates an expression in the page's main execution context.
    pub async fn evaluate(&self, evaluate: impl Into<EvaluateParams>) -> Result<EvaluationResult> {
        let resp = self.execute(evaluate.into()).await?.result;
        if let Some(details) = resp.exception_details {
            return Err(CdpError::JavascriptException(Box::new(details)));
        }
        Ok(EvaluationResult::new(resp.result))
    }

    /// Evaluates an expression in the default execution context of the given
    /// frame.
    ///
    /// Fails with `DetachedFrame` if the frame is gone and with
    /// `ExecutionContextDestroyed` if the frame has no usable context.
    pub async fn evaluate_in_frame(
        &self,
        frame_id: FrameId,
        evaluate: impl Into<EvaluateParams>,
    ) -> Result<EvaluationResult> {
        let (tx, rx) = oneshot_channel();
        self.inner
            .send_message(TargetMessage::GetExecutionContext {
                frame_id: Some(frame_id),
                tx,
            })
            .await?;
        let context_id = rx.await??;

        let mut params = evaluate.into();
        params.context_id = Some(context_id);
        let resp = self.execute(params).await?.result;
        if let Some(details) = resp.exception_details {
            return Err(CdpError::JavascriptException(Box::new(details)));
        }
        Ok(EvaluationResult::new(resp.result))
    }

    /// Injects a `<script>` tag into the current document.
    pub async fn add_script_tag(&self, opts: AddScriptTagOptions) -> Result<&Self> {
        let expression = opts.into_expression()?;
        self.evaluate(EvaluateParams::new(expression)).await?;
        Ok(self)
    }

    /// The current url of the page, as the browser reports it.
    pub async fn current_url(&self) -> Result<String> {
        let resp = self.execute(GetFrameTreeParams::default()).await?;
        Ok(resp.result.frame_tree.frame.url)
    }

    /// Activates (focuses) the target.
    pub async fn activate(&self) -> Result<&Self> {
        self.execute(ActivateTargetParams::new(self.target_id().clone()))
            .await?;
        Ok(self)
    }

    /// Allows overriding the user agent this page sends.
    pub async fn set_user_agent(
        &self,
        params: impl Into<SetUserAgentOverrideParams>,
    ) -> Result<&Self> {
        self.execute(params.into()).await?;
        Ok(self)
    }

    /// Enable or disable the interception of requests of this page.
    ///
    /// While enabled, every matched request is paused until it is continued,
    /// fulfilled or aborted.
    pub async fn set_request_interception(&self, enabled: bool) -> Result<&Self> {
        self.inner
            .send_message(TargetMessage::SetRequestInterception(enabled))
            .await?;
        Ok(self)
    }

    /// Offer credentials on HTTP authentication challenges.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<&Self> {
        self.inner
            .send_message(TargetMessage::Authenticate(credentials))
            .await?;
        Ok(self)
    }

    /// Toggle the browser cache for requests of this page.
    pub async fn set_cache_enabled(&self, enabled: bool) -> Result<&Self> {
        self.inner
            .send_message(TargetMessage::SetCacheEnabled(enabled))
            .await?;
        Ok(self)
    }

    /// Emulate being offline.
    pub async fn set_offline_mode(&self, offline: bool) -> Result<&Self> {
        self.inner
            .send_message(TargetMessage::SetOfflineMode(offline))
            .await?;
        Ok(self)
    }

    /// Headers sent with every request of this page. Names are lower-cased.
    pub async fn set_extra_http_headers(&self, headers: HashMap<String, String>) -> Result<&Self> {
        self.inner
            .send_message(TargetMessage::SetExtraHeaders(headers))
            .await?;
        Ok(self)
    }

    /// Let a paused, intercepted request continue unmodified.
    pub async fn continue_intercepted_request(
        &self,
        interception_id: impl Into<InterceptionId>,
    ) -> Result<&Self> {
        self.execute(ContinueInterceptedRequestParams::new(interception_id.into()))
            .await?;
        Ok(self)
    }

    /// Abort a paused, intercepted request.
    pub async fn abort_intercepted_request(
        &self,
        interception_id: impl Into<InterceptionId>,
        reason: ErrorReason,
    ) -> Result<&Self> {
        let mut params = ContinueInterceptedRequestParams::new(interception_id.into());
        params.error_reason = Some(reason);
        self.execute(params).await?;
        Ok(self)
    }

    /// The body of the response attached to the request.
    ///
    /// Fails with `BodyUnavailable` for redirect responses.
    pub async fn response_body(&self, request: &HttpRequest) -> Result<Vec<u8>> {
        if let Some(response) = request.response() {
            if response.body_unavailable() {
                return Err(CdpError::BodyUnavailable);
            }
        }
        let request_id = request
            .request_id()
            .ok_or_else(|| CdpError::msg("the request has not been assigned an id yet"))?;
        let resp = self
            .execute(GetResponseBodyParams::new(request_id.clone()))
            .await?
            .result;
        if resp.base64_encoded {
            Ok(BASE64_STANDARD.decode(resp.body)?)
        } else {
            Ok(resp.body.into_bytes())
        }
    }

    /// Subscribe to a typed protocol event of this page's session.
    pub async fn event_listener<T: IntoEventKind + Unpin>(&self) -> Result<EventStream<T>> {
        let (tx, rx) = unbounded();
        self.inner
            .send_message(TargetMessage::Subscribe(Subscription::new::<T>(tx)))
            .await?;
        Ok(EventStream::new(rx))
    }

    /// Subscribers invoked for every request the page starts.
    pub fn on_request(&self) -> &InvocationList<Arc<HttpRequest>> {
        &self.inner.events().request
    }

    /// Subscribers invoked for every received response.
    pub fn on_response(&self) -> &InvocationList<Arc<HttpRequest>> {
        &self.inner.events().response
    }

    /// Subscribers invoked when a request failed.
    pub fn on_request_failed(&self) -> &InvocationList<Arc<HttpRequest>> {
        &self.inner.events().request_failed
    }

    /// Subscribers invoked when a request finished successfully.
    pub fn on_request_finished(&self) -> &InvocationList<Arc<HttpRequest>> {
        &self.inner.events().request_finished
    }

    /// Subscribers invoked when a javascript dialog opens on this page.
    /// The dialog blocks the page until it is accepted or dismissed.
    pub fn on_dialog(&self) -> &InvocationList<Dialog> {
        &self.inner.events().dialog
    }
}

impl From<Arc<PageInner>> for Page {
    fn from(inner: Arc<PageInner>) -> Self {
        Self { inner }
    }
}

/// What to inject with [`Page::add_script_tag`].
#[derive(Debug, Clone, Default)]
pub struct AddScriptTagOptions {
    /// Url of the script to load.
    pub url: Option<String>,
    /// Raw javascript to inject.
    pub content: Option<String>,
    /// Script type, defaults to `text/javascript`.
    pub r#type: Option<String>,
}

impl AddScriptTagOptions {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    fn into_expression(self) -> Result<String> {
        let ty = serde_json::to_string(self.r#type.as_deref().unwrap_or("text/javascript"))?;
        if let Some(url) = self.url {
            let url = serde_json::to_string(&url)?;
            return Ok(format!(
                "new Promise((resolve, reject) => {{\
                   const script = document.createElement('script');\
                   script.type = {ty};\
                   script.src = {url};\
                   script.onload = () => resolve(true);\
                   script.onerror = () => reject(new Error('failed to load script ' + {url}));\
                   document.head.appendChild(script);\
                 }})"
            ));
        }
        if let Some(content) = self.content {
            let content = serde_json::to_string(&content)?;
            return Ok(format!(
                "(() => {{\
                   const script = document.createElement('script');\
                   script.type = {ty};\
                   script.text = {content};\
                   document.head.appendChild(script);\
                   return true;\
                 }})()"
            ));
        }
        Err(CdpError::msg(
            "provide either a url or the content of the script to inject",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tag_requires_a_source() {
        assert!(AddScriptTagOptions::default().into_expression().is_err());
    }

    #[test]
    fn script_tag_content_is_json_escaped() {
        let expr = AddScriptTagOptions::content("window.__x = \"42\"")
            .into_expression()
            .unwrap();
        assert!(expr.contains("script.text = \"window.__x = \\\"42\\\"\""));
        assert!(expr.contains("text/javascript"));
    }

    #[test]
    fn script_tag_url_waits_for_load() {
        let expr = AddScriptTagOptions::url("http://example.com/x.js")
            .into_expression()
            .unwrap();
        assert!(expr.starts_with("new Promise"));
        assert!(expr.contains("script.src = \"http://example.com/x.js\""));
    }
}
