use std::sync::Arc;

use chromite_cdp::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};

use crate::error::Result;
use crate::handler::page::PageInner;

/// A JavaScript dialog (alert, confirm, prompt or beforeunload) currently
/// open on a page.
///
/// The dialog blocks the page until it is answered with [`Dialog::accept`]
/// or [`Dialog::dismiss`].
#[derive(Debug, Clone)]
pub struct Dialog {
    inner: Arc<PageInner>,
    kind: DialogType,
    message: String,
    default_value: Option<String>,
}

impl Dialog {
    pub(crate) fn new(inner: Arc<PageInner>, event: &EventJavascriptDialogOpening) -> Self {
        Self {
            inner,
            kind: event.r#type,
            message: event.message.clone(),
            default_value: event.default_prompt.clone(),
        }
    }

    /// What kind of dialog this is.
    pub fn kind(&self) -> DialogType {
        self.kind
    }

    /// The message the dialog displays.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The default value of the prompt, if this is a prompt dialog.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Accept the dialog, optionally entering the text into the prompt.
    pub async fn accept(&self, prompt_text: Option<String>) -> Result<()> {
        let mut params = HandleJavaScriptDialogParams::new(true);
        params.prompt_text = prompt_text;
        self.inner.execute(params).await?;
        Ok(())
    }

    /// Dismiss the dialog.
    pub async fn dismiss(&self) -> Result<()> {
        self.inner
            .execute(HandleJavaScriptDialogParams::new(false))
            .await?;
        Ok(())
    }
}
