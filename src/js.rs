use serde::de::DeserializeOwned;

use chromite_cdp::cdp::js_protocol::runtime::RemoteObject;

/// The outcome of a remote evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Mirror object referencing the original JavaScript object
    inner: RemoteObject,
}

impl EvaluationResult {
    pub fn new(inner: RemoteObject) -> Self {
        Self { inner }
    }

    pub fn object(&self) -> &RemoteObject {
        &self.inner
    }

    /// The json value of the object, if the evaluation returned one by value.
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.object().value.as_ref()
    }

    /// Attempts to deserialize the value into the given type
    pub fn into_value<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        let value = self
            .inner
            .value
            .ok_or_else(|| serde::de::Error::custom("No value found"))?;
        serde_json::from_value(value)
    }
}
