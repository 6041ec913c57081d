//! The `Runtime` domain: execution contexts and remote evaluation.

use serde::{Deserialize, Serialize};

string_id! {
    /// Remote object identifier.
    RemoteObjectId
}

string_id! {
    /// Unique script identifier.
    ScriptId
}

/// Id of an execution context, unique within the session it belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContextId(i64);

impl ExecutionContextId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn inner(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ExecutionContextId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Mirror object referencing the original JavaScript object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Object type.
    pub r#type: String,
    /// Object subtype hint. Specified for `object` type values only.
    pub subtype: Option<String>,
    /// Object class (constructor) name.
    pub class_name: Option<String>,
    /// Remote object value in case of primitive values or JSON values (if it
    /// was requested).
    pub value: Option<serde_json::Value>,
    /// Primitive value which can not be JSON-stringified.
    pub unserializable_value: Option<String>,
    /// String representation of the object.
    pub description: Option<String>,
    /// Unique object identifier (for non-primitive values).
    pub object_id: Option<RemoteObjectId>,
}

/// Detailed information about an exception (or error) thrown during script
/// compilation or execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception id.
    pub exception_id: i64,
    /// Exception text, which should be used together with the exception
    /// object when available.
    pub text: String,
    /// Line number of the exception location (0-based).
    pub line_number: i64,
    /// Column number of the exception location (0-based).
    pub column_number: i64,
    /// Script ID of the exception location.
    pub script_id: Option<ScriptId>,
    /// URL of the exception location.
    pub url: Option<String>,
    /// Exception object if available.
    pub exception: Option<RemoteObject>,
}

/// Description of an isolated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
    /// Unique id of the execution context.
    pub id: ExecutionContextId,
    /// Execution context origin.
    pub origin: String,
    /// Human readable name describing given context.
    pub name: String,
    /// Embedder-specific auxiliary data, e.g. `{isDefault: bool, type:
    /// 'default'|'isolated'|'worker', frameId: string}`.
    pub aux_data: Option<serde_json::Value>,
}

/// Represents a function call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

/// Enables reporting of execution context creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableReturns {}

impl_command!(EnableParams, "Runtime.enable", EnableReturns);

/// Evaluates expression on global object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// Expression to evaluate.
    pub expression: String,
    /// In silent mode exceptions thrown during evaluation are not reported
    /// and do not pause execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    /// Specifies in which execution context to perform evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ExecutionContextId>,
    /// Whether the result is expected to be a JSON object that should be sent
    /// by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Whether execution should be treated as initiated by user in the UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
    /// Whether execution should `await` for resulting value and return once
    /// awaited promise is resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

impl EvaluateParams {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            silent: None,
            context_id: None,
            return_by_value: Some(true),
            user_gesture: None,
            await_promise: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateReturns {
    /// Evaluation result.
    pub result: RemoteObject,
    /// Exception details.
    pub exception_details: Option<ExceptionDetails>,
}

impl_command!(EvaluateParams, "Runtime.evaluate", EvaluateReturns);

/// Calls function with given declaration on the given object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnParams {
    /// Declaration of the function to call.
    pub function_declaration: String,
    /// Identifier of the object to call function on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
    /// Call arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<CallArgument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    /// Specifies execution context which global object will be used to call
    /// function on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_id: Option<ExecutionContextId>,
}

impl CallFunctionOnParams {
    pub fn new(function_declaration: impl Into<String>) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            object_id: None,
            arguments: None,
            silent: None,
            return_by_value: Some(true),
            user_gesture: None,
            await_promise: Some(true),
            execution_context_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnReturns {
    /// Call result.
    pub result: RemoteObject,
    /// Exception details.
    pub exception_details: Option<ExceptionDetails>,
}

impl_command!(CallFunctionOnParams, "Runtime.callFunctionOn", CallFunctionOnReturns);

/// Issued when new execution context is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextCreated {
    /// A newly created execution context.
    pub context: ExecutionContextDescription,
}

impl_event!(EventExecutionContextCreated, "Runtime.executionContextCreated");

/// Issued when execution context is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextDestroyed {
    /// Id of the destroyed context.
    pub execution_context_id: ExecutionContextId,
}

impl_event!(EventExecutionContextDestroyed, "Runtime.executionContextDestroyed");

/// Issued when all executionContexts were cleared in browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextsCleared {}

impl_event!(EventExecutionContextsCleared, "Runtime.executionContextsCleared");
