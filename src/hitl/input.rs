//! Typed human input node (§4.5.4).

use super::store::InputStore;
pub use super::store::InputType;
use super::{cancelled_or_timeout, poll, resolve_run_id, RunIdAccessor};
use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use chrono::{DateTime, NaiveDate};
use std::sync::Arc;
use std::time::Duration;

/// Prompts for a single typed value and writes it into a caller-named
/// property on resolution. The declared `input_type` and optional
/// `validation_rule` (free-form, store-interpreted, e.g. a regex or
/// range spec) are passed through to the store as metadata; this node
/// performs format-level coercion of the resolved value before handing
/// it to `set_property`, which performs the final typed write into `S`.
pub struct InputNode<S> {
    name: String,
    store: Arc<dyn InputStore<S>>,
    property_name: String,
    input_type: InputType,
    prompt: String,
    default_value: Option<serde_json::Value>,
    validation_rule: Option<String>,
    timeout: Option<Duration>,
    run_id_of: Option<RunIdAccessor<S>>,
    set_property: Arc<dyn Fn(&mut S, serde_json::Value) -> std::result::Result<(), String> + Send + Sync>,
}

impl<S> InputNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn InputStore<S>>,
        property_name: impl Into<String>,
        input_type: InputType,
        prompt: impl Into<String>,
        set_property: impl Fn(&mut S, serde_json::Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            property_name: property_name.into(),
            input_type,
            prompt: prompt.into(),
            default_value: None,
            validation_rule: None,
            timeout: None,
            run_id_of: None,
            set_property: Arc::new(set_property),
        }
    }

    pub fn with_default_value(mut self, default_value: serde_json::Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_validation_rule(mut self, rule: impl Into<String>) -> Self {
        self.validation_rule = Some(rule.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_run_id_accessor(mut self, accessor: impl Fn(&S) -> Option<String> + Send + Sync + 'static) -> Self {
        self.run_id_of = Some(Arc::new(accessor));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for InputNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let run_id = resolve_run_id(&ctx, &self.run_id_of, &state);
        self.store
            .request(
                &run_id,
                &self.name,
                &self.property_name,
                state.clone(),
                self.input_type,
                self.prompt.clone(),
                self.default_value.clone(),
                self.validation_rule.clone(),
            )
            .await;

        let store = &self.store;
        let name = &self.name;
        let property = &self.property_name;
        let outcome = poll(&ctx, self.timeout, || async { store.get(&run_id, name, property).await }).await;

        let raw = match outcome {
            Ok(v) => v,
            Err(failure) => return Err(cancelled_or_timeout(&self.name, failure, "input timed out")),
        };

        self.store.remove(&run_id, &self.name, &self.property_name).await;

        let coerced = coerce(&raw, self.input_type)
            .map_err(|e| GraphError::workflow(&self.name, format!("input coercion failed: {e}")))?;

        (self.set_property)(&mut state, coerced)
            .map_err(|e| GraphError::workflow(&self.name, format!("input coercion failed: {e}")))?;

        Ok(state)
    }
}

/// Format-level coercion/validation against the declared [`InputType`].
/// `null` is always accepted, supporting nullable-wrapped properties.
fn coerce(value: &serde_json::Value, input_type: InputType) -> std::result::Result<serde_json::Value, String> {
    if value.is_null() {
        return Ok(serde_json::Value::Null);
    }
    match input_type {
        InputType::Text | InputType::TextArea | InputType::File | InputType::Email | InputType::Url => {
            let s = as_string(value)?;
            if input_type == InputType::Email && !s.contains('@') {
                return Err(format!("'{s}' is not a valid email address"));
            }
            if input_type == InputType::Url && !(s.starts_with("http://") || s.starts_with("https://")) {
                return Err(format!("'{s}' is not a valid URL"));
            }
            Ok(serde_json::Value::String(s))
        }
        InputType::Number => {
            let n = match value {
                serde_json::Value::Number(n) => n.clone(),
                serde_json::Value::String(s) => s
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .ok_or_else(|| format!("'{s}' is not a number"))?,
                other => return Err(format!("{other} is not a number")),
            };
            Ok(serde_json::Value::Number(n))
        }
        InputType::Boolean => {
            let b = match value {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("true") => true,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("false") => false,
                other => return Err(format!("{other} is not a boolean")),
            };
            Ok(serde_json::Value::Bool(b))
        }
        InputType::Date => {
            let s = as_string(value)?;
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| format!("'{s}' is not a date: {e}"))?;
            Ok(serde_json::Value::String(s))
        }
        InputType::DateTime => {
            let s = as_string(value)?;
            DateTime::parse_from_rfc3339(&s).map_err(|e| format!("'{s}' is not a datetime: {e}"))?;
            Ok(serde_json::Value::String(s))
        }
        InputType::Json => Ok(value.clone()),
    }
}

fn as_string(value: &serde_json::Value) -> std::result::Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        other => Err(format!("{other} is not a string")),
    }
}
