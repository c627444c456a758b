//! Pending-request stores (§4.5.6, §6): concurrent keyed collections of
//! outstanding HITL requests awaiting external resolution.
//!
//! Each HITL node type gets its own mirror-image store trait, matching
//! the design's four shapes (approval/decision/input/review). The
//! in-memory implementations use `Arc<RwLock<HashMap<..>>>`, the same
//! concurrency pattern the teacher's `InMemoryCheckpointSaver` uses. The
//! "external notifier" and "durable" shapes from §4.5.6 are seams: any
//! type implementing these traits plugs in without touching the
//! executor or the node implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Resolution state of an [`ApprovalRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug)]
pub struct ApprovalRecord<S> {
    pub run_id: String,
    pub node_name: String,
    pub state: S,
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: ApprovalStatus,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Approval store interface (§6): `request`/`is_approved` read side,
/// `approve`/`reject` the out-of-band write side. `modified`/`set_modified`
/// support [`crate::hitl::ConditionalApprovalNode`]'s `Modified` outcome,
/// where an external reviewer both modifies state and resolves the
/// request in one step — a store-specific API per §4.5 step 3.
#[async_trait::async_trait]
pub trait ApprovalStore<S>: Send + Sync {
    async fn request(&self, run_id: &str, node: &str, state: S, message: Option<String>);
    async fn status(&self, run_id: &str, node: &str) -> Option<ApprovalStatus>;
    async fn approve(&self, run_id: &str, node: &str);
    async fn reject(&self, run_id: &str, node: &str);
    async fn set_modified(&self, run_id: &str, node: &str, state: S);
    async fn take_modified(&self, run_id: &str, node: &str) -> Option<S>;
    async fn remove(&self, run_id: &str, node: &str);
}

pub struct InMemoryApprovalStore<S> {
    records: RwLock<HashMap<(String, String), ApprovalRecord<S>>>,
    modified: RwLock<HashMap<(String, String), S>>,
}

impl<S> Default for InMemoryApprovalStore<S> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            modified: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> InMemoryApprovalStore<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<S> ApprovalStore<S> for InMemoryApprovalStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn request(&self, run_id: &str, node: &str, state: S, message: Option<String>) {
        let key = (run_id.to_string(), node.to_string());
        let mut records = self.records.write().unwrap();
        records.entry(key).or_insert_with(|| ApprovalRecord {
            run_id: run_id.to_string(),
            node_name: node.to_string(),
            state,
            message,
            requested_at: Utc::now(),
            status: ApprovalStatus::Pending,
            responded_at: None,
        });
    }

    async fn status(&self, run_id: &str, node: &str) -> Option<ApprovalStatus> {
        let key = (run_id.to_string(), node.to_string());
        self.records.read().unwrap().get(&key).map(|r| r.status)
    }

    async fn approve(&self, run_id: &str, node: &str) {
        let key = (run_id.to_string(), node.to_string());
        if let Some(record) = self.records.write().unwrap().get_mut(&key) {
            record.status = ApprovalStatus::Approved;
            record.responded_at = Some(Utc::now());
        }
    }

    async fn reject(&self, run_id: &str, node: &str) {
        let key = (run_id.to_string(), node.to_string());
        if let Some(record) = self.records.write().unwrap().get_mut(&key) {
            record.status = ApprovalStatus::Rejected;
            record.responded_at = Some(Utc::now());
        }
    }

    async fn set_modified(&self, run_id: &str, node: &str, state: S) {
        let key = (run_id.to_string(), node.to_string());
        self.modified.write().unwrap().insert(key.clone(), state);
        if let Some(record) = self.records.write().unwrap().get_mut(&key) {
            record.responded_at = Some(Utc::now());
        }
    }

    async fn take_modified(&self, run_id: &str, node: &str) -> Option<S> {
        let key = (run_id.to_string(), node.to_string());
        self.modified.write().unwrap().remove(&key)
    }

    async fn remove(&self, run_id: &str, node: &str) {
        let key = (run_id.to_string(), node.to_string());
        self.records.write().unwrap().remove(&key);
        self.modified.write().unwrap().remove(&key);
    }
}

#[derive(Clone, Debug)]
pub struct DecisionRecord<S> {
    pub run_id: String,
    pub node_name: String,
    pub state: S,
    pub question: String,
    pub options: Vec<String>,
    pub requested_at: DateTime<Utc>,
    pub decision: Option<String>,
}

/// Decision store interface. `set_decision` rejects a value outside
/// `options` at write time; `get` re-validates at read time too, closing
/// the gap the source left open (§9 Open Questions).
#[async_trait::async_trait]
pub trait DecisionStore<S>: Send + Sync {
    async fn request(&self, run_id: &str, node: &str, state: S, question: String, options: Vec<String>);
    async fn get(&self, run_id: &str, node: &str) -> Option<String>;
    async fn set_decision(&self, run_id: &str, node: &str, option: String) -> Result<(), String>;
    async fn remove(&self, run_id: &str, node: &str);
}

pub struct InMemoryDecisionStore<S> {
    records: RwLock<HashMap<(String, String), DecisionRecord<S>>>,
}

impl<S> Default for InMemoryDecisionStore<S> {
    fn default() -> Self {
        Self { records: RwLock::new(HashMap::new()) }
    }
}

impl<S> InMemoryDecisionStore<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<S> DecisionStore<S> for InMemoryDecisionStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn request(&self, run_id: &str, node: &str, state: S, question: String, options: Vec<String>) {
        let key = (run_id.to_string(), node.to_string());
        let mut records = self.records.write().unwrap();
        records.entry(key).or_insert_with(|| DecisionRecord {
            run_id: run_id.to_string(),
            node_name: node.to_string(),
            state,
            question,
            options,
            requested_at: Utc::now(),
            decision: None,
        });
    }

    async fn get(&self, run_id: &str, node: &str) -> Option<String> {
        let key = (run_id.to_string(), node.to_string());
        let records = self.records.read().unwrap();
        let record = records.get(&key)?;
        let decision = record.decision.clone()?;
        if record.options.contains(&decision) {
            Some(decision)
        } else {
            None
        }
    }

    async fn set_decision(&self, run_id: &str, node: &str, option: String) -> Result<(), String> {
        let key = (run_id.to_string(), node.to_string());
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(&key)
            .ok_or_else(|| format!("no pending decision for run '{run_id}' node '{node}'"))?;
        if !record.options.contains(&option) {
            return Err(format!("'{option}' is not one of the offered options"));
        }
        record.decision = Some(option);
        Ok(())
    }

    async fn remove(&self, run_id: &str, node: &str) {
        let key = (run_id.to_string(), node.to_string());
        self.records.write().unwrap().remove(&key);
    }
}

/// Declared shape of a value requested by an [`crate::hitl::InputNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    File,
    Email,
    Url,
    TextArea,
    Json,
}

#[derive(Clone, Debug)]
pub struct InputRecord<S> {
    pub run_id: String,
    pub node_name: String,
    pub state: S,
    pub property_name: String,
    pub input_type: InputType,
    pub prompt: String,
    pub default_value: Option<serde_json::Value>,
    pub validation_rule: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub value: Option<serde_json::Value>,
}

#[async_trait::async_trait]
pub trait InputStore<S>: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn request(
        &self,
        run_id: &str,
        node: &str,
        property: &str,
        state: S,
        input_type: InputType,
        prompt: String,
        default_value: Option<serde_json::Value>,
        validation_rule: Option<String>,
    );
    async fn get(&self, run_id: &str, node: &str, property: &str) -> Option<serde_json::Value>;
    async fn set_input(&self, run_id: &str, node: &str, property: &str, value: serde_json::Value);
    async fn remove(&self, run_id: &str, node: &str, property: &str);
}

pub struct InMemoryInputStore<S> {
    records: RwLock<HashMap<(String, String, String), InputRecord<S>>>,
}

impl<S> Default for InMemoryInputStore<S> {
    fn default() -> Self {
        Self { records: RwLock::new(HashMap::new()) }
    }
}

impl<S> InMemoryInputStore<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<S> InputStore<S> for InMemoryInputStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn request(
        &self,
        run_id: &str,
        node: &str,
        property: &str,
        state: S,
        input_type: InputType,
        prompt: String,
        default_value: Option<serde_json::Value>,
        validation_rule: Option<String>,
    ) {
        let key = (run_id.to_string(), node.to_string(), property.to_string());
        let mut records = self.records.write().unwrap();
        records.entry(key).or_insert_with(|| InputRecord {
            run_id: run_id.to_string(),
            node_name: node.to_string(),
            state,
            property_name: property.to_string(),
            input_type,
            prompt,
            default_value,
            validation_rule,
            requested_at: Utc::now(),
            value: None,
        });
    }

    async fn get(&self, run_id: &str, node: &str, property: &str) -> Option<serde_json::Value> {
        let key = (run_id.to_string(), node.to_string(), property.to_string());
        self.records.read().unwrap().get(&key).and_then(|r| r.value.clone())
    }

    async fn set_input(&self, run_id: &str, node: &str, property: &str, value: serde_json::Value) {
        let key = (run_id.to_string(), node.to_string(), property.to_string());
        if let Some(record) = self.records.write().unwrap().get_mut(&key) {
            record.value = Some(value);
        }
    }

    async fn remove(&self, run_id: &str, node: &str, property: &str) {
        let key = (run_id.to_string(), node.to_string(), property.to_string());
        self.records.write().unwrap().remove(&key);
    }
}

#[derive(Clone, Debug)]
pub struct ReviewRecord<S> {
    pub run_id: String,
    pub node_name: String,
    pub state: S,
    pub context: Option<String>,
    pub allow_modification: bool,
    pub requested_at: DateTime<Utc>,
    pub reviewed_state: Option<S>,
}

#[async_trait::async_trait]
pub trait ReviewStore<S>: Send + Sync {
    async fn request(&self, run_id: &str, node: &str, state: S, context: Option<String>, allow_modification: bool);
    async fn get(&self, run_id: &str, node: &str) -> Option<S>;
    async fn set_reviewed_state(&self, run_id: &str, node: &str, new_state: S);
    async fn remove(&self, run_id: &str, node: &str);
}

pub struct InMemoryReviewStore<S> {
    records: RwLock<HashMap<(String, String), ReviewRecord<S>>>,
}

impl<S> Default for InMemoryReviewStore<S> {
    fn default() -> Self {
        Self { records: RwLock::new(HashMap::new()) }
    }
}

impl<S> InMemoryReviewStore<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<S> ReviewStore<S> for InMemoryReviewStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn request(&self, run_id: &str, node: &str, state: S, context: Option<String>, allow_modification: bool) {
        let key = (run_id.to_string(), node.to_string());
        let mut records = self.records.write().unwrap();
        records.entry(key).or_insert_with(|| ReviewRecord {
            run_id: run_id.to_string(),
            node_name: node.to_string(),
            state,
            context,
            allow_modification,
            requested_at: Utc::now(),
            reviewed_state: None,
        });
    }

    async fn get(&self, run_id: &str, node: &str) -> Option<S> {
        let key = (run_id.to_string(), node.to_string());
        self.records.read().unwrap().get(&key).and_then(|r| r.reviewed_state.clone())
    }

    async fn set_reviewed_state(&self, run_id: &str, node: &str, new_state: S) {
        let key = (run_id.to_string(), node.to_string());
        if let Some(record) = self.records.write().unwrap().get_mut(&key) {
            record.reviewed_state = Some(new_state);
        }
    }

    async fn remove(&self, run_id: &str, node: &str) {
        let key = (run_id.to_string(), node.to_string());
        self.records.write().unwrap().remove(&key);
    }
}
