//! State inspector (§4.6): snapshot/diff/rollback/modify for review UIs.
//!
//! The design's reflection-based property access is replaced by a small
//! capability trait, [`Inspectable`] (see Design Notes in SPEC_FULL.md
//! §3/§9): callers implement it once per state type instead of the
//! engine reaching for runtime reflection.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A state type that can be reflected on by the inspector. `properties`
/// returns an ordered list of readable fields; `set_property` performs a
/// typed, coercing write and reports whether it succeeded.
pub trait Inspectable: Clone {
    fn type_name(&self) -> &'static str;
    fn properties(&self) -> Vec<(String, serde_json::Value)>;
    fn set_property(&mut self, name: &str, value: serde_json::Value) -> bool;
}

/// An immutable value-copy of a state's readable properties, captured at
/// a point in time (§3 "Snapshots").
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StateSnapshot {
    pub captured_at: DateTime<Utc>,
    pub state_type_name: String,
    pub properties: Vec<(String, serde_json::Value)>,
}

impl StateSnapshot {
    pub fn capture<S: Inspectable>(state: &S) -> Self {
        Self {
            captured_at: Utc::now(),
            state_type_name: state.type_name().to_string(),
            properties: state.properties(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One entry in an inspector's append-only history (§4.6, §9 Design
/// Notes: history is per-inspector, not per-run; instantiate one
/// inspector per run if you need per-run history).
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub index: usize,
    pub snapshot: StateSnapshot,
    pub context: Option<String>,
}

/// Change between two snapshots for one property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDiff {
    pub old: Option<serde_json::Value>,
    pub new: Option<serde_json::Value>,
}

/// Review/debugging surface over a live state instance. Only safe to use
/// while no node is executing against the same instance (§4.6, §5).
#[derive(Default)]
pub struct StateInspector {
    history: Vec<HistoryEntry>,
}

impl StateInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot<S: Inspectable>(&self, state: &S) -> StateSnapshot {
        StateSnapshot::capture(state)
    }

    /// Push a snapshot onto the append-only history with a monotonically
    /// increasing index.
    pub fn capture<S: Inspectable>(&mut self, state: &S, context: Option<String>) -> &HistoryEntry {
        let index = self.history.len();
        self.history.push(HistoryEntry {
            index,
            snapshot: StateSnapshot::capture(state),
            context,
        });
        self.history.last().expect("just pushed")
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Human-readable JSON rendering.
    pub fn visual_json<S: Inspectable>(&self, state: &S, pretty: bool) -> String {
        let snapshot = StateSnapshot::capture(state);
        let value = serde_json::json!({
            "stateType": snapshot.state_type_name,
            "capturedAt": snapshot.captured_at,
            "properties": snapshot.properties.into_iter().collect::<HashMap<_, _>>(),
        });
        if pretty {
            serde_json::to_string_pretty(&value).unwrap_or_default()
        } else {
            serde_json::to_string(&value).unwrap_or_default()
        }
    }

    /// Human-readable plain-text rendering, one property per line.
    pub fn visual_text<S: Inspectable>(&self, state: &S) -> String {
        let snapshot = StateSnapshot::capture(state);
        let mut out = format!("{}:\n", snapshot.state_type_name);
        for (name, value) in &snapshot.properties {
            out.push_str(&format!("  {name} = {value}\n"));
        }
        out
    }

    /// Typed write with coercion to the declared property type. Returns
    /// whether the write succeeded. Optionally pushes a history entry
    /// first, capturing the state *before* the write.
    pub fn modify<S: Inspectable>(
        &mut self,
        state: &mut S,
        property_name: &str,
        value: serde_json::Value,
        capture_history: bool,
    ) -> bool {
        if capture_history {
            self.capture(state, Some(format!("before modify '{property_name}'")));
        }
        state.set_property(property_name, value)
    }

    /// Copy every writable property from a snapshot back into `state`,
    /// defaulting to the most recently captured snapshot (undoing any
    /// mutation made since), then push a "rolled back" history entry.
    pub fn rollback<S: Inspectable>(&mut self, state: &mut S, snapshot_index: Option<usize>) -> bool {
        let index = match snapshot_index {
            Some(i) => i,
            None => match self.history.len().checked_sub(1) {
                Some(i) => i,
                None => return false,
            },
        };
        let Some(entry) = self.history.get(index).cloned() else {
            return false;
        };
        for (name, value) in &entry.snapshot.properties {
            state.set_property(name, value.clone());
        }
        self.capture(state, Some(format!("rolled back to snapshot {index}")));
        true
    }

    /// Per-property differences between two snapshots. Only properties
    /// present in at least one snapshot are included.
    pub fn diff(a: &StateSnapshot, b: &StateSnapshot) -> HashMap<String, PropertyDiff> {
        let mut result: HashMap<String, PropertyDiff> = HashMap::new();
        for (name, value) in &a.properties {
            result.insert(
                name.clone(),
                PropertyDiff { old: Some(value.clone()), new: None },
            );
        }
        for (name, value) in &b.properties {
            result
                .entry(name.clone())
                .and_modify(|d| d.new = Some(value.clone()))
                .or_insert(PropertyDiff { old: None, new: Some(value.clone()) });
        }
        result.retain(|_, d| d.old != d.new);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Account {
        balance: i64,
        owner: String,
    }

    impl Inspectable for Account {
        fn type_name(&self) -> &'static str {
            "Account"
        }

        fn properties(&self) -> Vec<(String, serde_json::Value)> {
            vec![
                ("balance".to_string(), serde_json::json!(self.balance)),
                ("owner".to_string(), serde_json::json!(self.owner)),
            ]
        }

        fn set_property(&mut self, name: &str, value: serde_json::Value) -> bool {
            match name {
                "balance" => match value.as_i64() {
                    Some(n) => {
                        self.balance = n;
                        true
                    }
                    None => false,
                },
                "owner" => match value.as_str() {
                    Some(s) => {
                        self.owner = s.to_string();
                        true
                    }
                    None => false,
                },
                _ => false,
            }
        }
    }

    #[test]
    fn test_snapshot_captures_all_properties() {
        let account = Account { balance: 100, owner: "ada".to_string() };
        let inspector = StateInspector::new();
        let snapshot = inspector.snapshot(&account);
        assert_eq!(snapshot.get("balance"), Some(&serde_json::json!(100)));
        assert_eq!(snapshot.get("owner"), Some(&serde_json::json!("ada")));
    }

    #[test]
    fn test_modify_writes_coerced_value() {
        let mut account = Account { balance: 100, owner: "ada".to_string() };
        let mut inspector = StateInspector::new();
        let ok = inspector.modify(&mut account, "balance", serde_json::json!(250), false);
        assert!(ok);
        assert_eq!(account.balance, 250);
    }

    #[test]
    fn test_modify_rejects_unknown_property() {
        let mut account = Account { balance: 100, owner: "ada".to_string() };
        let mut inspector = StateInspector::new();
        let ok = inspector.modify(&mut account, "nonexistent", serde_json::json!(1), false);
        assert!(!ok);
    }

    #[test]
    fn test_rollback_restores_previous_snapshot() {
        let mut account = Account { balance: 100, owner: "ada".to_string() };
        let mut inspector = StateInspector::new();
        inspector.capture(&account, Some("initial".to_string()));
        account.balance = 500;
        inspector.capture(&account, Some("after deposit".to_string()));

        let rolled_back = inspector.rollback(&mut account, Some(0));
        assert!(rolled_back);
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_rollback_defaults_to_previous_snapshot() {
        let mut account = Account { balance: 100, owner: "ada".to_string() };
        let mut inspector = StateInspector::new();
        inspector.capture(&account, None);
        account.balance = 500;
        inspector.capture(&account, None);
        account.balance = 900;

        assert!(inspector.rollback(&mut account, None));
        assert_eq!(account.balance, 500);
    }

    #[test]
    fn test_diff_reports_only_changed_properties() {
        let a = Account { balance: 100, owner: "ada".to_string() };
        let b = Account { balance: 250, owner: "ada".to_string() };
        let diff = StateInspector::diff(&StateSnapshot::capture(&a), &StateSnapshot::capture(&b));
        assert_eq!(diff.len(), 1);
        let change = &diff["balance"];
        assert_eq!(change.old, Some(serde_json::json!(100)));
        assert_eq!(change.new, Some(serde_json::json!(250)));
    }
}
