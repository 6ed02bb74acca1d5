//! Structural subset checks and non-destructive merges over value trees.
//!
//! Rules, applied recursively from the document root:
//!
//! - A required **map** needs an existing map. Missing keys are inserted
//!   with the required value; present keys recurse.
//! - A required **sequence** needs an existing sequence and is handled by
//!   the [`SequencePolicy`].
//! - A required **scalar** is satisfied by any existing scalar. A differing
//!   existing scalar is a user customization: it is kept and reported as a
//!   [`Divergence`], never overwritten.
//! - Any other shape mismatch is a [`TreeError::Incompatible`].
//!
//! A TOML datetime is carried as a single-key map (see
//! [`TOML_DATETIME_KEY`](crate::format::TOML_DATETIME_KEY)) and counts as a
//! scalar here.
//!
//! Existing entries the required content does not mention are never
//! touched, so merging a tree into its own merge result adds nothing.

use serde::Serialize;

use crate::error::TreeError;
use crate::format::is_datetime;
use crate::spec::SequencePolicy;
use crate::Value;

/// An entry inserted by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeChange {
    /// JSON pointer of the inserted entry.
    pub pointer: String,
    /// The inserted value.
    pub value: Value,
}

/// A required scalar the existing content overrides with its own value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub pointer: String,
    pub required: Value,
    pub existing: Value,
}

/// Result of merging required content into existing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The existing tree with every missing required entry added.
    pub merged: Value,
    /// Entries that were added, in document order.
    pub added: Vec<TreeChange>,
    /// Scalars kept at a user-chosen value.
    pub divergences: Vec<Divergence>,
}

impl MergeOutcome {
    /// Whether the existing tree already contained the required subset.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty()
    }
}

/// Check whether `existing` already contains every entry of `required`.
pub fn contains_subset(
    existing: &Value,
    required: &Value,
    policy: SequencePolicy,
) -> Result<bool, TreeError> {
    let mut pointer = String::new();
    subset_at(existing, required, policy, &mut pointer)
}

/// Merge the entries of `required` missing from `existing`.
pub fn merge_missing(
    existing: &Value,
    required: &Value,
    policy: SequencePolicy,
) -> Result<MergeOutcome, TreeError> {
    let mut merged = existing.clone();
    let mut added = Vec::new();
    let mut divergences = Vec::new();
    let mut pointer = String::new();
    merge_at(
        &mut merged,
        required,
        policy,
        &mut pointer,
        &mut added,
        &mut divergences,
    )?;
    Ok(MergeOutcome {
        merged,
        added,
        divergences,
    })
}

fn subset_at(
    existing: &Value,
    required: &Value,
    policy: SequencePolicy,
    pointer: &mut String,
) -> Result<bool, TreeError> {
    match (required, existing) {
        (req, have) if is_scalar(req) || is_scalar(have) => {
            if is_scalar(req) && is_scalar(have) {
                Ok(true)
            } else {
                Err(incompatible(pointer, req, have))
            }
        }
        (Value::Object(req), Value::Object(have)) => {
            for (key, req_value) in req {
                let Some(have_value) = have.get(key) else {
                    return Ok(false);
                };
                let len = push_segment(pointer, key);
                let ok = subset_at(have_value, req_value, policy, pointer)?;
                pointer.truncate(len);
                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Array(req), Value::Array(have)) => Ok(match policy {
            SequencePolicy::AppendMissing => req.iter().all(|item| have.contains(item)),
            SequencePolicy::Ignore => true,
        }),
        (req, have) => Err(incompatible(pointer, req, have)),
    }
}

fn merge_at(
    existing: &mut Value,
    required: &Value,
    policy: SequencePolicy,
    pointer: &mut String,
    added: &mut Vec<TreeChange>,
    divergences: &mut Vec<Divergence>,
) -> Result<(), TreeError> {
    match (required, existing) {
        (req, have) if is_scalar(req) || is_scalar(have) => {
            if !(is_scalar(req) && is_scalar(have)) {
                return Err(incompatible(pointer, req, have));
            }
            if *req != *have {
                divergences.push(Divergence {
                    pointer: pointer.clone(),
                    required: req.clone(),
                    existing: have.clone(),
                });
            }
            Ok(())
        }
        (Value::Object(req), Value::Object(have)) => {
            for (key, req_value) in req {
                let len = push_segment(pointer, key);
                match have.get_mut(key) {
                    Some(have_value) => {
                        merge_at(have_value, req_value, policy, pointer, added, divergences)?
                    }
                    None => {
                        have.insert(key.clone(), req_value.clone());
                        added.push(TreeChange {
                            pointer: pointer.clone(),
                            value: req_value.clone(),
                        });
                    }
                }
                pointer.truncate(len);
            }
            Ok(())
        }
        (Value::Array(req), Value::Array(have)) => {
            if policy == SequencePolicy::AppendMissing {
                for item in req {
                    if !have.contains(item) {
                        have.push(item.clone());
                        added.push(TreeChange {
                            pointer: format!("{pointer}/{}", have.len() - 1),
                            value: item.clone(),
                        });
                    }
                }
            }
            Ok(())
        }
        (req, have) => Err(incompatible(pointer, req, have)),
    }
}

/// Append an escaped JSON pointer segment, returning the previous length.
fn push_segment(pointer: &mut String, key: &str) -> usize {
    let len = pointer.len();
    pointer.push('/');
    pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
    len
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::Object(map) => is_datetime(map),
        Value::Array(_) => false,
        _ => true,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(map) if is_datetime(map) => "datetime",
        Value::Object(_) => "map",
    }
}

fn incompatible(pointer: &str, required: &Value, existing: &Value) -> TreeError {
    let expected = if is_scalar(required) {
        "scalar"
    } else {
        kind_name(required)
    };
    TreeError::Incompatible {
        pointer: pointer.to_string(),
        expected,
        found: kind_name(existing),
    }
}
