// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural interpolation between partially-overlapping value trees.
//!
//! An [`Interpolant`] is compiled once, up front: the destination tree is
//! walked against the current tree, every shape conflict is rejected
//! immediately, and the surviving numeric leaves are flattened into a plan.
//! Sampling the plan afterwards cannot fail and touches only the leaves the
//! destination mentioned; sibling branches are left exactly as they were.

use thiserror::Error;

use tweenline_easing::Easing;

use crate::value::{Path, Value};

/// Shape and numeric-domain failures, reported at compile time.
///
/// Every variant is a caller bug: immediate, synchronous, never retried.
#[derive(Debug, Error, PartialEq)]
pub enum InterpolateError {
    /// The destination addresses an entry the current value does not have.
    #[error("destination entry `{path}` is missing from the current value")]
    MissingEntry {
        /// Path of the offending entry.
        path: String,
    },

    /// A destination node and its counterpart have incompatible kinds.
    #[error("cannot blend {found} into {expected} at `{path}`")]
    KindMismatch {
        /// Path of the offending node.
        path: String,
        /// Kind found in the current value.
        expected: &'static str,
        /// Kind found in the destination.
        found: &'static str,
    },

    /// A numeric leaf is infinite or NaN on either side.
    #[error("cannot interpolate to or from a non-finite number at `{path}`")]
    NonFinite {
        /// Path of the offending leaf.
        path: String,
    },
}

/// A blendable numeric leaf.
#[derive(Debug, Clone)]
struct NumericLeaf {
    path: Path,
    start: f64,
    end: f64,
}

/// A non-numeric leaf that steps to its destination at completion.
#[derive(Debug, Clone)]
struct SnapLeaf {
    path: Path,
    start: Value,
    end: Value,
}

/// A compiled interpolation plan from one value tree toward a partial
/// destination tree.
#[derive(Debug, Clone)]
pub struct Interpolant {
    easing: Easing,
    numeric: Vec<NumericLeaf>,
    snaps: Vec<SnapLeaf>,
}

impl Interpolant {
    /// Compile a plan, validating that `destination` is shape-compatible
    /// with `current`.
    ///
    /// # Errors
    ///
    /// See [`InterpolateError`]; the offending path is always named.
    pub fn new(
        current: &Value,
        destination: &Value,
        easing: Easing,
    ) -> Result<Self, InterpolateError> {
        let mut plan = Self {
            easing,
            numeric: Vec::new(),
            snaps: Vec::new(),
        };
        let mut path = Path::root();
        plan.compile(current, destination, &mut path)?;
        Ok(plan)
    }

    /// Number of leaves this plan touches.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.numeric.len() + self.snaps.len()
    }

    fn compile(
        &mut self,
        current: &Value,
        destination: &Value,
        path: &mut Path,
    ) -> Result<(), InterpolateError> {
        match (destination, current) {
            (Value::Number(end), Value::Number(start)) => {
                if !start.is_finite() || !end.is_finite() {
                    return Err(InterpolateError::NonFinite {
                        path: path.to_string(),
                    });
                }
                self.numeric.push(NumericLeaf {
                    path: path.clone(),
                    start: *start,
                    end: *end,
                });
                Ok(())
            }
            (Value::Bool(_) | Value::Text(_), _) if destination.kind() == current.kind() => {
                self.snaps.push(SnapLeaf {
                    path: path.clone(),
                    start: current.clone(),
                    end: destination.clone(),
                });
                Ok(())
            }
            (Value::Array(dest_items), Value::Array(cur_items)) => {
                for (index, dest_item) in dest_items.iter().enumerate() {
                    path.push_index(index);
                    let Some(cur_item) = cur_items.get(index) else {
                        return Err(InterpolateError::MissingEntry {
                            path: path.to_string(),
                        });
                    };
                    self.compile(cur_item, dest_item, path)?;
                    path.pop();
                }
                Ok(())
            }
            (Value::Object(dest_map), Value::Object(cur_map)) => {
                for (key, dest_entry) in dest_map {
                    path.push_key(key.clone());
                    let Some(cur_entry) = cur_map.get(key) else {
                        return Err(InterpolateError::MissingEntry {
                            path: path.to_string(),
                        });
                    };
                    self.compile(cur_entry, dest_entry, path)?;
                    path.pop();
                }
                Ok(())
            }
            _ => Err(InterpolateError::KindMismatch {
                path: path.to_string(),
                expected: current.kind(),
                found: destination.kind(),
            }),
        }
    }

    /// Write the plan's value at `progress` into `out`, in place.
    ///
    /// Numeric leaves get `start + (end - start) * easing(progress)`;
    /// snap leaves hold their start until `progress >= 1` and then step.
    /// Only planned leaves are touched.
    pub fn sample_into(&self, progress: f64, out: &mut Value) {
        let eased = self.easing.sample(progress);
        for leaf in &self.numeric {
            if let Some(slot) = out.get_mut(&leaf.path) {
                *slot = Value::Number(lerp(leaf.start, leaf.end, eased));
            }
        }
        for snap in &self.snaps {
            if let Some(slot) = out.get_mut(&snap.path) {
                *slot = if progress >= 1.0 {
                    snap.end.clone()
                } else {
                    snap.start.clone()
                };
            }
        }
    }
}

fn lerp(start: f64, end: f64, progress: f64) -> f64 {
    start + (end - start) * progress
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Value {
        Value::object([
            ("a", Value::from(1.0)),
            (
                "b",
                Value::object([
                    ("c", Value::from(2.0)),
                    ("d", Value::from(3.0)),
                    ("e", Value::array([4.0, 5.0])),
                ]),
            ),
        ])
    }

    fn key_path(keys: &[&str]) -> Path {
        let mut path = Path::root();
        for key in keys {
            path.push_key(*key);
        }
        path
    }

    #[test]
    fn lerps_every_touched_numeric_leaf() {
        let mut value = current();
        let destination = Value::object([
            ("a", Value::from(11.0)),
            ("b", Value::object([("c", Value::from(12.0))])),
        ]);
        let plan = Interpolant::new(&value, &destination, Easing::Linear).unwrap();

        plan.sample_into(0.5, &mut value);
        assert_eq!(value.get(&key_path(&["a"])), Some(&Value::Number(6.0)));
        assert_eq!(value.get(&key_path(&["b", "c"])), Some(&Value::Number(7.0)));
    }

    #[test]
    fn untouched_siblings_are_left_alone() {
        let mut value = current();
        let destination = Value::object([("b", Value::object([("c", Value::from(20.0))]))]);
        let plan = Interpolant::new(&value, &destination, Easing::Linear).unwrap();

        // Sampling writes in place, so the untouched branch keeps not just
        // its contents but its address.
        let untouched = key_path(&["b", "e"]);
        let before: *const Value = value.get(&untouched).unwrap();

        plan.sample_into(1.0, &mut value);
        assert_eq!(value.get(&key_path(&["a"])), Some(&Value::Number(1.0)));
        assert_eq!(value.get(&key_path(&["b", "d"])), Some(&Value::Number(3.0)));
        assert_eq!(
            value.get(&untouched),
            Some(&Value::array([4.0, 5.0]))
        );
        let after: *const Value = value.get(&untouched).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn completion_matches_destination_exactly() {
        let mut value = current();
        let destination = Value::object([
            ("a", Value::from(10.0)),
            (
                "b",
                Value::object([
                    ("c", Value::from(20.0)),
                    ("d", Value::from(30.0)),
                    ("e", Value::array([40.0, 50.0])),
                ]),
            ),
        ]);
        let plan = Interpolant::new(&value, &destination, Easing::EaseInOutCubic).unwrap();

        plan.sample_into(1.0, &mut value);
        assert_eq!(value, destination);
    }

    #[test]
    fn missing_destination_key_fails_at_compile_time() {
        let value = current();
        let destination = Value::object([("z", Value::from(1.0))]);
        let err = Interpolant::new(&value, &destination, Easing::Linear).unwrap_err();
        assert_eq!(
            err,
            InterpolateError::MissingEntry {
                path: "z".to_owned()
            }
        );
    }

    #[test]
    fn missing_array_index_names_the_path() {
        let value = current();
        let destination =
            Value::object([("b", Value::object([("e", Value::array([1.0, 2.0, 3.0]))]))]);
        let err = Interpolant::new(&value, &destination, Easing::Linear).unwrap_err();
        assert_eq!(
            err,
            InterpolateError::MissingEntry {
                path: "b.e[2]".to_owned()
            }
        );
    }

    #[test]
    fn kind_mismatch_names_both_kinds() {
        let value = current();
        let destination = Value::object([("a", Value::object([("x", Value::from(1.0))]))]);
        let err = Interpolant::new(&value, &destination, Easing::Linear).unwrap_err();
        assert_eq!(
            err,
            InterpolateError::KindMismatch {
                path: "a".to_owned(),
                expected: "number",
                found: "object",
            }
        );
    }

    #[test]
    fn non_finite_leaves_are_rejected_on_either_side() {
        let value = Value::from(f64::INFINITY);
        let destination = Value::from(1.0);
        assert!(matches!(
            Interpolant::new(&value, &destination, Easing::Linear),
            Err(InterpolateError::NonFinite { .. })
        ));

        let value = Value::from(0.0);
        let destination = Value::from(f64::NEG_INFINITY);
        assert!(matches!(
            Interpolant::new(&value, &destination, Easing::Linear),
            Err(InterpolateError::NonFinite { .. })
        ));
    }

    #[test]
    fn text_and_bool_leaves_snap_at_completion() {
        let mut value = Value::object([("label", Value::from("before")), ("on", Value::from(false))]);
        let destination = Value::object([("label", Value::from("after")), ("on", Value::from(true))]);
        let plan = Interpolant::new(&value, &destination, Easing::Linear).unwrap();

        plan.sample_into(0.99, &mut value);
        assert_eq!(
            value.get(&key_path(&["label"])),
            Some(&Value::Text("before".to_owned()))
        );

        plan.sample_into(1.0, &mut value);
        assert_eq!(
            value.get(&key_path(&["label"])),
            Some(&Value::Text("after".to_owned()))
        );
        assert_eq!(value.get(&key_path(&["on"])), Some(&Value::Bool(true)));
    }

    #[test]
    fn top_level_number_tween() {
        let mut value = Value::from(0.0);
        let plan = Interpolant::new(&value, &Value::from(10.0), Easing::Linear).unwrap();
        plan.sample_into(0.3, &mut value);
        assert_eq!(value, Value::Number(3.0));
    }

    #[test]
    fn easing_is_applied_before_lerp() {
        let mut value = Value::from(0.0);
        let plan = Interpolant::new(&value, &Value::from(1.0), Easing::EaseInQuad).unwrap();
        plan.sample_into(0.5, &mut value);
        assert_eq!(value, Value::Number(0.25));
    }
}
