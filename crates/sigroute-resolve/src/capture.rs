//! Capture propagation.
//!
//! A node's `Capture` parameters are written into the request scope as soon as
//! they resolve, so later parameters of the same node and every descendant see
//! them. [`CapturePropagator`] marks the scope before a node is evaluated and
//! rolls it back unless the node is committed, which keeps a rejected node's
//! captures away from its siblings.

use sigroute_core::{Captured, Checkpoint, ParameterSpec, ResolutionContext, Value};

/// Scope guard for the captures of one node.
///
/// Dropping the guard without calling [`commit`](Self::commit) removes every
/// capture made through it.
///
/// ```rust
/// use sigroute_core::{Modifier, Modifiers, ParameterSpec, ResolutionContext, Value};
/// use sigroute_resolve::CapturePropagator;
///
/// let spec = ParameterSpec::new("user", "User", Modifiers::none().with(Modifier::Capture));
/// let mut scope = ResolutionContext::new();
///
/// {
///     let mut frame = CapturePropagator::enter(&mut scope, "find_user");
///     frame.propagate(&spec, &Value::new(42_u64));
///     assert!(frame.scope().contains("User"));
///     // dropped without commit
/// }
/// assert!(scope.is_empty());
/// ```
#[derive(Debug)]
pub struct CapturePropagator<'a> {
    scope: &'a mut ResolutionContext,
    checkpoint: Checkpoint,
    node: &'a str,
    committed: bool,
}

impl<'a> CapturePropagator<'a> {
    /// Marks `scope` before evaluating `node`.
    pub fn enter(scope: &'a mut ResolutionContext, node: &'a str) -> Self {
        let checkpoint = scope.checkpoint();
        Self {
            scope,
            checkpoint,
            node,
            committed: false,
        }
    }

    /// Returns the scope as seen by the node, including its own captures so far.
    pub fn scope(&self) -> &ResolutionContext {
        self.scope
    }

    /// Writes `value` to the scope if `spec` is marked `Capture`.
    ///
    /// Returns true if the value was captured.
    pub fn propagate(&mut self, spec: &ParameterSpec, value: &Value) -> bool {
        if !spec.is_capture() {
            return false;
        }
        tracing::trace!(
            node = %self.node,
            capability = %spec.capability(),
            "value captured"
        );
        self.scope.capture(spec.capability(), self.node, value.clone());
        true
    }

    /// Returns the captures made through this guard.
    pub fn captures(&self) -> &[Captured] {
        self.scope.since(self.checkpoint)
    }

    /// Keeps the captures and returns a copy of them.
    pub fn commit(mut self) -> Vec<Captured> {
        self.committed = true;
        self.captures().to_vec()
    }

    /// Discards the captures.
    pub fn reject(self) {}
}

impl Drop for CapturePropagator<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.scope.rollback(self.checkpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigroute_core::{Modifier, Modifiers};

    fn capture(name: &str, capability: &str) -> ParameterSpec {
        ParameterSpec::new(name, capability, Modifiers::none().with(Modifier::Capture))
    }

    fn plain(name: &str, capability: &str) -> ParameterSpec {
        ParameterSpec::new(name, capability, Modifiers::none())
    }

    #[test]
    fn test_only_capture_specs_propagate() {
        let mut scope = ResolutionContext::new();
        let mut frame = CapturePropagator::enter(&mut scope, "find_user");
        assert!(!frame.propagate(&plain("id", "UserId"), &Value::new(42_u64)));
        assert!(frame.propagate(&capture("user", "User"), &Value::new("alice")));
        let captures = frame.commit();

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].capability, "User");
        assert_eq!(captures[0].origin, "find_user");
        assert!(scope.contains("User"));
        assert!(!scope.contains("UserId"));
    }

    #[test]
    fn test_reject_rolls_back_only_own_captures() {
        let mut scope = ResolutionContext::new();
        scope.capture("Org", "find_org", Value::new(7_u32));

        let mut frame = CapturePropagator::enter(&mut scope, "find_user");
        frame.propagate(&capture("user", "User"), &Value::new("alice"));
        assert_eq!(frame.captures().len(), 1);
        frame.reject();

        assert!(scope.contains("Org"));
        assert!(!scope.contains("User"));
    }

    #[test]
    fn test_sibling_does_not_see_capture() {
        let mut scope = ResolutionContext::new();
        let parent = CapturePropagator::enter(&mut scope, "root").commit();
        assert!(parent.is_empty());

        {
            let mut first = CapturePropagator::enter(&mut scope, "first_child");
            first.propagate(&capture("tab", "Tab"), &Value::new(1_u8));
            let mut grandchild = CapturePropagator::enter(&mut *first.scope, "grandchild");
            assert!(grandchild.scope().contains("Tab"));
            grandchild.propagate(&plain("x", "X"), &Value::new(0_u8));
        }

        let second = CapturePropagator::enter(&mut scope, "second_child");
        assert!(!second.scope().contains("Tab"));
    }

    #[test]
    fn test_later_capture_shadows_ancestor() {
        let mut scope = ResolutionContext::new();
        scope.capture("User", "find_user", Value::new(1_u32));

        let mut frame = CapturePropagator::enter(&mut scope, "switch_user");
        frame.propagate(&capture("user", "User"), &Value::new(2_u32));
        assert_eq!(frame.scope().captured::<u32>("User").as_deref(), Some(&2));
        drop(frame);

        assert_eq!(scope.captured::<u32>("User").as_deref(), Some(&1));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn uncommitted_frame_leaves_scope_as_found(
                before in 0usize..4,
                marks in proptest::collection::vec(any::<bool>(), 0..8),
            ) {
                let mut scope = ResolutionContext::new();
                for i in 0..before {
                    scope.capture(format!("Outer{i}"), "outer", Value::new(i));
                }

                {
                    let mut frame = CapturePropagator::enter(&mut scope, "node");
                    for (i, is_capture) in marks.iter().enumerate() {
                        let spec = if *is_capture {
                            capture(&format!("p{i}"), &format!("Cap{i}"))
                        } else {
                            plain(&format!("p{i}"), &format!("Cap{i}"))
                        };
                        frame.propagate(&spec, &Value::new(i));
                    }
                    let expected = marks.iter().filter(|m| **m).count();
                    prop_assert_eq!(frame.captures().len(), expected);
                }

                prop_assert_eq!(scope.len(), before);
            }

            #[test]
            fn commit_returns_captures_in_order(marks in proptest::collection::vec(any::<bool>(), 0..8)) {
                let mut scope = ResolutionContext::new();
                let mut frame = CapturePropagator::enter(&mut scope, "node");
                for (i, is_capture) in marks.iter().enumerate() {
                    let spec = if *is_capture {
                        capture(&format!("p{i}"), &format!("Cap{i}"))
                    } else {
                        plain(&format!("p{i}"), &format!("Cap{i}"))
                    };
                    frame.propagate(&spec, &Value::new(i));
                }
                let committed: Vec<String> = frame.commit().into_iter().map(|c| c.capability).collect();
                let expected: Vec<String> = marks
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| **m)
                    .map(|(i, _)| format!("Cap{i}"))
                    .collect();

                prop_assert_eq!(&committed, &expected);
                prop_assert_eq!(scope.len(), expected.len());
            }
        }
    }
}
