//! Handler signatures.
//!
//! A [`SignatureDescriptor`] is the ordered list of capability parameters a
//! route node needs before it may serve a request. It is plain data, built
//! once at startup and never mutated afterwards.

use crate::error::SignatureError;
use std::collections::HashSet;
use std::fmt;

/// A parameter modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// The resolved value is made visible to descendant nodes.
    Capture,
    /// A missing value binds empty instead of rejecting the node.
    Optional,
}

/// The set of modifiers on a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    capture: bool,
    optional: bool,
}

impl Modifiers {
    /// No modifiers: a required, non-captured parameter.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            capture: false,
            optional: false,
        }
    }

    /// Returns a copy with `modifier` added.
    #[must_use]
    pub const fn with(mut self, modifier: Modifier) -> Self {
        match modifier {
            Modifier::Capture => self.capture = true,
            Modifier::Optional => self.optional = true,
        }
        self
    }

    /// Returns true if `modifier` is present.
    #[must_use]
    pub const fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Capture => self.capture,
            Modifier::Optional => self.optional,
        }
    }

    /// Returns true if the value is propagated to descendants.
    #[must_use]
    pub const fn is_capture(&self) -> bool {
        self.capture
    }

    /// Returns true if a missing value is tolerated.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// One declared parameter: a name, the capability that produces it, and its
/// modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    name: String,
    capability: String,
    modifiers: Modifiers,
}

impl ParameterSpec {
    /// Creates a parameter spec.
    #[must_use]
    pub fn new(name: impl Into<String>, capability: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            capability: capability.into(),
            modifiers,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the capability name.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Returns the modifiers.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns true if this parameter is captured.
    #[must_use]
    pub const fn is_capture(&self) -> bool {
        self.modifiers.is_capture()
    }

    /// Returns true if this parameter is optional.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.modifiers.is_optional()
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.capability)?;
        if self.is_capture() {
            f.write_str(" :Capture")?;
        }
        if self.is_optional() {
            f.write_str(" :Optional")?;
        }
        write!(f, " {}", self.name)
    }
}

/// The ordered parameters a route node declares.
///
/// # Example
///
/// ```
/// use sigroute_core::SignatureDescriptor;
///
/// let signature = SignatureDescriptor::builder()
///     .capture("user", "User")
///     .optional("tab", "Tab")
///     .build()
///     .unwrap();
///
/// assert_eq!(signature.len(), 2);
/// assert_eq!(signature.capture_count(), 1);
/// assert_eq!(signature.get("tab").map(|p| p.capability()), Some("Tab"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureDescriptor {
    params: Vec<ParameterSpec>,
}

impl SignatureDescriptor {
    /// Returns the empty signature.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder::default()
    }

    /// Validates and wraps a list of parameter specs.
    pub fn from_specs(params: Vec<ParameterSpec>) -> Result<Self, SignatureError> {
        let mut seen = HashSet::with_capacity(params.len());

        for (position, spec) in params.iter().enumerate() {
            if spec.name.is_empty() {
                return Err(SignatureError::EmptyParameterName { position });
            }
            if spec.capability.is_empty() {
                return Err(SignatureError::EmptyCapability {
                    parameter: spec.name.clone(),
                });
            }
            if spec.is_capture() && spec.is_optional() {
                return Err(SignatureError::CaptureAndOptional {
                    parameter: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SignatureError::DuplicateParameter {
                    parameter: spec.name.clone(),
                });
            }
        }

        Ok(Self { params })
    }

    /// Returns the parameters in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.params.iter()
    }

    /// Returns the parameters as a slice.
    #[must_use]
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Returns a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if the signature declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of `Capture` parameters.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_capture()).count()
    }
}

impl fmt::Display for SignatureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Builder for [`SignatureDescriptor`]. Validation happens in [`build`].
///
/// [`build`]: SignatureBuilder::build
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    params: Vec<ParameterSpec>,
}

impl SignatureBuilder {
    /// Adds a required parameter.
    #[must_use]
    pub fn required(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.spec(ParameterSpec::new(name, capability, Modifiers::none()))
    }

    /// Adds a required, captured parameter.
    #[must_use]
    pub fn capture(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.spec(ParameterSpec::new(
            name,
            capability,
            Modifiers::none().with(Modifier::Capture),
        ))
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.spec(ParameterSpec::new(
            name,
            capability,
            Modifiers::none().with(Modifier::Optional),
        ))
    }

    /// Adds a fully specified parameter.
    #[must_use]
    pub fn spec(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Validates the parameters and builds the descriptor.
    pub fn build(self) -> Result<SignatureDescriptor, SignatureError> {
        SignatureDescriptor::from_specs(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order() {
        let sig = SignatureDescriptor::builder()
            .required("a", "A")
            .capture("b", "B")
            .optional("c", "C")
            .build()
            .unwrap();

        let names: Vec<_> = sig.iter().map(ParameterSpec::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(sig.get("b").unwrap().is_capture());
        assert!(sig.get("c").unwrap().is_optional());
        assert!(!sig.get("a").unwrap().is_optional());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = SignatureDescriptor::builder()
            .required("user", "User")
            .required("user", "Admin")
            .build()
            .unwrap_err();
        assert!(matches!(err, SignatureError::DuplicateParameter { parameter } if parameter == "user"));
    }

    #[test]
    fn test_same_capability_twice_is_fine() {
        let sig = SignatureDescriptor::builder()
            .required("from", "Account")
            .required("to", "Account")
            .build()
            .unwrap();
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(
            SignatureDescriptor::builder().required("", "User").build(),
            Err(SignatureError::EmptyParameterName { position: 0 })
        ));
        assert!(matches!(
            SignatureDescriptor::builder().required("user", "").build(),
            Err(SignatureError::EmptyCapability { .. })
        ));
    }

    #[test]
    fn test_capture_and_optional_rejected() {
        let spec = ParameterSpec::new(
            "user",
            "User",
            [Modifier::Capture, Modifier::Optional].into_iter().collect(),
        );
        let err = SignatureDescriptor::builder().spec(spec).build().unwrap_err();
        assert!(matches!(err, SignatureError::CaptureAndOptional { .. }));
    }

    #[test]
    fn test_display() {
        let sig = SignatureDescriptor::builder()
            .capture("user", "User")
            .optional("tab", "Tab")
            .build()
            .unwrap();
        assert_eq!(sig.to_string(), "(User :Capture user, Tab :Optional tab)");
        assert_eq!(SignatureDescriptor::empty().to_string(), "()");
    }
}
