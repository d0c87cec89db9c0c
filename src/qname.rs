//! Qualified names (Spec 7.1.7).
//!
//! Ein QName ist `(uri, local-name, optionaler Prefix)`. Der Prefix ist nur
//! bei `Preserve.prefixes` Teil des Streams und geht nicht in die
//! Gleichheit ein (Spec 7.1.7: zwei QNames sind gleich, wenn URI und
//! Local-Name übereinstimmen).

use std::fmt;
use std::rc::Rc;

/// A qualified name.
#[derive(Debug, Clone)]
pub struct QName {
    /// Namespace-URI (leer = kein Namespace).
    pub uri: Rc<str>,
    /// Local name.
    pub local_name: Rc<str>,
    /// Prefix, falls erhalten.
    pub prefix: Option<Rc<str>>,
}

impl QName {
    /// Creates a QName without prefix.
    pub fn new(uri: impl Into<Rc<str>>, local_name: impl Into<Rc<str>>) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Creates a QName with prefix.
    pub fn with_prefix(
        uri: impl Into<Rc<str>>,
        local_name: impl Into<Rc<str>>,
        prefix: impl Into<Rc<str>>,
    ) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// Creates a QName with optional prefix.
    pub fn with_optional_prefix(
        uri: impl Into<Rc<str>>,
        local_name: impl Into<Rc<str>>,
        prefix: Option<Rc<str>>,
    ) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
            prefix,
        }
    }

    /// Die lexikalische Form `prefix:local` bzw. `local`.
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(p) if !p.is_empty() => format!("{p}:{}", self.local_name),
            _ => self.local_name.to_string(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        // Prefix ist Präsentation, nicht Identität (Spec 7.1.7)
        self.uri == other.uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl std::hash::Hash for QName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_prefix() {
        let a = QName::new("urn:x", "item");
        let b = QName::with_prefix("urn:x", "item", "p");
        assert_eq!(a, b);

        let c = QName::new("urn:y", "item");
        assert_ne!(a, c);
        let d = QName::new("urn:x", "other");
        assert_ne!(a, d);
    }

    #[test]
    fn hash_consistent_with_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(QName::new("urn:x", "item"));
        assert!(set.contains(&QName::with_prefix("urn:x", "item", "p")));
    }

    #[test]
    fn display_clark_notation() {
        assert_eq!(QName::new("", "a").to_string(), "a");
        assert_eq!(QName::new("urn:x", "a").to_string(), "{urn:x}a");
    }

    #[test]
    fn lexical_form() {
        assert_eq!(QName::new("urn:x", "a").lexical(), "a");
        assert_eq!(QName::with_prefix("urn:x", "a", "p").lexical(), "p:a");
        // leerer Prefix = Default-Namespace, keine Doppelpunkt-Form
        assert_eq!(QName::with_prefix("urn:x", "a", "").lexical(), "a");
    }
}
