//! Canonical comparison of namespace-qualified address headers.
//!
//! Two headers are logically equal when they carry the same element name,
//! namespace, attribute set, and content, regardless of the order
//! attributes were emitted in or any serialization formatting. Equality and
//! hashing both go through one stable canonical form, so equal headers
//! always collide correctly in hash-based containers.
//!
//! # Canonicalization Rules
//!
//! 1. The form starts with the element's namespace and local name.
//! 2. Attributes are sorted by (namespace, local name, value).
//! 3. The reference-parameter marker attribute is omitted when it sits in a
//!    recognized addressing namespace: it is a protocol-version artifact
//!    that does not affect logical identity.
//! 4. Every lexeme is length-prefixed, so no crafted value can collide with
//!    a field boundary.
//! 5. Content is appended last.

use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// WS-Addressing August 2004 namespace.
pub const ADDRESSING_NS_200408: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";

/// WS-Addressing 1.0 namespace.
pub const ADDRESSING_NS_10: &str = "http://www.w3.org/2005/08/addressing";

/// Marker attribute flagging a header as a reference parameter. Present in
/// some protocol versions only; never part of a header's logical identity.
const REFERENCE_PARAMETER_ATTR: &str = "IsReferenceParameter";

/// One namespace-qualified attribute on an address header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderAttribute {
    namespace: String,
    local_name: String,
    value: String,
}

impl HeaderAttribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Whether this is a version-specific marker excluded from canonical
    /// identity.
    fn is_version_marker(&self) -> bool {
        self.local_name == REFERENCE_PARAMETER_ATTR
            && (self.namespace == ADDRESSING_NS_200408 || self.namespace == ADDRESSING_NS_10)
    }
}

/// A namespace-qualified address header compared by canonical form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressHeader {
    namespace: String,
    local_name: String,
    content: String,
    attributes: Vec<HeaderAttribute>,
}

impl AddressHeader {
    /// Creates a header with no attributes.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            content: content.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute. Emission order is irrelevant to identity.
    #[must_use]
    pub fn with_attribute(mut self, attribute: HeaderAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Element namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Element local name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Element content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Attributes as provided, unsorted.
    #[must_use]
    pub fn attributes(&self) -> &[HeaderAttribute] {
        &self.attributes
    }

    /// Renders the stable canonical form.
    ///
    /// Byte-identical canonical forms define header equality; the hash is
    /// computed over the same rendering.
    #[must_use]
    pub fn canonical_form(&self) -> String {
        let mut out = String::new();
        push_lexeme(&mut out, &self.namespace);
        push_lexeme(&mut out, &self.local_name);

        let mut attributes: Vec<&HeaderAttribute> = self
            .attributes
            .iter()
            .filter(|attribute| !attribute.is_version_marker())
            .collect();
        attributes.sort_by(|a, b| {
            (&a.namespace, &a.local_name, &a.value).cmp(&(&b.namespace, &b.local_name, &b.value))
        });
        for attribute in attributes {
            push_lexeme(&mut out, &attribute.namespace);
            push_lexeme(&mut out, &attribute.local_name);
            push_lexeme(&mut out, &attribute.value);
        }

        push_lexeme(&mut out, &self.content);
        out
    }
}

impl PartialEq for AddressHeader {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

impl Eq for AddressHeader {}

impl Hash for AddressHeader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_form().hash(state);
    }
}

/// Length-prefixes `lexeme` so field boundaries cannot be forged by crafted
/// values.
fn push_lexeme(out: &mut String, lexeme: &str) {
    let _ = write!(out, "{}:", lexeme.len());
    out.push_str(lexeme);
    out.push(';');
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::collections::hash_map::DefaultHasher;

    use proptest::prelude::*;

    use super::*;

    fn hash_of(header: &AddressHeader) -> u64 {
        let mut hasher = DefaultHasher::new();
        header.hash(&mut hasher);
        hasher.finish()
    }

    fn reply_to(attribute_order: &[(&str, &str, &str)]) -> AddressHeader {
        let mut header = AddressHeader::new(ADDRESSING_NS_10, "ReplyTo", "https://peer.example/svc");
        for (namespace, name, value) in attribute_order {
            header = header.with_attribute(HeaderAttribute::new(*namespace, *name, *value));
        }
        header
    }

    #[test]
    fn attribute_emission_order_is_irrelevant() {
        let a = reply_to(&[("urn:x", "role", "peer"), ("urn:y", "zone", "dmz")]);
        let b = reply_to(&[("urn:y", "zone", "dmz"), ("urn:x", "role", "peer")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn reference_parameter_marker_is_ignored() {
        let plain = reply_to(&[("urn:x", "role", "peer")]);
        let marked = reply_to(&[("urn:x", "role", "peer")]).with_attribute(HeaderAttribute::new(
            ADDRESSING_NS_10,
            "IsReferenceParameter",
            "true",
        ));
        assert_eq!(plain, marked);
        assert_eq!(hash_of(&plain), hash_of(&marked));
    }

    #[test]
    fn marker_name_in_foreign_namespace_is_significant() {
        let plain = reply_to(&[]);
        let foreign =
            reply_to(&[("urn:not-addressing", "IsReferenceParameter", "true")]);
        assert_ne!(plain, foreign);
    }

    #[test]
    fn differing_content_is_detected() {
        let a = AddressHeader::new(ADDRESSING_NS_10, "To", "https://a.example");
        let b = AddressHeader::new(ADDRESSING_NS_10, "To", "https://b.example");
        assert_ne!(a, b);
    }

    #[test]
    fn differing_namespace_is_detected() {
        let a = AddressHeader::new(ADDRESSING_NS_10, "To", "https://a.example");
        let b = AddressHeader::new(ADDRESSING_NS_200408, "To", "https://a.example");
        assert_ne!(a, b);
    }

    #[test]
    fn crafted_values_cannot_forge_field_boundaries() {
        // Name/content split differs; a naive concatenation would collide.
        let a = AddressHeader::new("urn:ns", "ab", "c");
        let b = AddressHeader::new("urn:ns", "a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn equal_headers_collide_in_hash_containers() {
        let a = reply_to(&[("urn:x", "role", "peer"), ("urn:y", "zone", "dmz")]);
        let b = reply_to(&[("urn:y", "zone", "dmz"), ("urn:x", "role", "peer")]);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert_eq!(set.len(), 1);
    }

    fn attribute_strategy() -> impl Strategy<Value = (String, String, String)> {
        (
            "[a-z:]{1,12}",
            "[A-Za-z]{1,12}",
            "[ -~]{0,16}",
        )
    }

    proptest! {
        #[test]
        fn canonical_form_is_order_independent(
            (attributes, reordered) in proptest::collection::vec(attribute_strategy(), 0..6)
                .prop_flat_map(|attrs| (Just(attrs.clone()), Just(attrs).prop_shuffle())),
        ) {
            let build = |attrs: &[(String, String, String)]| {
                let mut header =
                    AddressHeader::new(ADDRESSING_NS_10, "ReplyTo", "https://peer.example/svc");
                for (namespace, name, value) in attrs {
                    header = header
                        .with_attribute(HeaderAttribute::new(namespace, name, value));
                }
                header
            };

            let a = build(&attributes);
            let b = build(&reordered);
            prop_assert_eq!(a.canonical_form(), b.canonical_form());
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }
}
