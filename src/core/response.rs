use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::document::DocType;
use crate::core::request::PresentationRequest;

/// Identity of one requested element: `(doc type, namespace, element key)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementIdentity {
    pub doc_type: DocType,
    pub namespace: String,
    pub element: String,
}

impl ElementIdentity {
    pub fn new(
        doc_type: impl Into<DocType>,
        namespace: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: doc_type.into(),
            namespace: namespace.into(),
            element: element.into(),
        }
    }
}

/// The holder's choice of which requested elements to disclose.
///
/// The coordinator never sees partial edits, only the final mapping at
/// prepare-time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureSelection {
    entries: BTreeMap<ElementIdentity, bool>,
}

impl DisclosureSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether `identity` should be included in the response.
    pub fn set(&mut self, identity: ElementIdentity, include: bool) {
        self.entries.insert(identity, include);
    }

    pub fn include(mut self, identity: ElementIdentity) -> Self {
        self.set(identity, true);
        self
    }

    pub fn exclude(mut self, identity: ElementIdentity) -> Self {
        self.set(identity, false);
        self
    }

    /// Select every element of the request.
    pub fn select_all(request: &PresentationRequest) -> Self {
        let mut selection = Self::new();
        for document in request.documents.iter() {
            for element in document.elements.iter() {
                selection.set(
                    ElementIdentity::new(
                        document.doc_type.clone(),
                        element.namespace.clone(),
                        element.element.clone(),
                    ),
                    true,
                );
            }
        }
        selection
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementIdentity, bool)> {
        self.entries.iter().map(|(identity, include)| (identity, *include))
    }
}

/// Transmission-ready response payload: selected element keys grouped by
/// `doc type → namespace → [element key]`. Documents and namespaces with no
/// selected elements are pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItems(BTreeMap<DocType, BTreeMap<String, Vec<String>>>);

impl ResponseItems {
    /// Reduce a selection to the grouped structure, keeping only elements
    /// marked for inclusion.
    pub fn from_selection(selection: &DisclosureSelection) -> Self {
        let mut items: BTreeMap<DocType, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for (identity, include) in selection.iter() {
            if !include {
                continue;
            }
            items
                .entry(identity.doc_type.clone())
                .or_default()
                .entry(identity.namespace.clone())
                .or_default()
                .push(identity.element.clone());
        }
        Self(items)
    }

    /// True when no element at all was selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.0.len()
    }

    pub fn documents(&self) -> impl Iterator<Item = (&DocType, &BTreeMap<String, Vec<String>>)> {
        self.0.iter()
    }

    /// Selected element keys for one `(doc type, namespace)` pair.
    pub fn elements(&self, doc_type: &DocType, namespace: &str) -> Option<&[String]> {
        self.0
            .get(doc_type)
            .and_then(|namespaces| namespaces.get(namespace))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_groups_by_doc_type_and_namespace() {
        let selection = DisclosureSelection::new()
            .include(ElementIdentity::new("doc-a", "ns1", "e1"))
            .include(ElementIdentity::new("doc-a", "ns1", "e2"))
            .include(ElementIdentity::new("doc-a", "ns2", "e3"))
            .include(ElementIdentity::new("doc-b", "ns1", "e4"));

        let items = ResponseItems::from_selection(&selection);
        assert_eq!(items.document_count(), 2);
        assert_eq!(
            items.elements(&"doc-a".into(), "ns1"),
            Some(&["e1".to_string(), "e2".to_string()][..])
        );
        assert_eq!(
            items.elements(&"doc-a".into(), "ns2"),
            Some(&["e3".to_string()][..])
        );
        assert_eq!(
            items.elements(&"doc-b".into(), "ns1"),
            Some(&["e4".to_string()][..])
        );
    }

    #[test]
    fn deselected_elements_are_pruned() {
        let selection = DisclosureSelection::new()
            .include(ElementIdentity::new("doc-a", "ns1", "e1"))
            .exclude(ElementIdentity::new("doc-a", "ns1", "e2"))
            .exclude(ElementIdentity::new("doc-b", "ns1", "e3"));

        let items = ResponseItems::from_selection(&selection);
        assert_eq!(items.document_count(), 1);
        assert_eq!(
            items.elements(&"doc-a".into(), "ns1"),
            Some(&["e1".to_string()][..])
        );
        assert!(items.elements(&"doc-b".into(), "ns1").is_none());
    }

    #[test]
    fn fully_deselected_reduction_is_empty() {
        let selection = DisclosureSelection::new()
            .exclude(ElementIdentity::new("doc-a", "ns1", "e1"))
            .exclude(ElementIdentity::new("doc-b", "ns1", "e2"));

        assert!(ResponseItems::from_selection(&selection).is_empty());
    }

    #[test]
    fn serialized_shape_is_doc_type_then_namespace() {
        let selection = DisclosureSelection::new()
            .include(ElementIdentity::new("doc-a", "ns1", "e1"))
            .include(ElementIdentity::new("doc-a", "ns1", "e2"));

        let value = serde_json::to_value(ResponseItems::from_selection(&selection)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "doc-a": { "ns1": ["e1", "e2"] } })
        );
    }

    #[test]
    fn partially_empty_selection_is_not_empty() {
        // doc-b contributes nothing, but doc-a has a selected element, so the
        // reduced structure as a whole is non-empty.
        let selection = DisclosureSelection::new()
            .include(ElementIdentity::new("doc-a", "ns1", "e1"))
            .exclude(ElementIdentity::new("doc-b", "ns1", "e2"));

        let items = ResponseItems::from_selection(&selection);
        assert!(!items.is_empty());
        assert_eq!(items.document_count(), 1);
    }
}
