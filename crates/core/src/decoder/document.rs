//! Generic element tree produced by a [`Decoder`](super::Decoder).

/// One element of a decoded document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed character data directly inside this element.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child named `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Texts of every child named `name`, skipping empty ones.
    pub fn child_texts(&self, name: &str) -> Vec<String> {
        self.children_named(name)
            .filter(|c| !c.text.is_empty())
            .map(|c| c.text.clone())
            .collect()
    }
}

/// A decoded broker response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, text: &str) -> Element {
        Element {
            text: text.to_string(),
            ..Element::new(name)
        }
    }

    #[test]
    fn test_child_lookup() {
        let mut hit = Element::new("hit");
        hit.children.push(leaf("md-author", "Knuth"));
        hit.children.push(leaf("md-title", "TAOCP"));
        hit.children.push(leaf("md-author", "Graham"));
        hit.children.push(leaf("md-author", ""));

        assert_eq!(hit.child_text("md-title"), Some("TAOCP"));
        assert_eq!(hit.child_texts("md-author"), vec!["Knuth", "Graham"]);
        assert_eq!(hit.children_named("md-author").count(), 3);
        assert!(hit.child("md-year").is_none());
    }

    #[test]
    fn test_attr_lookup() {
        let mut location = Element::new("location");
        location.attributes.push(("id".into(), "z3950.loc.gov".into()));
        location.attributes.push(("name".into(), "LoC".into()));

        assert_eq!(location.attr("name"), Some("LoC"));
        assert_eq!(location.attr("checksum"), None);
    }
}
