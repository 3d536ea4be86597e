use std::collections::HashSet;

/// Tags that survive sanitization.
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "u", "span", "div", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Attributes that survive on allowed tags.
pub const ALLOWED_ATTRS: &[&str] = &["href", "target"];

/// Tags removed together with their content no matter what the allow-list
/// says.
pub const DENIED_TAGS: &[&str] = &["script", "iframe", "object", "embed", "form", "input", "button"];

/// Event-handler attributes removed no matter what the allow-list says.
pub const DENIED_ATTRS: &[&str] = &[
    "onerror", "onload", "onclick", "onmouseover", "onfocus", "onblur", "onchange", "onsubmit",
];

/// Tag and attribute tables driving sanitization. The deny-list is checked
/// first and always wins over the allow-list.
#[derive(Debug, Clone)]
pub struct Policy {
    allowed_tags: HashSet<String>,
    allowed_attrs: HashSet<String>,
    denied_tags: HashSet<String>,
    denied_attrs: HashSet<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_tags: ALLOWED_TAGS.iter().map(|s| s.to_string()).collect(),
            allowed_attrs: ALLOWED_ATTRS.iter().map(|s| s.to_string()).collect(),
            denied_tags: DENIED_TAGS.iter().map(|s| s.to_string()).collect(),
            denied_attrs: DENIED_ATTRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Policy {
    /// `name` must already be lowercased.
    pub fn tag_allowed(&self, name: &str) -> bool {
        !self.denied_tags.contains(name) && self.allowed_tags.contains(name)
    }

    /// `name` must already be lowercased.
    pub fn attr_allowed(&self, name: &str) -> bool {
        !self.denied_attrs.contains(name) && self.allowed_attrs.contains(name)
    }

    /// Extend the tag allow-list. A denied tag stays denied.
    pub fn allow_tag(&mut self, name: &str) {
        self.allowed_tags.insert(name.to_ascii_lowercase());
    }

    /// Extend the attribute allow-list. A denied attribute stays denied.
    pub fn allow_attr(&mut self, name: &str) {
        self.allowed_attrs.insert(name.to_ascii_lowercase());
    }
}
