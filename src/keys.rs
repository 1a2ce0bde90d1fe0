//! Key path evaluation and canonical key strings.
//!
//! Primary and foreign keys are declared as lists of dotted paths into a
//! document. Each path step may carry an array suffix:
//!
//! | Step | Effect on an array value |
//! |------|--------------------------|
//! | `name` | keep the array itself |
//! | `name[2]` | keep element 2, drop the value if out of bounds |
//! | `name[]` | expand into every element |
//!
//! A path that does not apply to a document yields no values rather than an
//! error, so one key declaration can be applied to heterogeneous documents.

use serde_json::Value;

/// Array suffix of a path step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySelector {
    /// No suffix.
    None,
    /// `[n]`
    Index(usize),
    /// `[]`
    All,
}

/// One `.`-separated step of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Member name; empty when the step only selects array elements.
    pub name: String,
    pub selector: ArraySelector,
}

impl PathStep {
    fn parse(raw: &str) -> Self {
        if let Some(open) = raw.rfind('[') {
            if let Some(inner) = raw[open + 1..].strip_suffix(']') {
                let selector = if inner.is_empty() {
                    Some(ArraySelector::All)
                } else if inner.bytes().all(|b| b.is_ascii_digit()) {
                    inner.parse().ok().map(ArraySelector::Index)
                } else {
                    None
                };
                if let Some(selector) = selector {
                    return Self {
                        name: raw[..open].to_string(),
                        selector,
                    };
                }
            }
        }
        Self {
            name: raw.to_string(),
            selector: ArraySelector::None,
        }
    }
}

/// A parsed key path. The empty path and `.` denote the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    steps: Vec<PathStep>,
}

impl KeyPath {
    pub fn parse(path: &str) -> Self {
        if path.is_empty() || path == "." {
            return Self { steps: Vec::new() };
        }
        let steps = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(PathStep::parse)
            .collect();
        Self { steps }
    }

    /// Evaluate the path against `root`, returning the matched values in
    /// document order.
    pub fn evaluate<'v>(&self, root: &'v Value) -> Vec<&'v Value> {
        let mut current = vec![root];

        for step in &self.steps {
            if current.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(current.len());
            for value in current {
                let value = if step.name.is_empty() {
                    value
                } else {
                    match value {
                        Value::Object(map) => match map.get(&step.name) {
                            Some(member) => member,
                            None => continue,
                        },
                        _ => continue,
                    }
                };

                match (value, step.selector) {
                    (Value::Array(items), ArraySelector::Index(i)) => {
                        if let Some(item) = items.get(i) {
                            next.push(item);
                        }
                    }
                    (Value::Array(items), ArraySelector::All) => next.extend(items.iter()),
                    (other, _) => next.push(other),
                }
            }
            current = next;
        }

        current
    }
}

/// Literal text form of a materialized value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Materialize `path` against `document` as strings.
pub fn materialize(document: &Value, path: &str) -> Vec<String> {
    KeyPath::parse(path)
        .evaluate(document)
        .into_iter()
        .map(value_text)
        .collect()
}

/// Materialize every member of a key definition, one value list per member.
pub fn key_values<S: AsRef<str>>(document: &Value, members: &[S]) -> Vec<Vec<String>> {
    members
        .iter()
        .map(|member| materialize(document, member.as_ref()))
        .collect()
}

/// Generate canonical key strings from per-component value lists.
///
/// Returns nothing when there are no components or any component has no
/// values. Otherwise returns the Cartesian product, each tuple keeping
/// component order and serialized as a compact JSON array of strings.
pub fn generate_key_strings<S: AsRef<str>>(components: &[Vec<S>]) -> Vec<String> {
    if components.is_empty() || components.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut tuples: Vec<Vec<&str>> = vec![Vec::new()];
    for values in components {
        let mut extended = Vec::with_capacity(tuples.len() * values.len());
        for value in values {
            for base in &tuples {
                let mut tuple = Vec::with_capacity(base.len() + 1);
                tuple.extend_from_slice(base);
                tuple.push(value.as_ref());
                extended.push(tuple);
            }
        }
        tuples = extended;
    }

    tuples.iter().map(|tuple| canonical_key(tuple)).collect()
}

/// Canonical serialized form of a key tuple.
pub fn canonical_key(tuple: &[&str]) -> String {
    Value::Array(
        tuple
            .iter()
            .map(|component| Value::String((*component).to_string()))
            .collect(),
    )
    .to_string()
}
