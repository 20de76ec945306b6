use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding a passage's `"x,y"` editor position
pub const POSITION: &str = "position";

/// Metadata key holding a passage's `"width,height"` editor size
pub const SIZE: &str = "size";

/// A single named unit of story content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passage {
    /// The name of the passage
    pub name: String,

    /// The tags of the passage, in order. Duplicates are permitted
    pub tags: Vec<String>,

    /// Open metadata. `position` and `size` are opaque comma-pair strings
    pub metadata: Map<String, Value>,

    /// The body of the passage
    pub text: String,
}

impl Passage {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, text: T) -> Self {
        Passage {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The `position` metadata, if present and a string
    pub fn position(&self) -> Option<&str> {
        self.metadata.get(POSITION).and_then(Value::as_str)
    }

    /// The `size` metadata, if present and a string
    pub fn size(&self) -> Option<&str> {
        self.metadata.get(SIZE).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder() {
        let mut metadata = Map::new();
        metadata.insert(POSITION.to_string(), json!("100,200"));
        metadata.insert(SIZE.to_string(), json!(42));
        let passage = Passage::new("Start", "Hello")
            .with_tags(vec!["a", "b", "a"])
            .with_metadata(metadata);

        assert_eq!(passage.tags, vec!["a", "b", "a"]);
        assert!(passage.has_tag("b"));
        assert!(!passage.has_tag("c"));
        assert_eq!(passage.position(), Some("100,200"));
        // Non-string values are left alone but aren't reported as a size
        assert_eq!(passage.size(), None);
    }
}
