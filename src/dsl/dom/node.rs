//! Tree nodes produced by the article parser.

/// Name of the phonetic transcription tag.
pub const TRANSCRIPTION_TAG: &str = "t";
/// Name of the media (sound/picture) tag.
pub const MEDIA_TAG: &str = "s";
/// Lingvo's "not for indexing" tag, skipped together with transcriptions.
pub const NO_INDEX_TAG: &str = "!trs";

/// A tag with an ordered list of exclusively owned children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    /// Everything between the tag name and `]`, verbatim.
    pub attrs: String,
    pub children: Vec<Node>,
}

impl TagNode {
    pub fn new(name: impl Into<String>, attrs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: attrs.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

/// A DOM node: either a tag or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Tag(TagNode),
    Text(String),
}

impl Node {
    pub fn tag(name: impl Into<String>, attrs: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Tag(TagNode::new(name, attrs).with_children(children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Node::Tag(_))
    }

    /// Tag name, or `None` for text nodes.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Tag(tag) => Some(&tag.name),
            Node::Text(_) => None,
        }
    }

    /// Children of a tag; text nodes have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Tag(tag) => &tag.children,
            Node::Text(_) => &[],
        }
    }

    fn is_transcription(&self) -> bool {
        matches!(self.name(), Some(TRANSCRIPTION_TAG | NO_INDEX_TAG))
    }

    /// Concatenates all descendant text in document order, dropping markup.
    ///
    /// With `strip_transcription`, subtrees rooted at `[t]` and `[!trs]`
    /// are skipped entirely.
    pub fn render_as_text(&self, strip_transcription: bool) -> String {
        let mut text = String::new();
        self.render_into(&mut text, strip_transcription);
        text
    }

    fn render_into(&self, out: &mut String, strip_transcription: bool) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Tag(tag) => {
                for child in &tag.children {
                    if strip_transcription && child.is_transcription() {
                        continue;
                    }
                    child.render_into(out, strip_transcription);
                }
            }
        }
    }
}
