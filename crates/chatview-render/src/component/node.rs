/// A resolved component tree node.
///
/// Produced by the sandbox once every user component has been called, so
/// only intrinsic tags, text and chart placeholders remain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element {
        tag: String,
        /// Displayable attributes (`href`, `placeholder`, `value`, ...).
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
    /// Chart drawn from a chart component, by index into the output's charts.
    Chart(usize),
    /// `<canvas>`: where canvas-drawn charts are placed.
    Canvas,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Node::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            Node::Chart(_) | Node::Canvas => {}
        }
    }
}
