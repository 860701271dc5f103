use std::fmt;

/// The node kinds understood by the built-in registry.
///
/// Graphs may contain any other tag; those nodes are handled by the opaque
/// fallback and keep their content verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Input,
    Output,
    Expression,
    DecisionTable,
    Switch,
    Function,
    Decision,
    Custom,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Input,
        NodeKind::Output,
        NodeKind::Expression,
        NodeKind::DecisionTable,
        NodeKind::Switch,
        NodeKind::Function,
        NodeKind::Decision,
        NodeKind::Custom,
    ];

    /// The canonical JDM tag stored in a node's `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Input => "inputNode",
            NodeKind::Output => "outputNode",
            NodeKind::Expression => "expressionNode",
            NodeKind::DecisionTable => "decisionTableNode",
            NodeKind::Switch => "switchNode",
            NodeKind::Function => "functionNode",
            NodeKind::Decision => "decisionNode",
            NodeKind::Custom => "customNode",
        }
    }

    /// Short names accepted in addition to the canonical tag.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Input => &["input", "request"],
            NodeKind::Output => &["output", "response"],
            NodeKind::Expression => &["expression", "expr"],
            NodeKind::DecisionTable => &["decisionTable", "table"],
            NodeKind::Switch => &["switch"],
            NodeKind::Function => &["function"],
            NodeKind::Decision => &["decision"],
            NodeKind::Custom => &["custom"],
        }
    }

    pub fn from_tag(tag: &str) -> Option<NodeKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag || kind.aliases().contains(&tag))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
