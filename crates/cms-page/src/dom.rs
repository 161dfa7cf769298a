//! Arena-indexed document model
//!
//! A lightweight stand-in for the browser document: enough structure
//! for block tracking, anchor reconciliation, and the encode transform.
//! Nodes live in an arena and are addressed by [`NodeId`]; detached
//! subtrees simply become unreachable.

use std::collections::BTreeMap;

/// Index of a node within its [`Dom`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        children: Vec<NodeId>,
        parent: Option<NodeId>,
    },
    Text {
        text: String,
        parent: Option<NodeId>,
    },
}

/// A document fragment rooted at a single element
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Dom {
    /// A document with a single empty root element.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData::Element {
                tag: root_tag.into(),
                attrs: BTreeMap::new(),
                children: Vec::new(),
                parent: None,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.nodes.push(NodeData::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.push(NodeData::Text {
            text: text.into(),
            parent: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.nodes[child.0] {
            NodeData::Element { parent: slot, .. } | NodeData::Text { parent: slot, .. } => {
                *slot = Some(parent);
            }
        }
        if let NodeData::Element { children, .. } = &mut self.nodes[parent.0] {
            children.push(child);
        }
    }

    /// Remove `node` from its parent; the subtree becomes unreachable.
    pub fn detach(&mut self, node: NodeId) {
        let parent = self.parent(node);
        if let Some(parent) = parent {
            if let NodeData::Element { children, .. } = &mut self.nodes[parent.0] {
                children.retain(|child| *child != node);
            }
        }
        match &mut self.nodes[node.0] {
            NodeData::Element { parent: slot, .. } | NodeData::Text { parent: slot, .. } => {
                *slot = None;
            }
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0] {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text { .. } => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        match &self.nodes[node.0] {
            NodeData::Element { parent, .. } | NodeData::Text { parent, .. } => *parent,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.nodes[node.0] {
            NodeData::Element { children, .. } => children,
            NodeData::Text { .. } => &[],
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0] {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text { .. } => None,
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0] {
            attrs.insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0] {
            attrs.remove(name);
        }
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "id")
    }

    pub fn set_element_id(&mut self, node: NodeId, id: impl Into<String>) {
        self.set_attr(node, "id", id);
    }

    pub fn strip_element_id(&mut self, node: NodeId) {
        self.remove_attr(node, "id");
    }

    /// First element in document order with the given id.
    pub fn find_by_element_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.element_id(*node) == Some(id))
    }

    /// Preorder traversal of the subtree rooted at `node`, including
    /// `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            result.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        result
    }

    /// Whether `node` lies in the subtree rooted at `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Elements strictly between `ancestor` and `node` (exclusive ends),
    /// closest first.
    pub fn path_between(&self, ancestor: NodeId, node: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return path;
            }
            path.push(id);
            current = self.parent(id);
        }
        Vec::new()
    }

    /// Drop all children of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children: Vec<NodeId> = self.children(node).to_vec();
        for child in children {
            self.detach(child);
        }
    }

    /// Deep-copy the subtree rooted at `node` into a new document.
    pub fn clone_subtree(&self, node: NodeId) -> Dom {
        let mut clone = match &self.nodes[node.0] {
            NodeData::Element { tag, attrs, .. } => {
                let mut dom = Dom::new(tag.clone());
                if let NodeData::Element { attrs: slot, .. } = &mut dom.nodes[0] {
                    *slot = attrs.clone();
                }
                dom
            }
            NodeData::Text { text, .. } => {
                let mut dom = Dom::new("span");
                let child = dom.create_text(text.clone());
                dom.append_child(dom.root, child);
                dom
            }
        };
        let root = clone.root;
        for child in self.children(node) {
            self.copy_into(&mut clone, root, *child);
        }
        clone
    }

    fn copy_into(&self, dest: &mut Dom, dest_parent: NodeId, node: NodeId) {
        match &self.nodes[node.0] {
            NodeData::Element { tag, attrs, .. } => {
                let copied = dest.create_element(tag.clone());
                if let NodeData::Element { attrs: slot, .. } = &mut dest.nodes[copied.0] {
                    *slot = attrs.clone();
                }
                dest.append_child(dest_parent, copied);
                for child in self.children(node) {
                    self.copy_into(dest, copied, *child);
                }
            }
            NodeData::Text { text, .. } => {
                let copied = dest.create_text(text.clone());
                dest.append_child(dest_parent, copied);
            }
        }
    }

    /// Serialize the subtree rooted at `node`. The `id` attribute is
    /// always written first; remaining attributes follow in name order.
    pub fn serialize(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(node, &mut out);
        out
    }

    fn serialize_into(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0] {
            NodeData::Text { text, .. } => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs, children, .. } => {
                out.push('<');
                out.push_str(tag);
                if let Some(id) = attrs.get("id") {
                    out.push_str(&format!(" id=\"{}\"", escape_attr(id)));
                }
                for (name, value) in attrs {
                    if name == "id" {
                        continue;
                    }
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
                out.push('>');
                for child in children {
                    self.serialize_into(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
