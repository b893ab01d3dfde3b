//! Page model consumed by the lifecycle detector.
//!
//! The hosting page is only ever inspected through fixed class/attribute
//! markers. [`PageNode`] is a detached snapshot of an element subtree (what a
//! mutation batch reports as inserted or removed), [`Page`] is the live
//! document seen through the handful of queries the state machine needs, and
//! [`DocumentPage`] is a tree-backed [`Page`] used by tests and the CLI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed marker strings recognised on the page.
pub mod markers {
    /// Result panel shown when a game finishes.
    pub const RESULT_PANEL: &str = "board-modal-container-container";
    pub const RESULT_TITLE: &str = "header-title-component";
    pub const RESULT_SUBTITLE: &str = "header-subtitle-component";

    pub const PLAYER_BLOCK: &str = "cc-user-block-component";
    pub const PLAYER_USERNAME: &str = "cc-user-username-component";
    pub const PLAYER_RATING: &str = "cc-user-rating-white";

    /// Element whose `username` attribute carries the viewer's handle.
    pub const IDENTITY_ELEMENT_ID: &str = "notifications-request";
    pub const IDENTITY_ATTRIBUTE: &str = "username";

    /// Affordances that only exist while a game is being played.
    pub const ACTIVE_GAME_CONTROLS: &[&str] = &["resign-button-component", "draw-button-component"];

    /// Every way of starting a new game.
    pub const NEW_GAME_CONTROLS: &[&str] = &[
        "new-game-buttons-buttons",
        "new-game-component",
        "game-over-buttons-component",
    ];
    pub const TAB: &str = "tabs-tab";
    pub const TAB_ATTRIBUTE: &str = "data-tab";
    pub const NEW_GAME_TAB: &str = "newGame";

    /// Class applied to new-game controls during a lockout.
    pub const DISABLED: &str = "cb-hidden";
}

/// Detached element subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Text directly owned by this element (not its children).
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element carrying a single class.
    pub fn with_class(class: &str) -> Self {
        Self::new().class(class)
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Pre-order walk over every descendant, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant carrying `class`, like `querySelector(".class")`.
    pub fn find(&self, class: &str) -> Option<&PageNode> {
        self.descendants().find(|n| n.has_class(class))
    }

    /// `self` if it carries `class`, otherwise the first matching descendant.
    pub fn find_inclusive(&self, class: &str) -> Option<&PageNode> {
        if self.has_class(class) {
            Some(self)
        } else {
            self.find(class)
        }
    }

    /// Own text nodes of this subtree in document order.
    pub fn text_nodes(&self) -> Vec<&str> {
        std::iter::once(self)
            .chain(self.descendants())
            .filter_map(|n| n.text.as_deref())
            .collect()
    }

    /// Concatenated text, like `textContent`.
    pub fn text_content(&self) -> String {
        self.text_nodes().concat()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a PageNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a PageNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// One batch of DOM mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    #[serde(default)]
    pub added: Vec<PageNode>,
    #[serde(default)]
    pub removed: Vec<PageNode>,
}

impl MutationBatch {
    pub fn added(nodes: Vec<PageNode>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(nodes: Vec<PageNode>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}

/// Positional reference to a live element (child indices from the root).
///
/// Handles are resolved once and may go stale if the page rebuilds the
/// subtree they point into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlHandle(pub Vec<usize>);

/// Live document queries used by the state machine.
pub trait Page {
    /// Raw identity attribute, if the identity element exists.
    fn viewer_handle(&self) -> Option<String>;

    fn current_url(&self) -> Option<String>;

    /// Whether any in-game affordance (resign, offer draw) is present.
    fn has_active_game_controls(&self) -> bool;

    /// Displayed `(top, bottom)` player names.
    fn player_names(&self) -> Option<(String, String)>;

    /// Absolute rating displayed next to `viewer`, if any.
    fn viewer_rating(&self, viewer: &str) -> Option<i32>;

    /// Every control that starts a new game.
    fn new_game_controls(&self) -> Vec<ControlHandle>;

    /// Apply or remove the disabled marker. Returns how many controls were
    /// actually reached.
    fn set_disabled(&mut self, controls: &[ControlHandle], disabled: bool) -> usize;
}

/// [`Page`] over an owned element tree.
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    root: PageNode,
    url: Option<String>,
}

impl DocumentPage {
    pub fn new(root: PageNode) -> Self {
        Self { root, url: None }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn root(&self) -> &PageNode {
        &self.root
    }

    /// Insert `node` as the last child of the root and report the mutation.
    pub fn append(&mut self, node: PageNode) -> MutationBatch {
        self.root.children.push(node.clone());
        MutationBatch::added(vec![node])
    }

    /// Remove every top-level child carrying `class` (directly or nested)
    /// and report the mutation.
    pub fn remove(&mut self, class: &str) -> MutationBatch {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.root.children)
            .into_iter()
            .partition(|n| n.find_inclusive(class).is_some());
        self.root.children = kept;
        MutationBatch::removed(removed)
    }

    /// Whether the node at `handle` currently carries the disabled marker.
    pub fn is_disabled(&self, handle: &ControlHandle) -> bool {
        self.node_at(&handle.0)
            .map(|n| n.has_class(markers::DISABLED))
            .unwrap_or(false)
    }

    /// Number of elements carrying the disabled marker.
    pub fn disabled_count(&self) -> usize {
        std::iter::once(&self.root)
            .chain(self.root.descendants())
            .filter(|n| n.has_class(markers::DISABLED))
            .count()
    }

    fn node_at(&self, path: &[usize]) -> Option<&PageNode> {
        path.iter()
            .try_fold(&self.root, |node, &i| node.children.get(i))
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut PageNode> {
        path.iter()
            .try_fold(&mut self.root, |node, &i| node.children.get_mut(i))
    }

    fn paths_where(&self, pred: &dyn Fn(&PageNode) -> bool) -> Vec<ControlHandle> {
        fn walk(
            node: &PageNode,
            path: &mut Vec<usize>,
            pred: &dyn Fn(&PageNode) -> bool,
            out: &mut Vec<ControlHandle>,
        ) {
            if pred(node) {
                out.push(ControlHandle(path.clone()));
            }
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                walk(child, path, pred, out);
                path.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), pred, &mut out);
        out
    }

    fn all_nodes(&self) -> impl Iterator<Item = &PageNode> {
        std::iter::once(&self.root).chain(self.root.descendants())
    }

    fn player_blocks(&self) -> Vec<&PageNode> {
        self.all_nodes()
            .filter(|n| n.has_class(markers::PLAYER_BLOCK))
            .collect()
    }
}

fn player_name(block: &PageNode) -> String {
    block
        .find(markers::PLAYER_USERNAME)
        .unwrap_or(block)
        .text_content()
}

impl Page for DocumentPage {
    fn viewer_handle(&self) -> Option<String> {
        self.all_nodes()
            .find(|n| n.attribute("id") == Some(markers::IDENTITY_ELEMENT_ID))
            .and_then(|n| n.attribute(markers::IDENTITY_ATTRIBUTE))
            .map(str::to_string)
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn has_active_game_controls(&self) -> bool {
        self.all_nodes()
            .any(|n| markers::ACTIVE_GAME_CONTROLS.iter().any(|c| n.has_class(c)))
    }

    fn player_names(&self) -> Option<(String, String)> {
        match self.player_blocks().as_slice() {
            [top, bottom, ..] => Some((player_name(top), player_name(bottom))),
            _ => None,
        }
    }

    fn viewer_rating(&self, viewer: &str) -> Option<i32> {
        let block = self
            .player_blocks()
            .into_iter()
            .find(|b| player_name(b).trim() == viewer.trim())?;
        let digits: String = block
            .find(markers::PLAYER_RATING)?
            .text_content()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }

    fn new_game_controls(&self) -> Vec<ControlHandle> {
        let mut controls = self.paths_where(&|n: &PageNode| {
            markers::NEW_GAME_CONTROLS.iter().any(|c| n.has_class(c))
        });
        let tab = self.paths_where(&|n: &PageNode| {
            n.has_class(markers::TAB)
                && n.attribute(markers::TAB_ATTRIBUTE) == Some(markers::NEW_GAME_TAB)
        });
        controls.extend(tab.into_iter().take(1));
        controls
    }

    fn set_disabled(&mut self, controls: &[ControlHandle], disabled: bool) -> usize {
        let mut reached = 0;
        for handle in controls {
            let Some(node) = self.node_at_mut(&handle.0) else {
                continue;
            };
            reached += 1;
            let marked = node.has_class(markers::DISABLED);
            if disabled && !marked {
                node.classes.push(markers::DISABLED.to_string());
            } else if !disabled && marked {
                node.classes.retain(|c| c != markers::DISABLED);
            }
        }
        reached
    }
}
