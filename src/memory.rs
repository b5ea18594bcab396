//! An in-memory [`Document`] with scripted, time-driven mutations.
//!
//! Nodes are matched by tag name instead of CSS. Delayed effects are applied
//! lazily against the tokio clock, so a paused test runtime drives them
//! deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::document::{Document, LoadStep, NodeInfo};
use crate::error::{Error, Result};
use crate::profile::{Matcher, SweepProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A mutation applied to the document, immediately or after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Show(NodeId),
    Hide(NodeId),
    Remove(NodeId),
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    tag: String,
    label: String,
    classes: Vec<String>,
    parent: Option<NodeId>,
    visible: bool,
    attached: bool,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            label: String::new(),
            classes: Vec::new(),
            parent: None,
            visible: true,
            attached: true,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Not in the tree until a queued load attaches it.
    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }
}

/// How inspecting a node goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectFault {
    /// The node went away between query and inspection.
    Stale,
    /// The channel to the page broke.
    Transport,
}

#[derive(Debug, Clone, Copy)]
struct Reaction {
    /// Clicks that pass before this reaction starts firing.
    skip: usize,
    delay: Duration,
    effect: Effect,
}

#[derive(Debug)]
struct Node {
    spec: NodeSpec,
    reactions: Vec<Reaction>,
    clicked: usize,
    fault: Option<InspectFault>,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    pending: Vec<(Instant, Effect)>,
    batches: VecDeque<(Vec<NodeId>, u64)>,
    extent: u64,
    clicks: Vec<NodeId>,
    loads: Vec<LoadStep>,
}

impl State {
    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::Stale(format!("unknown node {}", id.0)))
    }

    fn apply(&mut self, effect: Effect) {
        let (id, visible, attached) = match effect {
            Effect::Show(id) => (id, Some(true), None),
            Effect::Hide(id) => (id, Some(false), None),
            Effect::Remove(id) => (id, None, Some(false)),
        };
        if let Some(node) = self.nodes.get_mut(id.0) {
            if let Some(visible) = visible {
                node.spec.visible = visible;
            }
            if let Some(attached) = attached {
                node.spec.attached = attached;
            }
        }
    }

    fn settle(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn schedule(&mut self, delay: Duration, effect: Effect) {
        if delay.is_zero() {
            self.apply(effect);
        } else {
            self.pending.push((Instant::now() + delay, effect));
        }
    }

    /// Attached all the way up to the root.
    fn reachable(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current.0) {
                Some(node) if node.spec.attached => cursor = node.spec.parent,
                _ => return false,
            }
        }
        true
    }

    fn within(&self, id: NodeId, scope: NodeId) -> bool {
        let mut cursor = self.nodes.get(id.0).and_then(|n| n.spec.parent);
        while let Some(current) = cursor {
            if current == scope {
                return true;
            }
            cursor = self.nodes.get(current.0).and_then(|n| n.spec.parent);
        }
        false
    }
}

/// The nodes making up one scripted deletable item.
#[derive(Debug, Clone, Copy)]
pub struct ItemNodes {
    pub item: NodeId,
    pub trigger: NodeId,
    pub option: NodeId,
    pub dialog: NodeId,
    pub confirm: NodeId,
}

/// How a scripted item reacts to the delete sequence.
#[derive(Debug, Clone)]
pub struct ItemScript {
    /// Option clicks that open no dialog before one finally does.
    pub dialog_misses: usize,
    /// Delay between confirming and the item leaving the document.
    pub removal_delay: Duration,
    /// `false` keeps the item in place forever, as for content that cannot be deleted.
    pub removable: bool,
    pub shows_delete_option: bool,
    pub shows_dialog: bool,
    /// Removed by the page itself as soon as its menu is opened.
    pub vanishes_on_open: bool,
    pub confirm_label: String,
    pub confirm_class: Option<String>,
    pub detached: bool,
}

impl Default for ItemScript {
    fn default() -> Self {
        Self {
            dialog_misses: 0,
            removal_delay: Duration::ZERO,
            removable: true,
            shows_delete_option: true,
            shows_dialog: true,
            vanishes_on_open: false,
            confirm_label: "Delete".into(),
            confirm_class: None,
            detached: false,
        }
    }
}

/// Profile whose selectors are the tag names [`MemoryDocument::add_item`] uses.
pub fn profile() -> SweepProfile {
    SweepProfile {
        name: "memory".into(),
        item: "item".into(),
        trigger: "trigger".into(),
        delete_option: "delete-option".into(),
        delete_match: Matcher::label("Delete"),
        dialog: "dialog".into(),
        confirm_button: "button".into(),
        confirm_match: Matcher::label_or_class("Delete", "primary"),
        load_step: LoadStep::ScrollBy(500),
    }
}

/// Shared handle to a simulated page. Clones observe and mutate the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    state: Arc<Mutex<State>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.settle();
        state
    }

    pub fn add(&self, spec: NodeSpec) -> NodeId {
        let mut state = self.state();
        let id = NodeId(state.nodes.len());
        state.nodes.push(Node {
            spec,
            reactions: Vec::new(),
            clicked: 0,
            fault: None,
        });
        id
    }

    /// Run `effect` after `delay` every time `node` is clicked.
    pub fn on_click(&self, node: NodeId, delay: Duration, effect: Effect) {
        self.on_click_after(node, 0, delay, effect);
    }

    /// Like [`on_click`](Self::on_click), but the first `skip` clicks do nothing.
    pub fn on_click_after(&self, node: NodeId, skip: usize, delay: Duration, effect: Effect) {
        if let Some(node) = self.state().nodes.get_mut(node.0) {
            node.reactions.push(Reaction { skip, delay, effect });
        }
    }

    /// Make every inspection of `node` fail with `fault`.
    pub fn fail_inspections(&self, node: NodeId, fault: InspectFault) {
        if let Some(node) = self.state().nodes.get_mut(node.0) {
            node.fault = Some(fault);
        }
    }

    pub fn remove(&self, node: NodeId) {
        self.state().apply(Effect::Remove(node));
    }

    pub fn remove_after(&self, node: NodeId, delay: Duration) {
        self.state().schedule(delay, Effect::Remove(node));
    }

    pub fn show_after(&self, node: NodeId, delay: Duration) {
        self.state().schedule(delay, Effect::Show(node));
    }

    pub fn set_extent(&self, extent: u64) {
        self.state().extent = extent;
    }

    /// Attach `nodes` and grow the extent by `growth` on the next load request.
    pub fn queue_load(&self, nodes: Vec<NodeId>, growth: u64) {
        self.state().batches.push_back((nodes, growth));
    }

    /// Add an item wired to open its menu, show its dialog and disappear the way
    /// `script` describes.
    pub fn add_item(&self, script: ItemScript) -> ItemNodes {
        let mut item_spec = NodeSpec::new("item");
        if script.detached {
            item_spec = item_spec.detached();
        }
        let item = self.add(item_spec);
        let trigger = self.add(NodeSpec::new("trigger").parent(item));
        let option = self.add(NodeSpec::new("delete-option").label("Delete").hidden());
        let dialog = self.add(NodeSpec::new("dialog").hidden());
        self.add(NodeSpec::new("button").label("Cancel").parent(dialog));
        let mut confirm_spec = NodeSpec::new("button")
            .label(script.confirm_label.clone())
            .parent(dialog);
        if let Some(class) = &script.confirm_class {
            confirm_spec = confirm_spec.class(class.clone());
        }
        let confirm = self.add(confirm_spec);

        if script.vanishes_on_open {
            self.on_click(trigger, Duration::ZERO, Effect::Remove(item));
        } else if script.shows_delete_option {
            self.on_click(trigger, Duration::ZERO, Effect::Show(option));
        }
        self.on_click(option, Duration::ZERO, Effect::Hide(option));
        if script.shows_dialog {
            self.on_click_after(option, script.dialog_misses, Duration::ZERO, Effect::Show(dialog));
        }
        self.on_click(confirm, Duration::ZERO, Effect::Hide(dialog));
        if script.removable {
            self.on_click(confirm, script.removal_delay, Effect::Remove(item));
        }

        ItemNodes {
            item,
            trigger,
            option,
            dialog,
            confirm,
        }
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.state().reachable(node)
    }

    /// Every node clicked so far, in order.
    pub fn clicks(&self) -> Vec<NodeId> {
        self.state().clicks.clone()
    }

    /// Load requests received so far, in order.
    pub fn load_steps(&self) -> Vec<LoadStep> {
        self.state().loads.clone()
    }

    pub fn loads(&self) -> usize {
        self.state().loads.len()
    }
}

#[async_trait]
impl Document for MemoryDocument {
    type Node = NodeId;

    async fn query(&self, scope: Option<&NodeId>, selector: &str) -> Result<Vec<NodeId>> {
        let state = self.state();
        Ok((0..state.nodes.len())
            .map(NodeId)
            .filter(|id| state.nodes[id.0].spec.tag == selector)
            .filter(|id| state.reachable(*id))
            .filter(|id| scope.map_or(true, |scope| state.within(*id, *scope)))
            .collect())
    }

    async fn inspect(&self, node: &NodeId) -> Result<NodeInfo> {
        let state = self.state();
        let attached = state.reachable(*node);
        let found = state.node(*node)?;
        match found.fault {
            Some(InspectFault::Stale) => return Err(Error::Stale(format!("node {} went away", node.0))),
            Some(InspectFault::Transport) => return Err(Error::Unclassified("connection reset".into())),
            None => {}
        }
        let spec = &found.spec;
        Ok(NodeInfo {
            attached,
            visible: attached && spec.visible,
            label: spec.label.trim().to_string(),
            classes: spec.classes.clone(),
        })
    }

    async fn is_attached(&self, node: &NodeId) -> Result<bool> {
        Ok(self.state().reachable(*node))
    }

    async fn scroll_into_view(&self, node: &NodeId) -> Result<()> {
        if self.state().reachable(*node) {
            Ok(())
        } else {
            Err(Error::Stale(format!("node {} is detached", node.0)))
        }
    }

    async fn click(&self, node: &NodeId) -> Result<()> {
        let mut state = self.state();
        if !state.reachable(*node) {
            return Err(Error::Stale(format!("node {} is detached", node.0)));
        }
        state.clicks.push(*node);
        let clicked = match state.nodes.get_mut(node.0) {
            Some(found) => {
                found.clicked += 1;
                found.clicked
            }
            None => return Err(Error::Stale(format!("unknown node {}", node.0))),
        };
        let reactions = state.node(*node)?.reactions.clone();
        for reaction in reactions.into_iter().filter(|r| clicked > r.skip) {
            state.schedule(reaction.delay, reaction.effect);
        }
        Ok(())
    }

    async fn scroll_extent(&self) -> Result<u64> {
        Ok(self.state().extent)
    }

    async fn load_more(&self, step: LoadStep) -> Result<()> {
        let mut state = self.state();
        state.loads.push(step);
        if let Some((nodes, growth)) = state.batches.pop_front() {
            for id in nodes {
                if let Some(node) = state.nodes.get_mut(id.0) {
                    node.spec.attached = true;
                }
            }
            state.extent += growth;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn removing_a_parent_detaches_descendants() {
        let doc = MemoryDocument::new();
        let item = doc.add(NodeSpec::new("item"));
        let trigger = doc.add(NodeSpec::new("trigger").parent(item));
        doc.remove(item);

        assert!(!doc.is_attached(&trigger).await.unwrap());
        assert!(doc.query(None, "trigger").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_effects_follow_the_clock() {
        let doc = MemoryDocument::new();
        let item = doc.add(NodeSpec::new("item"));
        doc.remove_after(item, Duration::from_millis(300));

        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(doc.is_reachable(item));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!doc.is_reachable(item));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_load_attaches_nodes_and_grows_extent() {
        let doc = MemoryDocument::new();
        doc.set_extent(1000);
        let later = doc.add(NodeSpec::new("item").detached());
        doc.queue_load(vec![later], 800);

        assert!(doc.query(None, "item").await.unwrap().is_empty());
        doc.load_more(LoadStep::ScrollBy(500)).await.unwrap();
        assert_eq!(doc.query(None, "item").await.unwrap(), vec![later]);
        assert_eq!(doc.scroll_extent().await.unwrap(), 1800);

        doc.load_more(LoadStep::ScrollBy(500)).await.unwrap();
        assert_eq!(doc.scroll_extent().await.unwrap(), 1800);
        assert_eq!(doc.loads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reaction_fires_from_the_next_click_on() {
        let doc = MemoryDocument::new();
        let button = doc.add(NodeSpec::new("button"));
        let dialog = doc.add(NodeSpec::new("dialog").hidden());
        doc.on_click_after(button, 1, Duration::ZERO, Effect::Show(dialog));

        doc.click(&button).await.unwrap();
        assert!(!doc.inspect(&dialog).await.unwrap().visible);
        doc.click(&button).await.unwrap();
        assert!(doc.inspect(&dialog).await.unwrap().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn inspection_faults_surface_as_errors() {
        let doc = MemoryDocument::new();
        let gone = doc.add(NodeSpec::new("button"));
        let broken = doc.add(NodeSpec::new("button"));
        doc.fail_inspections(gone, InspectFault::Stale);
        doc.fail_inspections(broken, InspectFault::Transport);

        assert!(doc.inspect(&gone).await.unwrap_err().is_stale());
        assert!(matches!(doc.inspect(&broken).await, Err(Error::Unclassified(_))));
    }
}
