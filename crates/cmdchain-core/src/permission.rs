//! Permission nodes and the access check consulted before dispatch.
//!
//! Nodes are dotted strings (`chat.perm.grant`) interned into a table owned
//! by the caller. Interned entries live until [`PermissionNodes::prune`]
//! removes them explicitly.

use crate::command::CommandSender;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Interned permission ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionNode {
    id: NodeId,
    name: Arc<str>,
}

impl PermissionNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `a.b.c`, then `a.b.*`, `a.*`, `*`.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = vec![self.name.to_string()];
        let mut prefix = self.name.as_ref();
        while let Some((head, _)) = prefix.rsplit_once('.') {
            out.push(format!("{head}.*"));
            prefix = head;
        }
        out.push("*".to_string());
        out
    }
}

impl fmt::Display for PermissionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Interning table: one [`PermissionNode`] per distinct node string.
#[derive(Default)]
pub struct PermissionNodes {
    by_name: DashMap<String, PermissionNode>,
    by_id: DashMap<NodeId, Arc<str>>,
    next_id: AtomicU32,
}

impl PermissionNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name` (lowercased), returning the shared node.
    pub fn intern(&self, name: &str) -> PermissionNode {
        let key = name.trim().to_lowercase();
        match self.by_name.entry(key) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let name: Arc<str> = Arc::from(e.key().as_str());
                self.by_id.insert(id, Arc::clone(&name));
                e.insert(PermissionNode { id, name }).clone()
            }
        }
    }

    /// Look up an existing node without inserting.
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(&name.trim().to_lowercase()).map(|n| n.id)
    }

    pub fn lookup(&self, id: NodeId) -> Option<PermissionNode> {
        let name = self.by_id.get(&id)?.clone();
        Some(PermissionNode { id, name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Drop every node for which `keep` returns false. IDs are never reused.
    pub fn prune(&self, mut keep: impl FnMut(&PermissionNode) -> bool) -> usize {
        let before = self.by_name.len();
        self.by_name.retain(|_, node| {
            let kept = keep(node);
            if !kept {
                self.by_id.remove(&node.id);
            }
            kept
        });
        before - self.by_name.len()
    }
}

/// Decides whether a sender may run an executor guarded by `node`.
pub trait PermissionCheck: Send + Sync {
    fn has_permission(&self, sender: &dyn CommandSender, node: &PermissionNode) -> bool;
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn has_permission(&self, _sender: &dyn CommandSender, _node: &PermissionNode) -> bool {
        true
    }
}

/// Grants per sender name, with `a.*` wildcards.
#[derive(Debug, Default)]
pub struct Grants {
    by_sender: DashMap<String, DashSet<String>>,
}

impl Grants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, sender: &str, node: &str) {
        self.by_sender
            .entry(sender.to_lowercase())
            .or_default()
            .insert(node.trim().to_lowercase());
    }

    pub fn revoke(&self, sender: &str, node: &str) -> bool {
        self.by_sender
            .get(&sender.to_lowercase())
            .is_some_and(|set| set.remove(&node.trim().to_lowercase()).is_some())
    }

    pub fn granted(&self, sender: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .by_sender
            .get(&sender.to_lowercase())
            .map(|set| set.iter().map(|n| n.key().clone()).collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

impl PermissionCheck for Grants {
    fn has_permission(&self, sender: &dyn CommandSender, node: &PermissionNode) -> bool {
        let Some(set) = self.by_sender.get(&sender.name().to_lowercase()) else {
            return false;
        };
        node.candidates().iter().any(|c| set.contains(c))
    }
}
