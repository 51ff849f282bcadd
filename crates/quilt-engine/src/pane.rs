//! Pane identity and the ordered pane registry.
//!
//! Insertion order is display order (left to right). At most one pane is
//! active at any time, and exactly one whenever the registry is
//! non-empty. A pane's conversation binding is set at most once and never
//! reassigned.

use crate::conversation::ConversationId;

/// Opaque identity of a pane. Allocated by the registry, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(u64);

impl std::fmt::Display for PaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pane-{}", self.0)
    }
}

/// One conversation viewport.
#[derive(Debug, Clone)]
pub struct Pane {
    id: PaneId,
    conversation: Option<ConversationId>,
}

impl Pane {
    pub fn id(&self) -> PaneId {
        self.id
    }

    /// The conversation this pane displays, once bound.
    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }
}

/// Ordered mapping of pane identity to pane state.
#[derive(Debug, Default)]
pub struct PaneRegistry {
    panes: Vec<Pane>,
    active: Option<PaneId>,
    next_id: u64,
}

impl PaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pane at the end of the display order.
    ///
    /// The first pane added to an empty registry becomes active.
    pub fn add(&mut self, conversation: Option<ConversationId>) -> PaneId {
        let id = PaneId(self.next_id);
        self.next_id += 1;
        self.panes.push(Pane { id, conversation });
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    /// Remove a pane. Unknown ids are a no-op (duplicate close events).
    ///
    /// Removing the active pane activates the previous pane in display
    /// order, or the new first pane, or nothing if the registry empties.
    pub fn remove(&mut self, id: PaneId) {
        let Some(index) = self.panes.iter().position(|p| p.id == id) else {
            return;
        };
        self.panes.remove(index);

        if self.active == Some(id) {
            self.active = if self.panes.is_empty() {
                None
            } else {
                let fallback = index.saturating_sub(1).min(self.panes.len() - 1);
                Some(self.panes[fallback].id)
            };
        }
    }

    /// Mark a pane active. Unknown ids leave the current activation.
    pub fn set_active(&mut self, id: PaneId) {
        if self.panes.iter().any(|p| p.id == id) {
            self.active = Some(id);
        }
    }

    /// The single active pane, if any.
    pub fn active(&self) -> Option<PaneId> {
        self.active
    }

    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.iter().find(|p| p.id == id)
    }

    /// Bind a conversation to a not-yet-bound pane.
    ///
    /// Returns `false` if the pane is unknown or already bound; a binding
    /// is never reassigned.
    pub fn bind_conversation(&mut self, id: PaneId, conversation: ConversationId) -> bool {
        match self.panes.iter_mut().find(|p| p.id == id) {
            Some(pane) if pane.conversation.is_none() => {
                pane.conversation = Some(conversation);
                true
            }
            _ => false,
        }
    }

    /// Find the pane displaying a conversation, if any.
    pub fn find_by_conversation(&self, conversation: &ConversationId) -> Option<PaneId> {
        self.panes
            .iter()
            .find(|p| p.conversation.as_ref() == Some(conversation))
            .map(|p| p.id)
    }

    /// Panes in display order.
    pub fn all(&self) -> impl Iterator<Item = &Pane> {
        self.panes.iter()
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pane_becomes_active() {
        let mut registry = PaneRegistry::new();
        assert!(registry.active().is_none());

        let a = registry.add(None);
        assert_eq!(registry.active(), Some(a));

        let b = registry.add(None);
        // Adding a second pane does not steal activation
        assert_eq!(registry.active(), Some(a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_order_is_insertion_order() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        let b = registry.add(None);
        let c = registry.add(None);

        let order: Vec<PaneId> = registry.all().map(Pane::id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        registry.remove(a);
        // Second close event for the same pane
        registry.remove(a);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_active_falls_back_to_previous() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        let b = registry.add(None);
        let c = registry.add(None);

        registry.set_active(b);
        registry.remove(b);
        assert_eq!(registry.active(), Some(a));
        assert_eq!(registry.len(), 2);

        registry.set_active(a);
        registry.remove(a);
        assert_eq!(registry.active(), Some(c));
    }

    #[test]
    fn test_remove_inactive_keeps_activation() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        let b = registry.add(None);

        registry.remove(b);
        assert_eq!(registry.active(), Some(a));
    }

    #[test]
    fn test_remove_last_pane_clears_activation() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        registry.remove(a);
        assert!(registry.active().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_active_unknown_id_is_noop() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        registry.remove(a);
        registry.set_active(a);
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_bind_conversation_only_once() {
        let mut registry = PaneRegistry::new();
        let a = registry.add(None);
        let conv = ConversationId::generate();
        let other = ConversationId::generate();

        assert!(registry.bind_conversation(a, conv.clone()));
        assert!(!registry.bind_conversation(a, other));
        assert_eq!(registry.get(a).unwrap().conversation(), Some(&conv));
    }

    #[test]
    fn test_find_by_conversation() {
        let mut registry = PaneRegistry::new();
        let conv = ConversationId::generate();
        let _a = registry.add(None);
        let b = registry.add(Some(conv.clone()));

        assert_eq!(registry.find_by_conversation(&conv), Some(b));
        assert_eq!(
            registry.find_by_conversation(&ConversationId::generate()),
            None
        );
    }
}
