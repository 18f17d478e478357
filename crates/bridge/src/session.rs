//! Per-context connection and menu-readiness bookkeeping.
//!
//! An open-menu request for a context that has not finished loading is
//! deferred and delivered once, after that context sends `load-complete`.
//! Requests for contexts that have not connected yet are kept for at most
//! [`MAX_UNCONNECTED_MENU_REQUESTS`] contexts, oldest dropped first.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::duplex::ContextId;

/// Where a context stands with respect to opening the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Disconnected,
    /// Connected but has not reported `load-complete`.
    Connected,
    /// An open-menu request is waiting for `load-complete`.
    MenuPending,
    /// Loaded, with any open-menu request delivered.
    Notified,
}

/// Open-menu requests held for contexts that have not connected yet.
pub const MAX_UNCONNECTED_MENU_REQUESTS: usize = 64;

/// Outcome of an open-menu request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuDelivery {
    /// The context is ready; send `open-menu` now.
    Immediate,
    /// Held until the context reports `load-complete`.
    Deferred,
}

/// Context an open-menu request was routed to, and how it will be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuTarget {
    pub ctx: ContextId,
    pub delivery: MenuDelivery,
}

/// Connection table keyed by context id.
#[derive(Debug)]
pub struct ContextTable<P> {
    ports: HashMap<ContextId, P>,
    ready: HashSet<ContextId>,
    deferred: HashSet<ContextId>,
    /// Deferred contexts with no connection, oldest first.
    awaiting_connect: VecDeque<ContextId>,
}

impl<P> Default for ContextTable<P> {
    fn default() -> Self {
        Self {
            ports: HashMap::new(),
            ready: HashSet::new(),
            deferred: HashSet::new(),
            awaiting_connect: VecDeque::new(),
        }
    }
}

impl<P> ContextTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. A reconnect replaces the old port and must
    /// report `load-complete` again.
    pub fn connect(&mut self, ctx: ContextId, port: P) {
        self.ready.remove(&ctx);
        self.awaiting_connect.retain(|&waiting| waiting != ctx);
        self.ports.insert(ctx, port);
    }

    pub fn port(&self, ctx: ContextId) -> Option<&P> {
        self.ports.get(&ctx)
    }

    pub fn is_connected(&self, ctx: ContextId) -> bool {
        self.ports.contains_key(&ctx)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Ask for the menu to open in `ctx`. Contexts that are not connected
    /// yet are deferred too, up to [`MAX_UNCONNECTED_MENU_REQUESTS`] of them.
    pub fn request_open_menu(&mut self, ctx: ContextId) -> MenuDelivery {
        if !self.is_connected(ctx) {
            if self.deferred.insert(ctx) {
                self.awaiting_connect.push_back(ctx);
            }
            let excess = self.awaiting_connect.len().saturating_sub(MAX_UNCONNECTED_MENU_REQUESTS);
            for oldest in self.awaiting_connect.drain(..excess) {
                tracing::debug!(ctx = oldest, "dropping open-menu for an unconnected context");
                self.deferred.remove(&oldest);
            }
            MenuDelivery::Deferred
        } else if self.ready.contains(&ctx) {
            MenuDelivery::Immediate
        } else {
            self.deferred.insert(ctx);
            MenuDelivery::Deferred
        }
    }

    /// Number of open-menu requests still waiting.
    pub fn pending_menus(&self) -> usize {
        self.deferred.len()
    }

    /// Mark `ctx` loaded. Returns true when a deferred open-menu must be
    /// delivered now; the deferral is consumed.
    pub fn load_complete(&mut self, ctx: ContextId) -> bool {
        if !self.is_connected(ctx) {
            return false;
        }
        self.ready.insert(ctx);
        self.deferred.remove(&ctx)
    }

    /// Forget `ctx`, including any deferred open-menu.
    pub fn disconnect(&mut self, ctx: ContextId) -> Option<P> {
        self.ready.remove(&ctx);
        self.deferred.remove(&ctx);
        self.ports.remove(&ctx)
    }

    pub fn state(&self, ctx: ContextId) -> MenuState {
        if !self.is_connected(ctx) {
            MenuState::Disconnected
        } else if self.deferred.contains(&ctx) {
            MenuState::MenuPending
        } else if self.ready.contains(&ctx) {
            MenuState::Notified
        } else {
            MenuState::Connected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_before_load_is_deferred_once() {
        let mut table = ContextTable::new();
        table.connect(7, ());
        assert_eq!(table.request_open_menu(7), MenuDelivery::Deferred);
        assert_eq!(table.state(7), MenuState::MenuPending);

        assert!(table.load_complete(7));
        assert_eq!(table.state(7), MenuState::Notified);
        assert!(!table.load_complete(7));
    }

    #[test]
    fn test_open_after_load_is_immediate() {
        let mut table = ContextTable::new();
        table.connect(1, ());
        assert!(!table.load_complete(1));
        assert_eq!(table.request_open_menu(1), MenuDelivery::Immediate);
        assert_eq!(table.state(1), MenuState::Notified);
    }

    #[test]
    fn test_open_before_connect_waits_for_handshake() {
        let mut table = ContextTable::new();
        assert_eq!(table.request_open_menu(3), MenuDelivery::Deferred);
        assert_eq!(table.state(3), MenuState::Disconnected);
        table.connect(3, ());
        assert_eq!(table.state(3), MenuState::MenuPending);
        assert!(table.load_complete(3));
    }

    #[test]
    fn test_unconnected_requests_are_bounded() {
        let mut table: ContextTable<()> = ContextTable::new();
        for ctx in 0..1000 {
            assert_eq!(table.request_open_menu(ctx), MenuDelivery::Deferred);
        }
        table.request_open_menu(999);
        assert_eq!(table.pending_menus(), MAX_UNCONNECTED_MENU_REQUESTS);

        table.connect(0, ());
        assert_eq!(table.state(0), MenuState::Connected);
        table.connect(999, ());
        assert_eq!(table.state(999), MenuState::MenuPending);
    }

    #[test]
    fn test_connected_requests_do_not_count_toward_bound() {
        let mut table = ContextTable::new();
        table.connect(1, ());
        table.request_open_menu(1);
        for ctx in 100..300 {
            table.request_open_menu(ctx);
        }
        assert_eq!(table.state(1), MenuState::MenuPending);
        assert_eq!(table.pending_menus(), MAX_UNCONNECTED_MENU_REQUESTS + 1);
    }

    #[test]
    fn test_disconnect_drops_deferral() {
        let mut table = ContextTable::new();
        table.connect(2, "port");
        table.request_open_menu(2);
        assert_eq!(table.disconnect(2), Some("port"));
        assert_eq!(table.state(2), MenuState::Disconnected);

        table.connect(2, "port");
        assert!(!table.load_complete(2));
    }

    #[test]
    fn test_load_complete_from_unknown_context_ignored() {
        let mut table: ContextTable<()> = ContextTable::new();
        assert!(!table.load_complete(9));
        assert_eq!(table.state(9), MenuState::Disconnected);
        assert!(table.is_empty());
    }

    #[test]
    fn test_reconnect_requires_new_handshake() {
        let mut table = ContextTable::new();
        table.connect(4, ());
        table.load_complete(4);
        table.connect(4, ());
        assert_eq!(table.state(4), MenuState::Connected);
        assert_eq!(table.request_open_menu(4), MenuDelivery::Deferred);
        assert_eq!(table.len(), 1);
    }
}
