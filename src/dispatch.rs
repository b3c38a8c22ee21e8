//! Menu registration and click handling.
//!
//! The host environment owns the actual menu and tabs; this module only talks
//! to it through [`MenuHost`] and [`TabOpener`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::normalize::FilterKind;
use crate::registry::{Registry, RegistryError};

/// Where a menu entry is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub id: String,
    pub title: String,
    pub contexts: Vec<MenuContext>,
    pub filter: FilterKind,
}

pub trait MenuHost {
    fn create_entry(&mut self, entry: MenuEntry);
}

pub trait TabOpener {
    fn open_tab(&mut self, url: String);
}

/// A menu activation: which entry was picked and the text selected at the time.
#[derive(Debug, Clone)]
pub struct Activation {
    pub target_id: String,
    pub selection_text: String,
}

/// Register one selection-scoped entry per registry item, in registry order.
pub fn register_menu<H: MenuHost>(registry: &Registry, host: &mut H) {
    for (id, target) in registry.list() {
        host.create_entry(MenuEntry {
            id: id.clone(),
            title: target.title.clone(),
            contexts: vec![MenuContext::Selection],
            filter: target.filter,
        });
    }
}

/// In-memory menu. Creating an entry whose id already exists replaces it, so
/// registering on both install and startup leaves a single copy.
#[derive(Debug, Clone, Default)]
pub struct MenuEntries {
    entries: Vec<MenuEntry>,
}

impl MenuEntries {
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }
}

impl MenuHost for MenuEntries {
    fn create_entry(&mut self, entry: MenuEntry) {
        match self.entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn lookup_url(&self, target_id: &str, text: &str) -> Result<String, RegistryError> {
        let target = self.registry.resolve(target_id)?;
        let url = target.search_url(text);
        debug!(target_id, %url, "dispatching lookup");
        Ok(url)
    }

    /// Open the lookup for `activation`. Unknown targets are logged and ignored.
    pub fn on_activation<O: TabOpener>(&self, activation: &Activation, opener: &mut O) {
        match self.lookup_url(&activation.target_id, &activation.selection_text) {
            Ok(url) => opener.open_tab(url),
            Err(err) => warn!("ignoring menu activation: {err}"),
        }
    }
}
