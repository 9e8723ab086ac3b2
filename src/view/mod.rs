//! Catalog reconciliation view
//!
//! Merges the runtime's loaded plugins with catalog records into one display
//! list, then filters, searches and paginates it. Everything here is pure
//! over its inputs; the caller owns the [`ViewState`].

pub mod debounce;

pub use debounce::{SearchDebouncer, DEFAULT_SEARCH_DEBOUNCE};

use plugin_catalog::InstalledPluginRecord;
use plugin_runtime::{RuntimePluginHandle, RuntimeStatus};
use serde::Serialize;
use std::collections::HashSet;

/// Icon shown when a plugin provides none
pub const PLACEHOLDER_ICON: &str = "/images/logo512.png";

/// Author shown for catalog-only plugins
pub const UNKNOWN_AUTHOR: &str = "Unknown";

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A plugin as listed to the administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayPluginEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub icon: String,
    pub installed: bool,
    pub status: RuntimeStatus,
}

impl DisplayPluginEntry {
    fn from_runtime(handle: &RuntimePluginHandle) -> Self {
        let manifest = &handle.manifest;
        Self {
            id: handle.id.clone(),
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            author: manifest.author.clone(),
            icon: manifest
                .icon
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_ICON.to_string()),
            installed: true,
            status: handle.status,
        }
    }

    fn from_record(record: &InstalledPluginRecord) -> Self {
        Self {
            id: record.plugin_id.clone(),
            name: record.plugin_id.clone(),
            description: format!("Plugin {}", record.plugin_id),
            author: UNKNOWN_AUTHOR.to_string(),
            icon: PLACEHOLDER_ICON.to_string(),
            installed: record.is_installed,
            status: RuntimeStatus::from_activated(record.is_activated),
        }
    }
}

/// Merge runtime and catalog views, de-duplicated by plugin id.
///
/// Runtime entries come first in their given order and win over catalog
/// records with the same id; catalog-only plugins follow in their given order.
pub fn merge_plugins(
    runtime: &[RuntimePluginHandle],
    catalog: &[InstalledPluginRecord],
) -> Vec<DisplayPluginEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(runtime.len() + catalog.len());

    for handle in runtime {
        if seen.insert(handle.id.as_str()) {
            entries.push(DisplayPluginEntry::from_runtime(handle));
        }
    }
    for record in catalog {
        if seen.insert(record.plugin_id.as_str()) {
            entries.push(DisplayPluginEntry::from_record(record));
        }
    }

    entries
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PluginFilter {
    #[default]
    All,
    Installed,
}

/// Search, filter and pagination state of the plugin list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search_term: String,
    filter: PluginFilter,
    page: usize,
    page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            filter: PluginFilter::All,
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn filter(&self) -> PluginFilter {
        self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Set the search term; returns to the first page
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 0;
    }

    /// Set the filter; returns to the first page
    pub fn set_filter(&mut self, filter: PluginFilter) {
        self.filter = filter;
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }
}

/// One page of the filtered plugin list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginPage {
    pub entries: Vec<DisplayPluginEntry>,
    /// Entries matching filter and search, across all pages
    pub filtered_count: usize,
    /// Entries before filtering
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl PluginPage {
    pub fn page_count(&self) -> usize {
        self.filtered_count.div_ceil(self.page_size.max(1))
    }
}

/// Filter, then search name and description case-insensitively, then paginate
pub fn apply_view(entries: &[DisplayPluginEntry], state: &ViewState) -> PluginPage {
    let needle = state.search_term.to_lowercase();

    let filtered: Vec<&DisplayPluginEntry> = entries
        .iter()
        .filter(|e| state.filter == PluginFilter::All || e.installed)
        .filter(|e| {
            needle.is_empty()
                || e.name.to_lowercase().contains(&needle)
                || e.description.to_lowercase().contains(&needle)
        })
        .collect();

    let page_entries = filtered
        .iter()
        .skip(state.page.saturating_mul(state.page_size))
        .take(state.page_size)
        .map(|e| (*e).clone())
        .collect();

    PluginPage {
        entries: page_entries,
        filtered_count: filtered.len(),
        total_count: entries.len(),
        page: state.page,
        page_size: state.page_size,
    }
}

/// Merged plugin list plus its view state
#[derive(Debug, Clone, Default)]
pub struct PluginListView {
    runtime: Vec<RuntimePluginHandle>,
    records: Vec<InstalledPluginRecord>,
    entries: Vec<DisplayPluginEntry>,
    state: ViewState,
}

impl PluginListView {
    pub fn new(
        runtime: Vec<RuntimePluginHandle>,
        records: Vec<InstalledPluginRecord>,
        state: ViewState,
    ) -> Self {
        let entries = merge_plugins(&runtime, &records);
        Self {
            runtime,
            records,
            entries,
            state,
        }
    }

    /// Replace the sources, keeping the view state
    pub fn refresh(
        &mut self,
        runtime: Vec<RuntimePluginHandle>,
        records: Vec<InstalledPluginRecord>,
    ) {
        self.entries = merge_plugins(&runtime, &records);
        self.runtime = runtime;
        self.records = records;
    }

    pub fn entries(&self) -> &[DisplayPluginEntry] {
        &self.entries
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewState {
        &mut self.state
    }

    /// Current page under the view state
    pub fn page(&self) -> PluginPage {
        apply_view(&self.entries, &self.state)
    }

    pub fn find(&self, id: &str) -> Option<&DisplayPluginEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Loaded in the runtime (matched by id or name) or marked installed in the catalog
    pub fn is_installed(&self, id_or_name: &str) -> bool {
        self.runtime
            .iter()
            .any(|h| h.id == id_or_name || h.manifest.name == id_or_name)
            || self
                .records
                .iter()
                .any(|r| r.plugin_id == id_or_name && r.is_installed)
    }

    /// Catalog record of an installed plugin
    pub fn installed_record(&self, plugin_id: &str) -> Option<&InstalledPluginRecord> {
        self.records
            .iter()
            .find(|r| r.plugin_id == plugin_id && r.is_installed)
    }
}
