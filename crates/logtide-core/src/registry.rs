//! Source registry — the static catalog of log sources.
//!
//! The catalog itself is immutable data ([`CATALOG`]). The only runtime state
//! is availability: whether the remote log client is attached. That flag lives
//! on the [`SourceRegistry`] value owned by the controller, never in a global.

use crate::types::SourceKind;

/// When a catalog source may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Always,
    /// Enabled while a remote log client is attached.
    RemoteClient,
    /// Listed for discoverability but not wired to a backend.
    Never,
}

/// Static description of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: SourceKind,
    /// File path or command line, for file/command sources.
    pub location: Option<&'static str>,
    pub availability: Availability,
}

pub const APP_SOURCE: &str = "app";
pub const REMOTE_SOURCE: &str = "remote";

pub const CATALOG: &[SourceSpec] = &[
    SourceSpec {
        name: APP_SOURCE,
        display_name: "Application Logs",
        kind: SourceKind::Memory,
        location: None,
        availability: Availability::Always,
    },
    SourceSpec {
        name: "sdk",
        display_name: "SDK Logs",
        kind: SourceKind::Memory,
        location: None,
        availability: Availability::Never,
    },
    SourceSpec {
        name: "system",
        display_name: "System Logs",
        kind: SourceKind::File,
        location: Some("/var/log/system.log"),
        availability: Availability::Never,
    },
    SourceSpec {
        name: REMOTE_SOURCE,
        display_name: "Remote Logs",
        kind: SourceKind::Remote,
        location: None,
        availability: Availability::RemoteClient,
    },
    SourceSpec {
        name: "docker",
        display_name: "Docker Logs",
        kind: SourceKind::Command,
        location: Some("docker logs"),
        availability: Availability::Never,
    },
];

/// A catalog source together with its current enabled flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSource {
    pub spec: &'static SourceSpec,
    pub enabled: bool,
}

impl LogSource {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn display_name(&self) -> &'static str {
        self.spec.display_name
    }

    pub fn kind(&self) -> SourceKind {
        self.spec.kind
    }

    /// One-line description for the status line when the source is highlighted.
    pub fn describe(&self) -> String {
        if self.enabled {
            format!("Source: {} ({})", self.spec.display_name, self.spec.kind)
        } else {
            format!("Source: {} (not available)", self.spec.display_name)
        }
    }
}

/// How a selection should be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Entries are already in the local buffer.
    Local(&'static str),
    /// The source is fed by a remote tail and may need activation.
    Remote(&'static str),
    /// Disabled or unknown; the selection is ignored.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    catalog: &'static [SourceSpec],
    remote_available: bool,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(CATALOG)
    }
}

impl SourceRegistry {
    pub fn new(catalog: &'static [SourceSpec]) -> Self {
        Self { catalog, remote_available: false }
    }

    /// Record whether a remote log client is attached. Returns true when the
    /// flag actually changed.
    pub fn set_remote_available(&mut self, available: bool) -> bool {
        let changed = self.remote_available != available;
        self.remote_available = available;
        changed
    }

    pub fn remote_available(&self) -> bool {
        self.remote_available
    }

    fn enabled(&self, spec: &SourceSpec) -> bool {
        match spec.availability {
            Availability::Always => true,
            Availability::RemoteClient => self.remote_available,
            Availability::Never => false,
        }
    }

    /// All catalog sources in display order.
    pub fn sources(&self) -> Vec<LogSource> {
        self.catalog
            .iter()
            .map(|spec| LogSource { spec, enabled: self.enabled(spec) })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<LogSource> {
        self.catalog
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| LogSource { spec, enabled: self.enabled(spec) })
    }

    /// The source selected at startup.
    pub fn first_enabled(&self) -> Option<LogSource> {
        self.sources().into_iter().find(|s| s.enabled)
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        match self.get(name) {
            Some(source) if source.enabled => match source.kind() {
                SourceKind::Remote => Resolution::Remote(source.name()),
                _ => Resolution::Local(source.name()),
            },
            _ => Resolution::Ignored,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
