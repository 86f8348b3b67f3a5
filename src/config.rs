use std::time::Duration;

/// Options for [`index_search`](crate::assembly::index_search).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Wall-time budget. When it runs out the search stops and reports the
    /// best index found so far.
    pub run_time: Option<Duration>,
    /// Maximum number of distinct subgraphs canonized by the first
    /// enumeration pass.
    pub enum_max: usize,
    /// Reconstruct the best pathway.
    pub pathway: bool,
    pub remove_hydrogens: bool,
    /// Report `index - components + 1` for molecules made of several
    /// disconnected pieces.
    pub compensate_disjoint: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            run_time: None,
            enum_max: 50_000_000,
            pathway: true,
            remove_hydrogens: true,
            compensate_disjoint: false,
        }
    }
}
