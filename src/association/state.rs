/// Load state of a deferred association
///
/// State transitions:
/// ```text
/// Ghost ──any forcing read / replace──> Loaded
///   ^                                     │
///   └───────────────reload────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Members have not been fetched yet
    #[default]
    Ghost,

    /// Working set and baseline are materialized
    Loaded,
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Ghost => write!(f, "ghost"),
            LoadState::Loaded => write!(f, "loaded"),
        }
    }
}
