//! Mapper-wide configuration: search strategy and the ambient knobs spec §7
//! asks the caller to control ("fatal only when a hard cap is reached").

/// Which outer search strategy [`crate::iidriver::run`] uses at each II.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Iterative, greedy placement loop with cost-ranked tile choice
    /// (`Mapper::heuristicMap`). Default: fast, not complete.
    #[default]
    Heuristic,
    /// Exhaustive DFS with backtracking over candidate paths
    /// (`Mapper::exhaustiveMap`/`DFSMap`). Complete but exponential.
    Exhaustive,
}

/// Caller-configurable policy for a mapping session.
#[derive(Clone, Debug)]
pub struct MapperConfig {
    pub search_mode: SearchMode,
    /// Architecture without modulo scheduling: stride 1, single attempt
    /// (spec §4.6's "In static-elastic mode the II driver does a single
    /// attempt").
    pub static_elastic: bool,
    /// Reserved for the external JSON emitter's per-cycle record layout;
    /// the core only threads it through, it never branches on it itself.
    pub parameterizable_cgra: bool,
    /// Starting II. `None` derives it from `res_mii`/`rec_mii` (spec §4.6).
    pub ii_seed: Option<u32>,
    /// Upper bound on how many II values the sweep may try before giving up
    /// with [`crate::error::MapperError::IiCapExceeded`]. `None` sweeps
    /// without bound (spec §7: "fatal only when a hard cap is reached
    /// (caller's policy)" — the policy lives here).
    pub max_ii_attempts: Option<u32>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            search_mode: SearchMode::default(),
            static_elastic: false,
            parameterizable_cgra: false,
            ii_seed: None,
            max_ii_attempts: None,
        }
    }
}
