//! User-facing portal options, merged into the engine's user config by
//! the frontend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Master enable. Off substitutes a flat fill for every stenciled
    /// portal.
    pub portals: bool,
    /// Disable occlusion queries even where supported
    pub no_query: bool,
    /// Recursion ceiling for mirrors, plane mirrors and line portals
    pub mirror_recursions: u32,
    /// Occlusion queries are only worth their overhead with more than
    /// this many portals pending at one depth
    pub query_min_portals: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portals: true,
            no_query: false,
            mirror_recursions: 4,
            query_min_portals: 2,
        }
    }
}
