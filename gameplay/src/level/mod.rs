pub mod map_defs;
pub mod portals;
