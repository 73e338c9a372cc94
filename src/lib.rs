pub mod arsipp;
pub mod astar;
pub mod catable;
pub mod grid;
pub mod path;
pub mod safemap;
pub mod scenario;
pub mod sipp;
pub mod tree;
pub mod wsipp;
pub mod wsipp_d;

pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
pub type Cost = ordered_float::OrderedFloat<f64>;

/// Discrete timestep. The `g`-value of a search node is the time at which the agent arrives.
pub type Time = i64;

/// Stand-in for an unbounded safe-interval upper end.
pub const TIME_INF: Time = Time::MAX;
