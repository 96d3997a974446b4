pub mod consensus;
pub mod ctss;
pub mod matrix;
pub mod signal;
pub mod tag_cluster;

// re-export for cleaner imports
pub use self::consensus::ConsensusCluster;
pub use self::ctss::{Ctss, Strand};
pub use self::matrix::SignalMatrix;
pub use self::signal::{FlatSignalStore, PartitionKey, RleSignalStore, SignalStore, Site};
pub use self::tag_cluster::TagCluster;
