//! CLI flags.

mod globals;
pub(crate) use globals::GlobalArgs;

mod indexer;
pub(crate) use indexer::IndexerArgs;

mod partition;
pub(crate) use partition::PartitionArg;
