//! Registry of the partitions the indexer follows.

use std::{collections::BTreeMap, sync::Arc};
use tracing::warn;
use unitscan_source::{BlockSource, SourceError};
use unitscan_types::{PartitionId, PartitionTypeId, RoundInfo};

/// A partition together with the source serving it.
#[derive(Debug, Clone)]
pub struct RegisteredPartition {
    /// Identifier of the partition.
    pub partition_id: PartitionId,
    /// Kind of the partition.
    pub partition_type_id: PartitionTypeId,
    /// Connection to the partition's node.
    pub source: Arc<dyn BlockSource>,
}

/// Immutable snapshot of the registered partitions, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct PartitionRegistry {
    partitions: Arc<BTreeMap<PartitionId, RegisteredPartition>>,
}

impl PartitionRegistry {
    /// Returns a builder for a new registry.
    pub fn builder() -> PartitionRegistryBuilder {
        PartitionRegistryBuilder::default()
    }

    /// Returns the partition registered under `partition_id`.
    pub fn get(&self, partition_id: PartitionId) -> Option<&RegisteredPartition> {
        self.partitions.get(&partition_id)
    }

    /// Iterates over the registered partitions in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPartition> {
        self.partitions.values()
    }

    /// Identifiers of the registered partitions in ascending order.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        self.partitions.keys().copied().collect()
    }

    /// Number of registered partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns `true` when no partition is registered.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Resolves the requested partitions, skipping unknown ones. An empty request selects every
    /// registered partition.
    pub fn select(&self, partition_ids: &[PartitionId]) -> Vec<RegisteredPartition> {
        if partition_ids.is_empty() {
            return self.partitions.values().cloned().collect();
        }

        let mut selected = Vec::with_capacity(partition_ids.len());
        for partition_id in partition_ids {
            match self.partitions.get(partition_id) {
                Some(partition) => {
                    if !selected.iter().any(|p: &RegisteredPartition| p.partition_id == *partition_id)
                    {
                        selected.push(partition.clone());
                    }
                }
                None => warn!(target: "search", partition_id, "Skipping unknown partition"),
            }
        }
        selected
    }

    /// Asks the node of a partition for its latest round. `None` for unknown partitions.
    pub async fn round_info(
        &self,
        partition_id: PartitionId,
    ) -> Option<Result<RoundInfo, SourceError>> {
        let partition = self.get(partition_id)?;
        Some(partition.source.fetch_round_info().await)
    }
}

/// Builder for [`PartitionRegistry`].
#[derive(Debug, Default)]
pub struct PartitionRegistryBuilder {
    partitions: BTreeMap<PartitionId, RegisteredPartition>,
}

impl PartitionRegistryBuilder {
    /// Registers the partition served by `source`. A later registration of the same partition
    /// replaces the earlier one.
    pub fn with_partition(
        mut self,
        partition_type_id: PartitionTypeId,
        source: Arc<dyn BlockSource>,
    ) -> Self {
        let partition_id = source.partition_id();
        let partition = RegisteredPartition { partition_id, partition_type_id, source };
        if self.partitions.insert(partition_id, partition).is_some() {
            warn!(target: "supervisor", partition_id, "Partition registered twice, keeping the last source");
        }
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> PartitionRegistry {
        PartitionRegistry { partitions: Arc::new(self.partitions) }
    }
}
