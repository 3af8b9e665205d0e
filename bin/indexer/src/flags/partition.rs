use std::str::FromStr;
use thiserror::Error;
use unitscan_types::{PartitionId, PartitionTypeId};
use url::Url;

/// A partition to follow, written as `<partition-id>:<partition-type-id>=<node-url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartitionArg {
    /// Identifier of the partition.
    pub partition_id: PartitionId,
    /// Kind of the partition.
    pub partition_type_id: PartitionTypeId,
    /// JSON-RPC endpoint of a node of the partition.
    pub url: Url,
}

/// Error parsing a [`PartitionArg`].
#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum PartitionArgError {
    /// The value does not have the `<id>:<type-id>=<url>` shape.
    #[error("expected <partition-id>:<partition-type-id>=<url>, got '{0}'")]
    Format(String),
    /// An identifier is not a number.
    #[error("invalid {0}: '{1}'")]
    Id(&'static str, String),
    /// The endpoint is not a URL.
    #[error("invalid node url: {0}")]
    Url(#[from] url::ParseError),
}

impl FromStr for PartitionArg {
    type Err = PartitionArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ids, url) = s.split_once('=').ok_or_else(|| PartitionArgError::Format(s.to_string()))?;
        let (partition_id, partition_type_id) =
            ids.split_once(':').ok_or_else(|| PartitionArgError::Format(s.to_string()))?;

        Ok(Self {
            partition_id: partition_id
                .trim()
                .parse()
                .map_err(|_| PartitionArgError::Id("partition id", partition_id.to_string()))?,
            partition_type_id: partition_type_id.trim().parse().map_err(|_| {
                PartitionArgError::Id("partition type id", partition_type_id.to_string())
            })?,
            url: Url::parse(url.trim())?,
        })
    }
}
