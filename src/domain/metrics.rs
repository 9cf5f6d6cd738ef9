//! Node health snapshot exchanged between the node, the daemon and the load balancer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected snapshot: the node reported a finalized head above its best head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("finalized block height {finalized} is above best block height {best}")]
pub struct InvalidSnapshot {
    pub best: u64,
    pub finalized: u64,
}

/// One sample of node health.
///
/// Every field is optional: `None` means the node did not report the value,
/// which is different from an observed zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "NodeMetricsWire", into = "NodeMetricsWire")]
pub struct NodeMetrics {
    peer_count: Option<u64>,
    best_block_height: Option<u64>,
    finalized_block_height: Option<u64>,
    ready_transaction_count: Option<u64>,
}

impl NodeMetrics {
    pub fn new(
        peer_count: Option<u64>,
        best_block_height: Option<u64>,
        finalized_block_height: Option<u64>,
        ready_transaction_count: Option<u64>,
    ) -> Result<Self, InvalidSnapshot> {
        if let (Some(best), Some(finalized)) = (best_block_height, finalized_block_height) {
            if finalized > best {
                return Err(InvalidSnapshot { best, finalized });
            }
        }

        Ok(Self {
            peer_count,
            best_block_height,
            finalized_block_height,
            ready_transaction_count,
        })
    }

    pub fn peer_count(&self) -> Option<u64> {
        self.peer_count
    }

    pub fn best_block_height(&self) -> Option<u64> {
        self.best_block_height
    }

    pub fn finalized_block_height(&self) -> Option<u64> {
        self.finalized_block_height
    }

    pub fn ready_transaction_count(&self) -> Option<u64> {
        self.ready_transaction_count
    }

    /// True when the node reported none of the four values.
    pub fn is_empty(&self) -> bool {
        self.peer_count.is_none()
            && self.best_block_height.is_none()
            && self.finalized_block_height.is_none()
            && self.ready_transaction_count.is_none()
    }
}

/// JSON shape expected by the load balancer. Absent values are omitted.
#[derive(Serialize, Deserialize)]
struct NodeMetricsWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    peer_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    best_block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finalized_block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ready_transaction_count: Option<u64>,
}

impl TryFrom<NodeMetricsWire> for NodeMetrics {
    type Error = InvalidSnapshot;

    fn try_from(wire: NodeMetricsWire) -> Result<Self, Self::Error> {
        NodeMetrics::new(
            wire.peer_count,
            wire.best_block_height,
            wire.finalized_block_height,
            wire.ready_transaction_count,
        )
    }
}

impl From<NodeMetrics> for NodeMetricsWire {
    fn from(metrics: NodeMetrics) -> Self {
        Self {
            peer_count: metrics.peer_count,
            best_block_height: metrics.best_block_height,
            finalized_block_height: metrics.finalized_block_height,
            ready_transaction_count: metrics.ready_transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_finalized_above_best() {
        let err = NodeMetrics::new(None, Some(10), Some(11), None).unwrap_err();
        assert_eq!(err.best, 10);
        assert_eq!(err.finalized, 11);
        assert!(err.to_string().contains("above best block height"));
    }

    #[test]
    fn test_finality_check_skipped_when_one_height_missing() {
        assert!(NodeMetrics::new(None, None, Some(500), None).is_ok());
        assert!(NodeMetrics::new(None, Some(5), None, None).is_ok());
        assert!(NodeMetrics::new(None, Some(7), Some(7), None).is_ok());
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let metrics = NodeMetrics::new(Some(0), None, None, Some(3)).unwrap();
        let json = serde_json::to_string(&metrics).expect("Failed to serialize");
        assert_eq!(json, r#"{"peer_count":0,"ready_transaction_count":3}"#);
    }

    #[test]
    fn test_zero_survives_round_trip() {
        let metrics = NodeMetrics::new(Some(0), Some(0), Some(0), Some(0)).unwrap();
        let json = serde_json::to_string(&metrics).unwrap();
        let decoded: NodeMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, metrics);
        assert_eq!(decoded.peer_count(), Some(0));
    }

    #[test]
    fn test_every_field_subset_round_trips() {
        let values = [19u64, 432933, 432640, 0];
        for mask in 0u8..16 {
            let pick = |i: usize| (mask & (1 << i) != 0).then_some(values[i]);
            let metrics = NodeMetrics::new(pick(0), pick(1), pick(2), pick(3)).unwrap();

            let json = serde_json::to_string(&metrics).unwrap();
            let decoded: NodeMetrics = serde_json::from_str(&json).unwrap();

            assert_eq!(decoded, metrics, "mask {mask:#06b} via {json}");
            assert_eq!(decoded.is_empty(), mask == 0);
        }
    }

    #[test]
    fn test_null_fields_decode_as_absent() {
        let decoded: NodeMetrics =
            serde_json::from_str(r#"{"peer_count":null,"best_block_height":12}"#).unwrap();
        assert_eq!(decoded.peer_count(), None);
        assert_eq!(decoded.best_block_height(), Some(12));
        assert_eq!(decoded.finalized_block_height(), None);
    }

    #[test]
    fn test_deserialization_enforces_finality_invariant() {
        let result: Result<NodeMetrics, _> =
            serde_json::from_str(r#"{"best_block_height":1,"finalized_block_height":2}"#);
        assert!(result.is_err());
    }
}
