//! Order-preserving partitioning into fixed-size chunks.

use crate::error::BulkError;

/// Split `items` into contiguous chunks of at most `batch_size`.
///
/// Every chunk but the last holds exactly `batch_size` items. Empty input
/// yields no chunks.
pub fn partition<T: Clone>(items: &[T], batch_size: usize) -> Result<Vec<Vec<T>>, BulkError> {
    if batch_size == 0 {
        return Err(BulkError::InvalidBatchSize(batch_size));
    }
    Ok(items.chunks(batch_size).map(<[T]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_uneven() {
        let items: Vec<u32> = (0..137).collect();
        let chunks = partition(&items, 50).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 50, 37]);
    }

    #[test]
    fn test_partition_preserves_order() {
        let items: Vec<u32> = (0..23).collect();
        for batch_size in 1..=25 {
            let chunks = partition(&items, batch_size).unwrap();
            let flattened: Vec<u32> = chunks.iter().flatten().copied().collect();
            assert_eq!(flattened, items);
            assert_eq!(chunks.len(), items.len().div_ceil(batch_size));
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= batch_size));
        }
    }

    #[test]
    fn test_partition_exact_multiple() {
        let items = vec!["a", "b", "c", "d"];
        let chunks = partition(&items, 2).unwrap();
        assert_eq!(chunks, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_partition_empty() {
        let items: Vec<String> = Vec::new();
        assert!(partition(&items, 50).unwrap().is_empty());
    }

    #[test]
    fn test_partition_zero_batch_size() {
        assert_eq!(
            partition(&[1, 2, 3], 0),
            Err(BulkError::InvalidBatchSize(0))
        );
    }
}
