// src/sched/partition.rs

/// Split `total_size` samples into `shards_num` contiguous shards as evenly
/// as integer arithmetic allows.
///
/// Shard `id` covers `[floor(id * total_size / shards_num),
/// floor((id + 1) * total_size / shards_num))`, so the returned sizes sum to
/// `total_size` and differ by at most 1 between shards. The partition is a
/// pure function of `(shards_num, total_size)`; the scheduler snapshots it
/// once and re-indexes it as shard assignments rotate.
pub fn balanced_partition(shards_num: i64, total_size: i64) -> Vec<i64> {
    debug_assert!(shards_num > 0);
    (0..shards_num)
        .map(|id| (id + 1) * total_size / shards_num - id * total_size / shards_num)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sums_to_total() {
        for shards in 1..16 {
            for total in 0..100 {
                let sizes = balanced_partition(shards, total);
                assert_eq!(sizes.len(), shards as usize);
                assert_eq!(
                    sizes.iter().sum::<i64>(),
                    total,
                    "partition of {} into {} shards lost samples",
                    total,
                    shards
                );
            }
        }
    }

    #[test]
    fn test_partition_balanced() {
        for shards in 1..16 {
            for total in 0..100 {
                let sizes = balanced_partition(shards, total);
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(
                    max - min <= 1,
                    "partition of {} into {} shards is unbalanced: {:?}",
                    total,
                    shards,
                    sizes
                );
            }
        }
    }

    #[test]
    fn test_partition_exact_division() {
        assert_eq!(balanced_partition(4, 12), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_partition_uneven() {
        // 7 samples over 2 shards: the later shard takes the extra sample
        assert_eq!(balanced_partition(2, 7), vec![3, 4]);
    }

    #[test]
    fn test_partition_more_shards_than_samples() {
        let sizes = balanced_partition(5, 3);
        assert_eq!(sizes.iter().sum::<i64>(), 3);
        assert!(sizes.iter().all(|&s| s == 0 || s == 1));
    }

    #[test]
    fn test_partition_empty_dataset() {
        assert_eq!(balanced_partition(3, 0), vec![0, 0, 0]);
    }
}
