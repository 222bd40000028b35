//! An in-process partitioned collection.
//!
//! [`Partitioned`] is the collection abstraction every dataset operation is
//! written against: a fixed list of partitions processed in parallel on the
//! current rayon pool, plus one shuffle primitive
//! ([`repartition_and_sort_within_partitions`](Partitioned::repartition_and_sort_within_partitions))
//! that acts as the barrier between stages.

use std::ops::Deref;
use std::sync::Arc;

use rayon::prelude::*;

use crate::errors::PartitionError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partitioned<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> Partitioned<T> {
    pub fn new(partitions: Vec<Vec<T>>) -> Self {
        Partitioned { partitions }
    }

    /// `num_partitions` empty partitions.
    pub fn empty(num_partitions: usize) -> Self {
        Partitioned {
            partitions: (0..num_partitions).map(|_| Vec::new()).collect(),
        }
    }

    ///
    /// Split `items` into `num_partitions` contiguous chunks of near-equal
    /// size, keeping their order.
    ///
    /// A partition count of zero is treated as one.
    ///
    pub fn from_vec(items: Vec<T>, num_partitions: usize) -> Self {
        let n = num_partitions.max(1);
        let total = items.len();
        let mut partitions: Vec<Vec<T>> = Vec::with_capacity(n);
        let mut items = items.into_iter();
        for p in 0..n {
            let lo = p * total / n;
            let hi = (p + 1) * total / n;
            partitions.push(items.by_ref().take(hi - lo).collect());
        }
        Partitioned { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of records across all partitions.
    pub fn count(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.is_empty())
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn partition(&self, index: usize) -> Option<&[T]> {
        self.partitions.get(index).map(|p| p.as_slice())
    }

    pub fn into_partitions(self) -> Vec<Vec<T>> {
        self.partitions
    }

    /// Records in partition order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }

    /// Concatenate all partitions, in order.
    pub fn collect(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }

    /// Append the partitions of `other` after this collection's partitions.
    pub fn union(mut self, other: Partitioned<T>) -> Self {
        self.partitions.extend(other.partitions);
        self
    }
}

impl<T> Partitioned<T>
where
    T: Send,
{
    pub fn map_partitions<U, F>(self, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(Vec<T>) -> Vec<U> + Send + Sync,
    {
        Partitioned {
            partitions: self.partitions.into_par_iter().map(f).collect(),
        }
    }

    pub fn map_partitions_with_index<U, F>(self, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(usize, Vec<T>) -> Vec<U> + Send + Sync,
    {
        Partitioned {
            partitions: self
                .partitions
                .into_par_iter()
                .enumerate()
                .map(|(i, p)| f(i, p))
                .collect(),
        }
    }

    /// Like [`map_partitions_with_index`](Self::map_partitions_with_index),
    /// failing as a whole if any partition fails.
    pub fn try_map_partitions_with_index<U, E, F>(self, f: F) -> Result<Partitioned<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<U>, E> + Send + Sync,
    {
        let partitions = self
            .partitions
            .into_par_iter()
            .enumerate()
            .map(|(i, p)| f(i, p))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Partitioned { partitions })
    }

    ///
    /// Combine two collections partition by partition.
    ///
    /// Both sides must have the same number of partitions; `f` receives the
    /// partition index and the two partitions at that index.
    ///
    pub fn zip_partitions<U, V, F>(
        self,
        other: Partitioned<U>,
        f: F,
    ) -> Result<Partitioned<V>, PartitionError>
    where
        U: Send,
        V: Send,
        F: Fn(usize, Vec<T>, Vec<U>) -> Vec<V> + Send + Sync,
    {
        if self.num_partitions() != other.num_partitions() {
            return Err(PartitionError::PartitionCountMismatch {
                left: self.num_partitions(),
                right: other.num_partitions(),
            });
        }
        Ok(Partitioned {
            partitions: self
                .partitions
                .into_par_iter()
                .zip(other.partitions.into_par_iter())
                .enumerate()
                .map(|(i, (a, b))| f(i, a, b))
                .collect(),
        })
    }

    ///
    /// Shuffle every record to the partition chosen by `key_fn`, then sort
    /// each destination partition by the returned key.
    ///
    /// The sort is stable, so records with equal keys keep the order in
    /// which they were gathered (source partition order).
    ///
    pub fn repartition_and_sort_within_partitions<K, F>(
        self,
        num_partitions: usize,
        key_fn: F,
    ) -> Result<Partitioned<T>, PartitionError>
    where
        K: Ord + Send,
        F: Fn(&T) -> (usize, K) + Send + Sync,
    {
        if num_partitions == 0 {
            return Err(PartitionError::ZeroPartitions);
        }

        // STEP 1: bucket each source partition by destination
        let buckets = self
            .partitions
            .into_par_iter()
            .map(|partition| {
                let mut local: Vec<Vec<(K, T)>> =
                    (0..num_partitions).map(|_| Vec::new()).collect();
                for item in partition {
                    let (destination, key) = key_fn(&item);
                    match local.get_mut(destination) {
                        Some(bucket) => bucket.push((key, item)),
                        None => {
                            return Err(PartitionError::InvalidDestination {
                                destination,
                                partitions: num_partitions,
                            });
                        }
                    }
                }
                Ok(local)
            })
            .collect::<Result<Vec<_>, PartitionError>>()?;

        // STEP 2: gather
        let mut gathered: Vec<Vec<(K, T)>> = (0..num_partitions).map(|_| Vec::new()).collect();
        for local in buckets {
            for (destination, bucket) in local.into_iter().enumerate() {
                gathered[destination].extend(bucket);
            }
        }

        // STEP 3: sort each destination
        let partitions = gathered
            .into_par_iter()
            .map(|mut bucket| {
                bucket.sort_by(|a, b| a.0.cmp(&b.0));
                bucket.into_iter().map(|(_, item)| item).collect()
            })
            .collect();

        Ok(Partitioned { partitions })
    }
}

impl<T> Partitioned<T>
where
    T: Sync,
{
    /// Compute one summary per partition, in partition order.
    pub fn collect_partition_summaries<S, F>(&self, f: F) -> Vec<S>
    where
        S: Send,
        F: Fn(usize, &[T]) -> S + Send + Sync,
    {
        self.partitions
            .par_iter()
            .enumerate()
            .map(|(i, p)| f(i, p))
            .collect()
    }
}

///
/// A read-only value shared with every parallel task.
///
/// Cloning a `Broadcast` is cheap; all clones point at the same value.
///
#[derive(Debug)]
pub struct Broadcast<T>(Arc<T>);

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Broadcast(Arc::clone(&self.0))
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Broadcast<T> {
    pub fn value(&self) -> &T {
        &self.0
    }
}

pub fn broadcast<T>(value: T) -> Broadcast<T> {
    Broadcast(Arc::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(10, 3, vec![3, 3, 4])]
    #[case(2, 4, vec![0, 1, 0, 1])]
    #[case(0, 2, vec![0, 0])]
    #[case(5, 0, vec![5])]
    fn test_from_vec_sizes(
        #[case] total: usize,
        #[case] n: usize,
        #[case] expected: Vec<usize>,
    ) {
        let parts = Partitioned::from_vec((0..total).collect(), n);
        let sizes: Vec<usize> = parts.partitions().iter().map(|p| p.len()).collect();
        assert_eq!(sizes, expected);
        assert_eq!(parts.collect(), (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_partitions_with_index() {
        let parts = Partitioned::new(vec![vec![1, 2], vec![3], vec![]]);
        let tagged = parts.map_partitions_with_index(|i, p| {
            p.into_iter().map(|v| (i, v * 10)).collect()
        });
        assert_eq!(
            tagged.into_partitions(),
            vec![vec![(0, 10), (0, 20)], vec![(1, 30)], vec![]]
        );
    }

    #[test]
    fn test_try_map_partitions_fails_as_a_whole() {
        let parts = Partitioned::new(vec![vec![1], vec![2], vec![3]]);
        let result: Result<Partitioned<i32>, String> = parts.try_map_partitions_with_index(|i, p| {
            if i == 1 {
                Err(format!("partition {i}"))
            } else {
                Ok(p)
            }
        });
        assert_eq!(result, Err("partition 1".to_string()));
    }

    #[test]
    fn test_zip_partitions() {
        let a = Partitioned::new(vec![vec![1, 2], vec![3]]);
        let b = Partitioned::new(vec![vec![10], vec![20, 30]]);
        let zipped = a
            .zip_partitions(b, |_, x, y| x.into_iter().chain(y).collect())
            .unwrap();
        assert_eq!(zipped.into_partitions(), vec![vec![1, 2, 10], vec![3, 20, 30]]);
    }

    #[test]
    fn test_zip_partitions_count_mismatch() {
        let a = Partitioned::new(vec![vec![1], vec![2]]);
        let b: Partitioned<i32> = Partitioned::new(vec![vec![1]]);
        let result = a.zip_partitions(b, |_, x, _| x);
        assert_eq!(
            result,
            Err(PartitionError::PartitionCountMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_repartition_and_sort() {
        let parts = Partitioned::new(vec![vec![9, 4, 7], vec![1, 8, 2], vec![5]]);
        // evens to 0, odds to 1, sorted descending
        let shuffled = parts
            .repartition_and_sort_within_partitions(2, |v| ((v % 2) as usize, std::cmp::Reverse(*v)))
            .unwrap();
        assert_eq!(
            shuffled.into_partitions(),
            vec![vec![8, 4, 2], vec![9, 7, 5, 1]]
        );
    }

    #[test]
    fn test_repartition_is_stable() {
        let parts = Partitioned::new(vec![vec![(1, 'a'), (0, 'b')], vec![(1, 'c'), (0, 'd')]]);
        let shuffled = parts
            .repartition_and_sort_within_partitions(1, |(k, _)| (0, *k))
            .unwrap();
        assert_eq!(
            shuffled.collect(),
            vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]
        );
    }

    #[rstest]
    #[case(0, PartitionError::ZeroPartitions)]
    #[case(2, PartitionError::InvalidDestination { destination: 5, partitions: 2 })]
    fn test_repartition_errors(#[case] n: usize, #[case] expected: PartitionError) {
        let parts = Partitioned::new(vec![vec![1, 2]]);
        let result = parts.repartition_and_sort_within_partitions(n, |v| (5, *v));
        assert_eq!(result, Err(expected));
    }

    #[test]
    fn test_summaries_and_broadcast() {
        let parts = Partitioned::new(vec![vec![1usize, 2, 3], vec![], vec![4]]);
        let offset = broadcast(100);
        let sums = parts.collect_partition_summaries(|i, p| {
            *offset.value() + i * 1000 + p.iter().sum::<usize>()
        });
        assert_eq!(sums, vec![106, 1100, 2104]);
        assert_eq!(parts.count(), 4);
        assert_eq!(*offset.clone(), 100);
    }
}
