use rangejoin_partition::Partitioned;

use crate::errors::JoinResult;

/// What one partition learned about one copy of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial<X, O> {
    pub id: u64,
    pub value: X,
    /// matches found for this copy
    pub matched: usize,
    /// matched records from the other side, when grouping by this side
    pub others: Vec<O>,
}

///
/// Merge the partials of every record copy into one result per record.
///
/// Partials are shuffled by record id, so all copies of a record meet in
/// one partition; match counts add up and matched records concatenate.
///
pub fn reconcile<X, O>(
    partials: Partitioned<Partial<X, O>>,
    num_partitions: usize,
) -> JoinResult<Partitioned<(X, usize, Vec<O>)>>
where
    X: Send,
    O: Send,
{
    let n = num_partitions.max(1) as u64;
    let shuffled = partials
        .repartition_and_sort_within_partitions(n as usize, |p| ((p.id % n) as usize, p.id))?;

    Ok(shuffled.map_partitions(|partials| {
        let mut merged: Vec<Partial<X, O>> = Vec::new();
        for partial in partials {
            match merged.last_mut() {
                Some(last) if last.id == partial.id => {
                    last.matched += partial.matched;
                    last.others.extend(partial.others);
                }
                _ => merged.push(partial),
            }
        }
        merged
            .into_iter()
            .map(|p| (p.value, p.matched, p.others))
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn partial(id: u64, value: &'static str, others: Vec<u32>) -> Partial<&'static str, u32> {
        Partial {
            id,
            value,
            matched: others.len(),
            others,
        }
    }

    #[test]
    fn test_copies_are_merged_once() {
        let partials = Partitioned::new(vec![
            vec![partial(1, "a", vec![10]), partial(2, "b", vec![])],
            vec![partial(1, "a", vec![11, 12]), partial(3, "c", vec![13])],
            vec![partial(2, "b", vec![])],
        ]);
        let mut merged = reconcile(partials, 2).unwrap().collect();
        merged.sort();
        assert_eq!(
            merged,
            vec![("a", 3, vec![10, 11, 12]), ("b", 0, vec![]), ("c", 1, vec![13])]
        );
    }
}
