//! Upper bounds on the duplicate bonds still obtainable from a state.
//!
//! Every removal of a duplicate of `s` bonds saves `s - 1` joining
//! operations. If `savings` bounds the total savings possible below an
//! assembly state, then no descendant can have an assembly index smaller than
//! `total_bonds - duplicate_bonds - 1 - savings`, and the state is pruned
//! whenever that lower bound cannot beat the best index found so far.
//!
//! All bounds are built from integer addition chains: assembling a fragment
//! of `n` bonds out of pieces of at most `j` bonds saves at most
//! `n - ceil(n / j)`, and producing the first `j`-bond piece itself costs at
//! least `ceil(log2 j)` joins.

use bit_set::BitSet;

fn ceil_log2(j: usize) -> i64 {
    debug_assert!(j >= 2);
    (usize::BITS - (j - 1).leading_zeros()) as i64
}

/// Savings bound for fragments of the given `sizes` when no duplicate has
/// more than `largest` bonds.
pub fn addition_chain_bound(sizes: &[usize], largest: usize) -> i64 {
    let pairs: i64 = sizes.iter().map(|&s| (s / 2) as i64).sum();
    let mut best = pairs - 1;
    for j in 3..=largest {
        let total: i64 = sizes
            .iter()
            .map(|&s| (s - s / j) as i64 - i64::from(s % j != 0))
            .sum();
        best = best.max(total - ceil_log2(j));
    }
    best
}

/// Savings bound when duplicates have `j` bonds and only `covered[i]` bonds
/// of fragment `i` (out of `main[i]`) can lie inside one. The covered bonds
/// are assembled from `j`-bond pieces, the rest from pieces of at most
/// `j - 1` bonds.
pub fn split_bound(main: &[usize], j: usize, covered: &[usize]) -> i64 {
    debug_assert!(j >= 2);
    let total: i64 = main
        .iter()
        .zip(covered)
        .map(|(&m, &c)| {
            let inside = c - c % j;
            let outside = m.saturating_sub(inside);
            (inside - inside / j) as i64 + (outside - outside / (j - 1)) as i64
                - i64::from(outside % (j - 1) != 0)
        })
        .sum();
    total - ceil_log2(j)
}

fn counts(masks: &[BitSet]) -> Vec<usize> {
    masks.iter().map(BitSet::len).collect()
}

/// Savings bound for each duplicate size, from the live coverage of a warm
/// enumeration: entry `k` bounds the savings when the largest duplicate has
/// `k + 2` bonds.
pub fn size_table(max_size: usize, covered: &[Vec<BitSet>]) -> Vec<i64> {
    let Some(pairs) = covered.first() else {
        return Vec::new();
    };
    let main = counts(pairs);

    let mut table = Vec::with_capacity(max_size.saturating_sub(1));
    table.push(main.iter().map(|&c| (c / 2) as i64).sum::<i64>() - 1);
    for j in 3..=max_size {
        let level = covered.get(j - 2).map(|l| counts(l)).unwrap_or_default();
        let level: Vec<usize> = (0..main.len())
            .map(|i| level.get(i).copied().unwrap_or(0))
            .collect();
        table.push(split_bound(&main, j, &level));
    }
    table
}

/// Running maximum of `table`.
pub fn prefix_max(table: &[i64]) -> Vec<i64> {
    table
        .iter()
        .scan(i64::MIN, |best, &x| {
            *best = (*best).max(x);
            Some(*best)
        })
        .collect()
}

/// Savings bound for a freshly fragmented child state, whose first fragment
/// is the kept half of the duplicate just used. `used` covers the group the
/// duplicate came from and `level` every group of its size visited so far.
pub fn post_fragmentation_bound(fragments: &[BitSet], used: &BitSet, level: &BitSet) -> i64 {
    if fragments.len() < 2 {
        return 0;
    }
    let largest = fragments[0].len();
    let mut main = vec![largest];
    let mut in_used = vec![largest];
    let mut in_level = vec![largest];
    for fragment in &fragments[1..] {
        main.push(fragment.len());
        in_used.push(fragment.intersection(used).count());
        in_level.push(fragment.intersection(level).count());
    }
    split_bound(&main, largest, &in_used).max(split_bound(&main, largest, &in_level) - 1)
}

/// Lower bound on the assembly index of a child state whose last duplicate
/// had `size` bonds, given a savings `estimate`.
pub fn lower_bound(
    total_bonds: usize,
    duplicate_bonds: usize,
    size: usize,
    estimate: i64,
    sizes: &[usize],
) -> i64 {
    let estimate = if size > 2 {
        estimate.max(addition_chain_bound(sizes, size - 1))
    } else {
        estimate
    };
    total_bonds as i64 - duplicate_bonds as i64 - 1 - estimate
}
