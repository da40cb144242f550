//! Suffix-array construction by prefix doubling. Ranks for step `2k` are the
//! packed pair of step-`k` ranks, sorted in parallel; near-linearithmic in
//! chunk size and allocation-light, which is all a few-megabyte chunk needs.

use rayon::prelude::*;

/// Build the permutation of `[0, data.len())` sorted by byte-wise suffix
/// order. Newlines are ordinary bytes.
pub(crate) fn build_suffix_array(data: &[u8]) -> Vec<u32> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = data.iter().map(|&b| b as u32).collect();
    let mut next: Vec<u32> = vec![0; n];
    let mut k = 1usize;
    loop {
        {
            let rank = &rank;
            // Rank pairs packed into one u64 key; +1 keeps 0 free so that a
            // suffix with no second half (it ends before i+k) sorts first.
            let key = |i: u32| -> u64 {
                let i = i as usize;
                let hi = rank[i] as u64 + 1;
                let lo = if i + k < n { rank[i + k] as u64 + 1 } else { 0 };
                (hi << 32) | lo
            };
            sa.par_sort_unstable_by_key(|&i| key(i));
            next[sa[0] as usize] = 0;
            for w in 1..n {
                let inc = (key(sa[w]) != key(sa[w - 1])) as u32;
                next[sa[w] as usize] = next[sa[w - 1] as usize] + inc;
            }
        }
        std::mem::swap(&mut rank, &mut next);
        if rank[sa[n - 1] as usize] as usize == n - 1 {
            break;
        }
        k <<= 1;
    }
    sa
}
