//! Longest increasing subsequence, used by the keyed diff to find the
//! children that can stay where they are.

/// Indices of one longest strictly increasing subsequence of `arr`,
/// ignoring zero entries.
///
/// Zero marks "no old counterpart" in the keyed diff, so those slots can
/// never be part of the stable sequence.
///
/// Runs in O(n log n): `result` holds, for each length, the index of the
/// smallest tail seen so far, and `predecessors` lets the final sequence be
/// walked back from its last element.
///
/// ```
/// use trellis_core::render::longest_increasing_subsequence;
///
/// assert_eq!(longest_increasing_subsequence(&[5, 3, 4, 0, 0]), vec![1, 2]);
/// ```
pub fn longest_increasing_subsequence(arr: &[usize]) -> Vec<usize> {
    let mut predecessors = vec![usize::MAX; arr.len()];
    let mut result: Vec<usize> = Vec::with_capacity(arr.len());

    for (i, &value) in arr.iter().enumerate() {
        if value == 0 {
            continue;
        }
        match result.last() {
            None => {
                result.push(i);
                continue;
            }
            Some(&last) if arr[last] < value => {
                predecessors[i] = last;
                result.push(i);
                continue;
            }
            Some(_) => {}
        }

        // First tail that is not smaller than `value`
        let (mut lo, mut hi) = (0, result.len() - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if arr[result[mid]] < value {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if value < arr[result[lo]] {
            if lo > 0 {
                predecessors[i] = result[lo - 1];
            }
            result[lo] = i;
        }
    }

    let mut len = result.len();
    if let Some(&tail) = result.last() {
        let mut cursor = tail;
        while len > 0 {
            len -= 1;
            result[len] = cursor;
            cursor = predecessors[cursor];
        }
    }
    result
}
