use std::ops::Range;

/// Split `file_count` entries into `workers` contiguous slices.
///
/// Every worker gets `file_count / workers` entries and the last one also
/// takes the remainder. With more workers than files each of the first
/// `file_count` workers gets one entry and the rest get empty slices.
pub fn partition(file_count: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);

    if workers > file_count {
        return (0..workers)
            .map(|i| if i < file_count { i..i + 1 } else { file_count..file_count })
            .collect();
    }

    let per_worker = file_count / workers;
    let left = file_count % workers;

    (0..workers)
        .map(|i| {
            let start = i * per_worker;
            let len = if i == workers - 1 { per_worker + left } else { per_worker };
            start..start + len
        })
        .collect()
}
