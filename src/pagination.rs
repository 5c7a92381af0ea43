//! Request-window planning for paginated retrievals.
//!
//! The repository API caps the number of rows a single request may return, so
//! a full retrieval is split into a sequence of `(rows, start)` windows. The
//! planner is pure arithmetic; issuing the requests is the API client's job.

/// One bounded page of a paginated result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestWindow {
    /// Number of rows requested by this window.
    pub rows: u64,
    /// Zero-based offset of the first row.
    pub start: u64,
}

/// How the planner treats a total that is not an exact multiple of the cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowingMode {
    /// Emit only full windows. When `total % page_cap != 0` the remainder
    /// records are not covered by any window: `plan(12000, 5000)` yields two
    /// windows covering `[0, 10000)` and silently omits the last 2000
    /// records. This matches the upstream reporting system and is the mode
    /// its historical exports were produced with.
    #[default]
    DropRemainder,
    /// Append one final partial window so every record is covered.
    Exhaustive,
}

/// Computes the ordered window sequence needed to retrieve `total` records
/// with at most `page_cap` rows per request.
///
/// Windows are contiguous from offset 0, strictly ascending by offset, and
/// never start at `total`. A total below the cap (including zero) produces
/// exactly one window of `total` rows.
///
/// `page_cap` must be positive.
pub fn plan(total: u64, page_cap: u64, mode: WindowingMode) -> Vec<RequestWindow> {
    debug_assert!(page_cap > 0, "page cap must be positive");

    if total < page_cap {
        return vec![RequestWindow {
            rows: total,
            start: 0,
        }];
    }

    let full_windows = total / page_cap;
    let mut windows: Vec<RequestWindow> = (0..full_windows)
        .map(|i| RequestWindow {
            rows: page_cap,
            start: i * page_cap,
        })
        .collect();

    if mode == WindowingMode::Exhaustive {
        let remainder = total % page_cap;
        if remainder > 0 {
            windows.push(RequestWindow {
                rows: remainder,
                start: full_windows * page_cap,
            });
        }
    }

    windows
}
