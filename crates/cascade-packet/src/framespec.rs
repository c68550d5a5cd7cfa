//! Frame-sequence path specs.
//!
//! Paths may stand for a whole frame sequence by embedding a run of `#`
//! symbols: `beauty.####.exr` expands to `beauty.0012.exr` for frame 12,
//! padded to the run length.

use std::sync::LazyLock;

use regex::Regex;

static FRAME_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#+").unwrap());

/// Does this path contain frame symbols?
pub fn has_frame_symbols(path: &str) -> bool {
  path.contains('#')
}

/// Expand every `#` run in the path to the given frame number, zero-padded
/// to the run length.
pub fn expand(path: &str, frame: i64) -> String {
  FRAME_RUN
    .replace_all(path, |caps: &regex::Captures| {
      format!("{:0width$}", frame, width = caps[0].len())
    })
    .into_owned()
}
