//! Compliance checks for dot-separated numeric versions
//!
//! Versions look like `17`, `1.2.3` or `2.7.18-SNAPSHOT`. The suffix after the
//! first `-` is ignored when comparing. Anything else is treated as
//! non-compliant rather than an error.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::version::operator::VersionOperator;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)*(-[a-zA-Z0-9]+)?$").expect("version pattern is valid")
});

/// Returns true if the version matches `^\d+(\.\d+)*(-[A-Za-z0-9]+)?$`
pub fn is_valid_version(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// Check whether `current` satisfies `target` under `operator`
///
/// Fails closed: a missing current version, a version that does not match the
/// version pattern, or a segment that does not fit in a `u64` all yield `false`.
///
/// TILDE and CARET gate on the leading segments and then require
/// `current >= target`; there is no separate upper-bound check.
pub fn is_version_compliant(
    current: Option<&str>,
    target: &str,
    operator: VersionOperator,
) -> bool {
    let Some(current) = current else {
        warn!(
            "Version comparison failed: current version missing, target={}",
            target
        );
        return false;
    };

    if !is_valid_version(current) || !is_valid_version(target) {
        warn!(
            "Invalid version format: current={}, target={}",
            current, target
        );
        return false;
    }

    let (Some(current_segments), Some(target_segments)) = (
        parse_segments(strip_suffix(current)),
        parse_segments(strip_suffix(target)),
    ) else {
        warn!(
            "Version segment out of range: current={}, target={}",
            current, target
        );
        return false;
    };

    let ordering = compare_segments(&current_segments, &target_segments);

    let result = match operator {
        VersionOperator::Equal => ordering.is_eq(),
        VersionOperator::Greater => ordering.is_gt(),
        VersionOperator::GreaterEqual => ordering.is_ge(),
        VersionOperator::Less => ordering.is_lt(),
        VersionOperator::LessEqual => ordering.is_le(),
        VersionOperator::Tilde => is_tilde_compliant(&current_segments, &target_segments, ordering),
        VersionOperator::Caret => is_caret_compliant(&current_segments, &target_segments, ordering),
    };

    debug!(
        "Version compliance: current={}, target={}{}, result={}",
        current, operator, target, result
    );

    result
}

/// Compare two versions segment by segment, padding the shorter one with zeros
///
/// Suffixes are stripped first. Returns `None` if either side has a
/// non-numeric or out-of-range segment.
pub fn compare_versions(left: &str, right: &str) -> Option<Ordering> {
    let left = parse_segments(strip_suffix(left))?;
    let right = parse_segments(strip_suffix(right))?;
    Some(compare_segments(&left, &right))
}

fn strip_suffix(version: &str) -> &str {
    match version.find('-') {
        Some(index) if index > 0 => &version[..index],
        _ => version,
    }
}

fn parse_segments(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect()
}

/// Segment at `index`, zero when the version is shorter
fn segment(segments: &[u64], index: usize) -> u64 {
    segments.get(index).copied().unwrap_or(0)
}

fn compare_segments(left: &[u64], right: &[u64]) -> Ordering {
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| segment(left, i).cmp(&segment(right, i)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

// ~1     -> same major
// ~1.2.3 -> same major and minor
fn is_tilde_compliant(current: &[u64], target: &[u64], ordering: Ordering) -> bool {
    let same_major = segment(current, 0) == segment(target, 0);
    if target.len() < 2 {
        same_major && ordering.is_ge()
    } else {
        same_major && segment(current, 1) == segment(target, 1) && ordering.is_ge()
    }
}

// ^1.2.3 -> same major
// ^0.2.3 -> major 0, same minor
// ^0.0.3 -> major 0, minor 0, same patch
// ^0 and ^0.0 never match
fn is_caret_compliant(current: &[u64], target: &[u64], ordering: Ordering) -> bool {
    let major = segment(target, 0);
    if major > 0 {
        segment(current, 0) == major && ordering.is_ge()
    } else if target.len() > 1 && target[1] > 0 {
        segment(current, 0) == 0 && segment(current, 1) == target[1] && ordering.is_ge()
    } else if target.len() > 2 {
        segment(current, 0) == 0
            && segment(current, 1) == 0
            && segment(current, 2) == target[2]
            && ordering.is_ge()
    } else {
        false
    }
}
