//! # Branch Codes
//!
//! Static mapping from full branch names to the short codes embedded in
//! voucher series strings.
//!
//! ```text
//!   "Namakkal"      ──► "NAM"
//!   " PATTUKKOTTAI" ──► "PAT"
//!   "Unknown Town"  ──► ""     (caller logs a warning)
//! ```

/// Known branches and their short codes.
const BRANCHES: &[(&str, &str)] = &[
    ("Namakkal", "NAM"),
    ("Pattukkottai", "PAT"),
    ("Salem", "SLM"),
    ("Erode", "ERD"),
    ("Tiruchengode", "TCD"),
    ("Rasipuram", "RSP"),
    ("Karur", "KRR"),
    ("Trichy", "TRY"),
    ("Madurai", "MDU"),
    ("Coimbatore", "CBE"),
    ("Chennai", "CHN"),
];

/// Resolves a branch name to its short code.
///
/// Matching ignores case and surrounding whitespace. Unknown or empty names
/// resolve to `""`.
///
/// ## Example
/// ```rust
/// use billing_core::branch::branch_short_name;
///
/// assert_eq!(branch_short_name("NAMAKKAL"), "NAM");
/// assert_eq!(branch_short_name("Atlantis"), "");
/// ```
pub fn branch_short_name(name: &str) -> &'static str {
    let name = name.trim();
    BRANCHES
        .iter()
        .find(|(full, _)| full.eq_ignore_ascii_case(name))
        .map(|(_, short)| *short)
        .unwrap_or("")
}

/// All known branch names, in table order.
pub fn branch_names() -> impl Iterator<Item = &'static str> {
    BRANCHES.iter().map(|(full, _)| *full)
}
