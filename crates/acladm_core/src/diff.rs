//! ACL comparison.
//!
//! `nfs4_getfacl` prints the owning-group entry as `A:g:GROUP@` on some
//! filesystems and `A::GROUP@` on others, while templates never carry the
//! `g`. Both sides are normalized before comparing.

use once_cell::sync::Lazy;
use regex::Regex;

static GROUP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ADUL]):([fdniSF]*)g([fdniSF]*):GROUP@:").expect("static regex")
});

/// Canonical form used for comparison: trimmed non-empty lines, `#` headers
/// dropped, and the `g` flag removed from `GROUP@` entries.
pub fn normalize(acl: &str) -> String {
    acl.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| GROUP_MARKER.replace(line, "$1:$2$3:GROUP@:").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when the two ACL texts differ after normalization.
pub fn acls_differ(a: &str, b: &str) -> bool {
    normalize(a) != normalize(b)
}
