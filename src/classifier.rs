//! Page and host classification against the theme's allow-lists.

/// Whether `path` falls under one of the allow-listed paths.
///
/// A path matches an entry when it is the entry itself, the entry with a
/// trailing `/`, or anything below `entry/`. Matching is by whole path
/// segments: `/teste` does not admit `/testemunhos`.
pub fn is_eligible(path: &str, allow_list: &[String]) -> bool {
    allow_list.iter().any(|allowed| {
        let allowed = allowed.as_str();
        if path == allowed {
            return true;
        }
        // `/` and other entries that already end in a separator only match
        // themselves; otherwise `/` would admit every page.
        if allowed.ends_with('/') {
            return false;
        }
        path.strip_prefix(allowed)
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Whether the page host belongs to the tenant: an exact allowed host or a
/// subdomain of one. Comparison ignores ASCII case and a trailing dot.
pub fn host_allowed(host: &str, allowed_hosts: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.trim_end_matches('.').to_ascii_lowercase();
        host == allowed
            || host
                .strip_suffix(allowed.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
