//! Section derivation for resource paths.

/// Returns the section of a resource: an optional `scheme://` and host
/// followed by the first path segment.
///
/// The section of `http://my.site.com/pages/create` is
/// `http://my.site.com/pages`, and of `/pages/create` is `/pages`. Any query
/// or fragment is dropped first, so a resource without a second `/` in its
/// path is returned up to the `?` or `#`.
pub fn section(resource: &str) -> &str {
    let path_start = resource.find("://").map_or(0, |idx| idx + 3);
    let after_scheme = &resource[path_start..];
    let path_end = after_scheme
        .find(|c| c == '?' || c == '#')
        .map_or(resource.len(), |idx| path_start + idx);
    let bounded = &resource[path_start..path_end];

    let Some(host_end) = bounded.find('/') else {
        return &resource[..path_end];
    };
    match bounded[host_end + 1..].find('/') {
        Some(idx) => &resource[..path_start + host_end + 1 + idx],
        None => &resource[..path_end],
    }
}
