//! Fast URL slicing utilities
//!
//! These functions avoid allocations and work directly on string slices.
//! They are only as strict as page classification needs: scheme, host, path
//! and query are located by their delimiters, nothing is percent-decoded.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' {
            break;
        }
    }

    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    let host = &url[host_start..host_end];
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Extract host with port if present.
#[inline]
pub fn extract_host_with_port(url: &str) -> Option<&str> {
    let scheme_end = get_scheme_end(url)?;
    let (host_start, _) = get_host_position(url)?;
    let bytes = url.as_bytes();

    let mut end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'/' || b == b'?' || b == b'#' {
            end = i;
            break;
        }
    }

    Some(&url[host_start..end.max(host_start)])
}

// =============================================================================
// Path / Query Extraction
// =============================================================================

/// Byte offset where the path starts, or where it would start.
fn path_start(url: &str) -> usize {
    let scheme_end = match get_scheme_end(url) {
        Some(pos) => pos,
        None => return url.len(),
    };

    url.as_bytes()[scheme_end..]
        .iter()
        .position(|&b| b == b'/' || b == b'?' || b == b'#')
        .map(|i| scheme_end + i)
        .unwrap_or(url.len())
}

/// Extract the path portion of a URL. Always begins with `/`.
#[inline]
pub fn extract_path(url: &str) -> &str {
    let start = path_start(url);
    let bytes = url.as_bytes();
    if start >= bytes.len() || bytes[start] != b'/' {
        return "/";
    }

    let end = bytes[start..]
        .iter()
        .position(|&b| b == b'?' || b == b'#')
        .map(|i| start + i)
        .unwrap_or(bytes.len());

    &url[start..end]
}

/// Extract the query string (without the leading `?`), if any.
#[inline]
pub fn extract_query(url: &str) -> Option<&str> {
    let start = path_start(url);
    let rest = &url[start..];
    let rest = match rest.find('#') {
        Some(hash) => &rest[..hash],
        None => rest,
    };
    let q = rest.find('?')?;
    Some(&rest[q + 1..])
}

/// Iterate over non-empty path segments.
pub fn path_segments(url: &str) -> impl Iterator<Item = &str> {
    extract_path(url).split('/').filter(|s| !s.is_empty())
}

// =============================================================================
// Navigation Identity
// =============================================================================

/// Normalized location used to detect client-side navigations.
///
/// Host (with port), path and query, lowercased host, fragment excluded.
/// Two URLs that differ only in their fragment yield the same identifier.
pub fn navigation_identifier(url: &str) -> String {
    let host = extract_host_with_port(url).unwrap_or("");
    let path = extract_path(url);
    let mut id = String::with_capacity(host.len() + path.len() + 8);
    id.push_str(&host.to_ascii_lowercase());
    id.push_str(path);
    if let Some(query) = extract_query(url) {
        if !query.is_empty() {
            id.push('?');
            id.push_str(query);
        }
    }
    id
}

/// Resolve a link's `href` attribute against the page URL.
///
/// Handles absolute, scheme-relative and root-relative references, which is
/// all host markup uses for channel links. Other relative forms yield `None`.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.contains("://") {
        return Some(href.to_string());
    }
    let scheme_end = get_scheme_end(base)?;
    let scheme = &base[..scheme_end - 3];
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("{}://{}", scheme, rest));
    }
    if href.starts_with('/') {
        let host = extract_host_with_port(base)?;
        return Some(format!("{}://{}{}", scheme, host, href));
    }
    None
}
