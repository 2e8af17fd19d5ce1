//! Marker handling and marker-insensitive URL comparison.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid URL {url:?}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub fn parse(href: &str) -> Result<Url, UrlError> {
    Url::parse(href).map_err(|source| UrlError::Parse {
        url: href.to_owned(),
        source,
    })
}

fn has_marker(url: &Url, marker: &str) -> bool {
    url.query_pairs().any(|(k, _)| k == marker)
}

fn remove_marker(url: &mut Url, marker: &str) {
    if !has_marker(url, marker) {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != marker)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Drop every occurrence of the marker parameter.
///
/// URLs without the marker come back byte-for-byte unchanged.
pub fn strip_marker(href: &str, marker: &str) -> Result<String, UrlError> {
    let mut url = parse(href)?;
    remove_marker(&mut url, marker);
    Ok(url.into())
}

/// Set the marker to `true`, replacing any existing value.
pub fn with_marker(href: &str, marker: &str) -> Result<String, UrlError> {
    let mut url = parse(href)?;
    remove_marker(&mut url, marker);
    url.query_pairs_mut().append_pair(marker, "true");
    Ok(url.into())
}

/// Canonical form used for comparisons: decoded path, decoded and sorted
/// query pairs without the marker, decoded fragment.
#[derive(Debug, PartialEq, Eq)]
struct Canonical {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
    fragment: Option<String>,
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn canonical(href: &str, marker: &str) -> Result<Canonical, UrlError> {
    let url = parse(href)?;
    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != marker)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    query.sort();
    Ok(Canonical {
        scheme: url.scheme().to_owned(),
        host: url.host_str().map(str::to_ascii_lowercase),
        port: url.port_or_known_default(),
        path: decode(url.path()),
        query,
        fragment: url.fragment().map(decode),
    })
}

/// Whether two URLs name the same location, ignoring the marker,
/// percent-encoding differences and query parameter order.
///
/// Unparsable input never compares equal.
pub fn same_location(a: &str, b: &str, marker: &str) -> bool {
    match (canonical(a, marker), canonical(b, marker)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Path, query and fragment with the marker removed, e.g. `/products?sort=price`.
pub fn relative_without_marker(href: &str, marker: &str) -> Result<String, UrlError> {
    let mut url = parse(href)?;
    remove_marker(&mut url, marker);
    let mut out = url.path().to_owned();
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

/// Resolve `href` against `base` the way the browser resolves a link.
pub fn resolve(base: &str, href: &str) -> Result<String, UrlError> {
    parse(base)?
        .join(href)
        .map(String::from)
        .map_err(|source| UrlError::Parse {
            url: href.to_owned(),
            source,
        })
}

/// `host[:port]` for the simulated address bar.
pub fn host_with_port(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}
