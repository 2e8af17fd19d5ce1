use url::Url;

/// Which side of the sync protocol a browsing context plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }
}

/// Slave when the marker parameter is present and `true`, master otherwise.
///
/// An unparsable location is treated as master.
pub fn detect_role(href: &str, marker: &str) -> Role {
    let Ok(url) = Url::parse(href) else {
        return Role::Master;
    };
    let marked = url
        .query_pairs()
        .any(|(k, v)| k == marker && v.eq_ignore_ascii_case("true"));
    if marked { Role::Slave } else { Role::Master }
}
