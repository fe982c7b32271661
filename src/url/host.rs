use url::Url;

/// Returns the key used for per-host session affinity
///
/// The host is lowercased and the port kept when it is not the scheme default,
/// so two storefronts served from the same machine on different ports do not
/// share cookies.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_trawler::url::host_key;
///
/// let url = Url::parse("https://WWW.OBI.CZ/zahrada").unwrap();
/// assert_eq!(host_key(&url), Some("www.obi.cz".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
