//! URL encoding/decoding utilities

/// Encodes a string using URL encoding
///
/// # Arguments
/// * `input` - The string to encode
///
/// # Returns
/// * String containing the URL-encoded input
///
/// # Examples
/// ```
/// use uri_outbound::utils::url::url_encode;
///
/// let encoded = url_encode("p@ss#1");
/// assert_eq!(encoded, "p%40ss%231");
/// ```
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Decodes a URL-encoded string
///
/// `+` is left alone, so Base64 payloads survive a decode pass.
///
/// # Arguments
/// * `input` - The URL-encoded string to decode
///
/// # Returns
/// * String containing the decoded input
/// * Returns the original string if decoding fails
///
/// # Examples
/// ```
/// use uri_outbound::utils::url::url_decode;
///
/// let decoded = url_decode("Hello%20World%21");
/// assert_eq!(decoded, "Hello World!");
/// ```
pub fn url_decode(input: &str) -> String {
    if !input.contains('%') {
        return input.to_string();
    }
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Splits `text#fragment` at the first `#`.
pub fn split_fragment(input: &str) -> (&str, Option<&str>) {
    match input.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (input, None),
    }
}

/// Splits `text?query` at the first `?`.
pub fn split_query(input: &str) -> (&str, Option<&str>) {
    match input.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (input, None),
    }
}

/// Parses `host:port`, accepting bracketed IPv6 hosts.
///
/// The returned host has its brackets removed. Returns `None` when the
/// port is missing, not a number, or zero.
pub fn parse_host_port(input: &str) -> Option<(String, u16)> {
    let input = input.trim().trim_end_matches('/');
    let (host, port) = if let Some(rest) = input.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        (host, after.strip_prefix(':')?)
    } else {
        input.rsplit_once(':')?
    };

    if host.is_empty() {
        return None;
    }
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Some((host.to_string(), port)),
        _ => None,
    }
}
