//! Input validation utilities.
//!
//! This module provides validation functions for content identifiers and
//! the URLs used by the fetcher and the probe.

use std::sync::OnceLock;

use regex::Regex;

/// Multibase alphabets up to base64url, all safe to append to a gateway prefix
fn cid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("CID pattern is valid"))
}

/// Validate a content identifier
///
/// # Arguments
/// * `cid` - The content identifier to check
///
/// # Returns
/// * `Ok(())` if the CID is non-empty and uses only URL-safe multibase characters
/// * `Err(String)` with an error message otherwise
///
/// # Examples
/// ```
/// use verifi::utils::validation::validate_cid;
///
/// assert!(validate_cid("bafybeie3k3hqe445fxunrbzzrtesx6vyfdqj6g6vjhpknvi5tge4ofji2y").is_ok());
/// assert!(validate_cid("").is_err());
/// assert!(validate_cid("bafy/../x").is_err());
/// ```
pub fn validate_cid(cid: &str) -> Result<(), String> {
    if cid.is_empty() {
        return Err("CID cannot be empty".to_string());
    }
    if !cid_pattern().is_match(cid) {
        return Err(format!("CID '{}' contains characters outside the multibase alphabet", cid));
    }
    Ok(())
}

/// Validate that a URL uses http or https
///
/// # Examples
/// ```
/// use verifi::utils::validation::validate_http_url;
///
/// assert!(validate_http_url("https://ipfs.io/ipfs/").is_ok());
/// assert!(validate_http_url("ftp://example.com").is_err());
/// ```
pub fn validate_http_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| format!("URL '{}' must start with http:// or https://", url))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("URL '{}' has no host", url));
    }
    Ok(())
}
