/// Accept a post-login `return_to` only if it is a same-origin relative path.
///
/// Rejected: anything not starting with a single `/`, protocol-relative
/// URLs (`//host`), embedded schemes (`://`) and control characters.
///
/// ```
/// use signin_core::auth::validate_return_to;
///
/// assert_eq!(validate_return_to("/account"), Some("/account"));
/// assert_eq!(validate_return_to("//evil.com"), None);
/// assert_eq!(validate_return_to("https://evil.com"), None);
/// ```
pub fn validate_return_to(url: &str) -> Option<&str> {
    let same_origin_path = url.starts_with('/') && !url.starts_with("//");
    let clean = !url.contains("://") && !url.chars().any(char::is_control);

    (same_origin_path && clean).then_some(url)
}
