/// Normalizes a raw identifier into a wire-safe identifier.
///
/// Leading and trailing whitespace is trimmed, then every `.`, `=` and space is replaced with
/// `_`. All other characters pass through. Sanitizing is idempotent.
///
/// # Example
///
/// ```
/// assert_eq!(ano_metrics::sanitize(" host.port "), "host_port");
/// assert_eq!(ano_metrics::sanitize("api/v1"), "api/v1");
/// ```
pub fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '.' | '=' | ' ' => '_',
            c => c,
        })
        .collect()
}
