//! Connection URL rewriting for the encrypted driver scheme.

use std::borrow::Cow;

/// Scheme prefix of a plain MySQL JDBC URL
pub const PLAIN_URL_PREFIX: &str = "jdbc:mysql://";

/// Scheme prefix routed through the encryption-aware driver
pub const ENCDB_URL_PREFIX: &str = "jdbc:mysql:encdb://";

/// Rewrite a MySQL JDBC URL onto the encdb scheme.
///
/// Host, port, path and query are preserved byte-for-byte. Blank URLs, URLs
/// already on the encdb scheme and unrecognized schemes pass through
/// unchanged, which makes the rewrite total and idempotent.
pub fn to_encdb_url(url: &str) -> Cow<'_, str> {
    if url.trim().is_empty() {
        return Cow::Borrowed(url);
    }
    if url.starts_with(ENCDB_URL_PREFIX) {
        return Cow::Borrowed(url);
    }
    if let Some(rest) = url.strip_prefix(PLAIN_URL_PREFIX) {
        return Cow::Owned(format!("{}{}", ENCDB_URL_PREFIX, rest));
    }
    Cow::Borrowed(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_mysql_url_is_rewritten() {
        assert_eq!(
            to_encdb_url("jdbc:mysql://host:3306/db"),
            "jdbc:mysql:encdb://host:3306/db"
        );
    }

    #[test]
    fn test_query_string_is_preserved() {
        assert_eq!(
            to_encdb_url("jdbc:mysql://host:3306/db?useSSL=false&charset=utf8"),
            "jdbc:mysql:encdb://host:3306/db?useSSL=false&charset=utf8"
        );
    }

    #[test]
    fn test_already_encrypted_url_is_unchanged() {
        assert_eq!(
            to_encdb_url("jdbc:mysql:encdb://host/db"),
            "jdbc:mysql:encdb://host/db"
        );
    }

    #[test]
    fn test_other_schemes_are_unchanged() {
        assert_eq!(
            to_encdb_url("jdbc:postgresql://host/db"),
            "jdbc:postgresql://host/db"
        );
    }

    #[test]
    fn test_blank_urls_are_unchanged() {
        assert_eq!(to_encdb_url(""), "");
        assert_eq!(to_encdb_url("   "), "   ");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        for url in [
            "jdbc:mysql://host:3306/db",
            "jdbc:mysql:encdb://host/db",
            "jdbc:postgresql://host/db",
            "",
        ] {
            let once = to_encdb_url(url).into_owned();
            let twice = to_encdb_url(&once).into_owned();
            assert_eq!(once, twice);
        }
    }
}
