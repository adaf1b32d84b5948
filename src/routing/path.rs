/// Checks that a request target is made of `/`-prefixed segments using only
/// unreserved characters, sub-delimiters, `:`, `@` and `%`.
///
/// The empty string is valid. A query string (`?`) or fragment (`#`) is not.
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() {
        return true;
    }

    path.starts_with('/') && path.chars().all(is_path_char)
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/._~!$&'()*+,;=:@%-".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_paths() {
        assert!(is_valid_path(""));
        assert!(is_valid_path("/"));
        assert!(is_valid_path("//"));
        assert!(is_valid_path("/site/index.html"));
        assert!(is_valid_path("/a%20b/~user/x;y=1"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(!is_valid_path("site/index.html"));
        assert!(!is_valid_path("/search?q=rust"));
        assert!(!is_valid_path("/a b"));
        assert!(!is_valid_path("/frag#top"));
        assert!(!is_valid_path("/caf\u{e9}"));
    }
}
