//! Upstream URL construction.
//!
//! Logical repository paths are normalized and percent-encoded segment by
//! segment before being placed into one of the two upstream URL shapes.

use repoproxy_core::AppConfig;

/// Normalize a logical repository path.
///
/// Empty, `.` and `..` segments are dropped, which collapses leading,
/// trailing and repeated `/` and keeps the result inside the repository root.
/// URL parsers resolve dot segments (including `%2e%2e`) before sending, so
/// they must never reach the upstream URL.
pub fn normalize_path(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// Normalize and percent-encode a logical repository path.
///
/// Segments are filtered as in [`normalize_path`]. Every byte outside the
/// unreserved set (`A-Z a-z 0-9 - . _ ~`) is percent-encoded, so no segment
/// can smuggle a separator.
pub fn encode_path(path: &str) -> String {
    segments(path)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !matches!(*segment, "" | "." | ".."))
}

/// Builds upstream URLs for a fixed repository and branch.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    api_base: String,
    raw_base: String,
    owner: String,
    repo: String,
    branch: String,
}

impl UrlBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
        }
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}`
    pub fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/contents/{}", self.api_base, self.owner, self.repo, encode_path(path))
    }

    /// `{raw_base}/{owner}/{repo}/{branch}/{path}`
    pub fn raw_url(&self, path: &str) -> String {
        format!("{}/{}/{}/{}/{}", self.raw_base, self.owner, self.repo, self.branch, encode_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> UrlBuilder {
        UrlBuilder::new(&AppConfig {
            owner: "acme".into(),
            repo: "docs".into(),
            branch: "main".into(),
            base_path: "spec".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_encode_path_basic() {
        assert_eq!(encode_path("docs/guide.md"), "docs/guide.md");
    }

    #[test]
    fn test_encode_path_collapses_separators() {
        assert_eq!(encode_path("//docs///guide.md/"), "docs/guide.md");
    }

    #[test]
    fn test_encode_path_empty() {
        assert_eq!(encode_path(""), "");
        assert_eq!(encode_path("///"), "");
    }

    #[test]
    fn test_encode_path_drops_dot_segments() {
        assert_eq!(encode_path("../../../../user"), "user");
        assert_eq!(encode_path("docs/./a/../b.md"), "docs/a/b.md");
        assert_eq!(encode_path(".."), "");
    }

    #[test]
    fn test_encode_path_keeps_dotted_names() {
        assert_eq!(encode_path(".github/...md"), ".github/...md");
        assert_eq!(encode_path("%2e%2e/x"), "%252e%252e/x");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/../evil//repo/./x/"), "evil/repo/x");
        assert_eq!(normalize_path("./.."), "");
    }

    #[test]
    fn test_urls_stay_inside_repository() {
        assert_eq!(
            builder().contents_url("../../../../user"),
            "https://api.github.com/repos/acme/docs/contents/user"
        );
        assert_eq!(
            builder().raw_url("../../../evil/repo/main/x"),
            "https://raw.githubusercontent.com/acme/docs/main/evil/repo/main/x"
        );
    }

    #[test]
    fn test_encode_path_space() {
        assert_eq!(encode_path("a b.txt"), "a%20b.txt");
    }

    #[test]
    fn test_encode_path_reserved_characters() {
        assert_eq!(encode_path("q?x=1#frag"), "q%3Fx%3D1%23frag");
        assert_eq!(encode_path("a+b&c"), "a%2Bb%26c");
    }

    #[test]
    fn test_encode_path_keeps_unreserved() {
        assert_eq!(encode_path("A-z_0.9~"), "A-z_0.9~");
    }

    #[test]
    fn test_encode_path_non_ascii() {
        assert_eq!(encode_path("题库/é.json"), "%E9%A2%98%E5%BA%93/%C3%A9.json");
    }

    #[test]
    fn test_contents_url() {
        assert_eq!(builder().contents_url("spec"), "https://api.github.com/repos/acme/docs/contents/spec");
    }

    #[test]
    fn test_raw_url() {
        assert_eq!(
            builder().raw_url("/a b.txt"),
            "https://raw.githubusercontent.com/acme/docs/main/a%20b.txt"
        );
    }

    #[test]
    fn test_custom_bases_trailing_slash() {
        let builder = UrlBuilder::new(&AppConfig {
            owner: "acme".into(),
            repo: "docs".into(),
            api_base: "http://127.0.0.1:9000/".into(),
            raw_base: "http://127.0.0.1:9001/".into(),
            ..Default::default()
        });
        assert_eq!(builder.contents_url("x"), "http://127.0.0.1:9000/repos/acme/docs/contents/x");
        assert_eq!(builder.raw_url("x"), "http://127.0.0.1:9001/acme/docs/main/x");
    }
}
