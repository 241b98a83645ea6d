//! Public Path Allowlist
//!
//! Exact-match allowlist for the endpoints a client may reach without a
//! token: register, login, and refresh. Matching ignores a trailing slash
//! but is otherwise literal, so `/api/auth/v1/login/../admin` style paths
//! never match.

pub struct Allowlist {
    paths: Vec<String>,
}

impl Allowlist {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths: paths
                .into_iter()
                .map(|p| normalize(&p).to_string())
                .collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        let normalized = normalize(path);
        self.paths.iter().any(|p| p == normalized)
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Allowlist {
        Allowlist::new(vec![
            "/api/auth/v1/register".to_string(),
            "/api/auth/v1/login".to_string(),
            "/api/auth/v1/refresh".to_string(),
        ])
    }

    #[test]
    fn exact_paths_match_with_or_without_trailing_slash() {
        let list = allowlist();
        assert!(list.is_public("/api/auth/v1/login"));
        assert!(list.is_public("/api/auth/v1/login/"));
        assert!(list.is_public("/api/auth/v1/register"));
    }

    #[test]
    fn non_listed_paths_do_not_match() {
        let list = allowlist();
        assert!(!list.is_public("/api/auth/v1/gateway/validate"));
        assert!(!list.is_public("/api/auth/v1/login/extra"));
        assert!(!list.is_public("/api/users/v1/me"));
        assert!(!list.is_public("/"));
    }
}
