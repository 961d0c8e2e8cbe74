//! Query keys and their SHA-256 fingerprints

use std::fmt;

use sha2::{Digest, Sha256};

use crate::client::PaginationParams;

/// Groups of keys that are invalidated or purged together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Auth,
    Movies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    AuthUser,
    AuthProfile,
    MovieList,
    MovieDetail,
}

impl QueryKind {
    pub fn namespace(self) -> Namespace {
        match self {
            QueryKind::AuthUser | QueryKind::AuthProfile => Namespace::Auth,
            QueryKind::MovieList | QueryKind::MovieDetail => Namespace::Movies,
        }
    }

    /// Inverse of [`QueryKind::as_str`]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "auth_user" => Some(QueryKind::AuthUser),
            "auth_profile" => Some(QueryKind::AuthProfile),
            "movie_list" => Some(QueryKind::MovieList),
            "movie_detail" => Some(QueryKind::MovieDetail),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::AuthUser => "auth_user",
            QueryKind::AuthProfile => "auth_profile",
            QueryKind::MovieList => "movie_list",
            QueryKind::MovieDetail => "movie_detail",
        }
    }
}

/// Identity of one cached query: kind plus sorted parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: QueryKind,
    params: Vec<(String, String)>,
    fingerprint: String,
}

impl QueryKey {
    pub fn new(kind: QueryKind, params: &[(&str, &str)]) -> Self {
        Self::from_parts(
            kind,
            params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    /// Rebuild a key from its kind and (possibly unsorted) parameters
    pub fn from_parts(kind: QueryKind, mut params: Vec<(String, String)>) -> Self {
        params.sort();
        let fingerprint = cache_key(kind.as_str(), &params);
        Self {
            kind,
            params,
            fingerprint,
        }
    }

    pub fn auth_user() -> Self {
        Self::new(QueryKind::AuthUser, &[])
    }

    pub fn auth_profile() -> Self {
        Self::new(QueryKind::AuthProfile, &[])
    }

    /// List key for the exact page and limit
    pub fn movie_list(params: &PaginationParams) -> Self {
        let page = params.page.to_string();
        let limit = params.limit.to_string();
        Self::new(QueryKind::MovieList, &[("page", &page), ("limit", &limit)])
    }

    pub fn movie_detail(id: &str) -> Self {
        Self::new(QueryKind::MovieDetail, &[("id", id)])
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn namespace(&self) -> Namespace {
        self.kind.namespace()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[cfg(test)]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", params.join(","))?;
        }
        Ok(())
    }
}

/// Hex SHA-256 over the kind and already-sorted parameters.
pub fn cache_key(kind: &str, params: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(kind.as_bytes());
    hasher.update(b"|");

    for (k, v) in params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}
