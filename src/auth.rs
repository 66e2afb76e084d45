//! HTTP Basic credentials loaded from a `user:password` file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};

use crate::error::{GateError, Result};

/// User name to password table.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, String>,
}

impl Credentials {
    /// Read `path`: one `user:password` per line, split at the first colon.
    ///
    /// Blank lines are skipped. A line without a colon or with an empty user
    /// name is rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| GateError::io(path, e))?;
        let mut users = HashMap::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (user, password) = line
                .split_once(':')
                .map(|(u, p)| (u.trim(), p.trim()))
                .filter(|(u, _)| !u.is_empty())
                .ok_or_else(|| GateError::InvalidCredentials {
                    path: path.to_path_buf(),
                    line: idx + 1,
                })?;
            users.insert(user.to_string(), password.to_string());
        }
        info!(path = %path.display(), users = users.len(), "Loaded credentials");
        Ok(Self { users })
    }

    pub fn from_pairs<I, U, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: pairs
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    pub fn verify(&self, user: &str, password: &str) -> bool {
        if user.is_empty() || password.is_empty() {
            return false;
        }
        self.users.get(user).is_some_and(|p| p == password)
    }

    /// Check an `Authorization` header value.
    pub fn verify_header(&self, header: &str) -> bool {
        match parse_basic(header) {
            Some((user, password)) => {
                let ok = self.verify(&user, &password);
                if !ok {
                    debug!(user = %user, "Rejected credentials");
                }
                ok
            }
            None => false,
        }
    }
}

/// Decode `Basic <base64(user:password)>`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}
