//! The proxy pool: an immutable list of outbound proxy endpoints.

use rand::seq::IndexedRandom;
use std::{fs, io, path::Path};
use thiserror::Error;

/// Errors raised while building the proxy pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The proxy list file could not be read.
    #[error("failed to read proxy list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// An immutable list of proxy endpoints with a uniform-random selector.
///
/// Built once from a newline-delimited file at process start and never
/// mutated afterwards, so selection needs no locking. No per-endpoint health
/// or fairness is tracked.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<String>,
}

impl ProxyPool {
    /// Loads a pool from a newline-delimited file.
    ///
    /// Blank lines are skipped; a line that does not mention `http` gets
    /// `http://` prepended.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Read`] if the file cannot be read. Startup treats
    /// this as fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PoolError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| PoolError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self::from_endpoints(contents.lines()))
    }

    /// Builds a pool from raw endpoint lines, applying the same
    /// normalization as [`load`](Self::load).
    pub fn from_endpoints<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = lines
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref().trim();
                if line.is_empty() {
                    None
                } else {
                    Some(normalize(line))
                }
            })
            .collect();

        Self { endpoints }
    }

    /// Picks a uniformly random endpoint, with replacement.
    ///
    /// Returns `None` on an empty pool; the multiplexer maps that to a
    /// direct-connection fallback.
    #[must_use]
    pub fn rand(&self) -> Option<&str> {
        let mut rng = rand::rng();
        self.endpoints.choose(&mut rng).map(String::as_str)
    }

    /// Number of endpoints in the pool.
    #[must_use]
    pub fn count(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if the pool holds no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn normalize(line: &str) -> String {
    if line.contains("http") {
        line.to_string()
    } else {
        format!("http://{line}")
    }
}
