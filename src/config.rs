use crate::handler::DEFAULT_CHUNK_SIZE;
use anyhow::{bail, Context};
use std::env;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:6379";

/// Nesting cap applied to live sessions. Deliberately lower than the
/// standalone decoding cap: no real command pipeline nests this deep.
pub const DEFAULT_SESSION_DEPTH: usize = 8;

/// Runtime settings of the server, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to.
    pub listen: String,
    /// Bytes pulled from a connection per read.
    pub chunk_size: usize,
    /// Aggregate nesting cap enforced while decoding.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_depth: DEFAULT_SESSION_DEPTH,
        }
    }
}

impl Config {
    /// Resolves the configuration from `RESPD_LISTEN`, `RESPD_CHUNK_SIZE` and
    /// `RESPD_MAX_DEPTH`, falling back to the defaults for unset variables.
    /// A variable that is set but unusable is a startup error.
    pub fn from_env() -> anyhow::Result<Config> {
        let mut config = Config::default();
        if let Ok(listen) = env::var("RESPD_LISTEN") {
            config.listen = listen;
        }
        if let Ok(raw) = env::var("RESPD_CHUNK_SIZE") {
            config.chunk_size = raw
                .parse()
                .context("RESPD_CHUNK_SIZE must be a positive integer")?;
            if config.chunk_size == 0 {
                bail!("RESPD_CHUNK_SIZE must be a positive integer");
            }
        }
        if let Ok(raw) = env::var("RESPD_MAX_DEPTH") {
            config.max_depth = raw
                .parse()
                .context("RESPD_MAX_DEPTH must be a positive integer")?;
            if config.max_depth == 0 {
                bail!("RESPD_MAX_DEPTH must be a positive integer");
            }
        }
        Ok(config)
    }
}
