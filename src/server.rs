use crate::config::Config;
use crate::handler::Handler;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Accepts connections and hands each one to its own session task.
pub struct Server {
    listener: TcpListener,
    chunk_size: usize,
    max_depth: usize,
}

impl Server {
    pub async fn bind(config: &Config) -> anyhow::Result<Server> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.listen))?;
        info!("listening on {}", config.listen);
        Ok(Server {
            listener,
            chunk_size: config.chunk_size,
            max_depth: config.max_depth,
        })
    }

    /// Runs the accept loop. Sessions are detached: they are processed as
    /// soon as they arrive, and a failed accept does not stop the server.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    debug!("accepted new connection from {}", peer);
                    let (chunk_size, max_depth) = (self.chunk_size, self.max_depth);
                    tokio::spawn(async move {
                        let mut handler = Handler::with_chunk_size(socket, chunk_size);
                        handler.run(max_depth).await;
                        debug!("session with {} ended", peer);
                    });
                }
                Err(err) => {
                    error!("failed to accept a new connection: {}", err);
                }
            }
        }
    }
}
