use std::net::SocketAddr;

/// Process settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    // listing snapshot loaded into the store before serving
    pub seed_path: Option<String>,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seed_path: None,
            default_page_size: estate_storage::DEFAULT_PAGE_SIZE,
            max_page_size: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        if let Some(addr) = lookup("HTTP_ADDR") {
            cfg.http_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("HTTP_ADDR {addr:?}: {e}"))?;
        }
        cfg.seed_path = lookup("SEED_PATH").filter(|p| !p.trim().is_empty());
        if let Some(n) = lookup("DEFAULT_PAGE_SIZE") {
            cfg.default_page_size = n.trim().parse()?;
        }
        if let Some(n) = lookup("MAX_PAGE_SIZE") {
            cfg.max_page_size = n.trim().parse()?;
        }
        if cfg.max_page_size == 0 {
            anyhow::bail!("MAX_PAGE_SIZE must be positive");
        }
        cfg.default_page_size = cfg.default_page_size.clamp(1, cfg.max_page_size);
        Ok(cfg)
    }

    /// Page for a request; the limit falls back to the default and is capped.
    pub fn page(&self, limit: Option<usize>, offset: Option<usize>) -> estate_storage::Page {
        estate_storage::Page {
            offset: offset.unwrap_or(0),
            limit: limit
                .unwrap_or(self.default_page_size)
                .min(self.max_page_size),
        }
    }
}
