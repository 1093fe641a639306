use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{LoadError, Result};

/// Where the static JSON documents come from.
pub trait DocumentSource {
    /// Raw text of document `name` (without the `.json` suffix).
    fn fetch(&self, name: &str) -> Result<String>;

    /// Human-readable location for log messages.
    fn describe(&self) -> String;
}

impl<D: DocumentSource + ?Sized> DocumentSource for Box<D> {
    fn fetch(&self, name: &str) -> Result<String> {
        (**self).fetch(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Documents stored as `<dir>/<name>.json`.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl DocumentSource for DirSource {
    fn fetch(&self, name: &str) -> Result<String> {
        let path = self.path_of(name);
        log::debug!("Reading {}", path.display());
        Ok(std::fs::read_to_string(path)?)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Documents served as `<base_url>/<name>.json` by a static host.
pub struct HttpSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_global(Some(Duration::from_secs(timeout_secs)))
                .build(),
        );
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url_of(&self, name: &str) -> String {
        format!("{}/{name}.json", self.base_url)
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, name: &str) -> Result<String> {
        let url = self.url_of(name);
        log::debug!("GET {url}");
        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LoadError::Http(format!("{url}: {e}")))?
            .body_mut()
            .read_to_string()
            .map_err(|e| LoadError::Http(format!("{url}: {e}")))?;
        Ok(body)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_source_reads_json_file() {
        let dir = std::env::temp_dir().join(format!("animelog-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("anime.json"), "[]").unwrap();

        let src = DirSource::new(&dir);
        assert_eq!(src.fetch("anime").unwrap(), "[]");
        assert!(matches!(src.fetch("missing"), Err(LoadError::Io(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_http_url_shape() {
        let src = HttpSource::new("https://example.org/data/", 5);
        assert_eq!(src.url_of("meta"), "https://example.org/data/meta.json");
        assert_eq!(src.describe(), "https://example.org/data");
    }
}
