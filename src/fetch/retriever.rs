// src/fetch/retriever.rs

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info};
use url::Url;

use super::urls::saved_filename;
use super::FetchError;

/// Where response bodies come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// Network only.
    Live,
    /// Network, and keep a copy of every body under the saved-data directory.
    Save,
    /// Replay bodies from the saved-data directory; no network at all.
    UseSaved,
}

impl FetchMode {
    /// CLI flags → mode. `use_saved` wins over `save`.
    pub fn from_flags(save: bool, use_saved: bool) -> Self {
        match (save, use_saved) {
            (_, true) => FetchMode::UseSaved,
            (true, false) => FetchMode::Save,
            (false, false) => FetchMode::Live,
        }
    }
}

/// Blocking downloader with a fixed minimum spacing between live requests.
pub struct Retriever {
    client: Client,
    mode: FetchMode,
    saved_dir: PathBuf,
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl Retriever {
    pub fn new(
        mode: FetchMode,
        saved_dir: impl Into<PathBuf>,
        user_agent: &str,
        min_interval: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            mode,
            saved_dir: saved_dir.into(),
            min_interval,
            last_call: None,
        })
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn saved_dir(&self) -> &Path {
        &self.saved_dir
    }

    /// Fetch `url` and decode the body as JSON.
    pub fn download_json<T: DeserializeOwned>(&mut self, url: &Url) -> Result<T, FetchError> {
        let text = self.download_text(url)?;
        serde_json::from_str(&text).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch `url` as text according to the retrieval mode.
    pub fn download_text(&mut self, url: &Url) -> Result<String, FetchError> {
        let path = self.saved_dir.join(saved_filename(url));
        match self.mode {
            FetchMode::UseSaved => {
                if !path.is_file() {
                    return Err(FetchError::MissingSaved {
                        url: url.to_string(),
                        path,
                    });
                }
                debug!(%url, path = %path.display(), "replaying saved data");
                fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
            }
            FetchMode::Live => self.get(url),
            FetchMode::Save => {
                let text = self.get(url)?;
                fs::create_dir_all(&self.saved_dir).map_err(|source| FetchError::Io {
                    path: self.saved_dir.clone(),
                    source,
                })?;
                fs::write(&path, &text).map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "saved download");
                Ok(text)
            }
        }
    }

    fn get(&mut self, url: &Url) -> Result<String, FetchError> {
        self.throttle();
        debug!("Fetching text from {}", url);
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        resp.text().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    fn throttle(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn replay(dir: &Path) -> Retriever {
        Retriever::new(FetchMode::UseSaved, dir, "test-client", Duration::ZERO).unwrap()
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(FetchMode::from_flags(false, false), FetchMode::Live);
        assert_eq!(FetchMode::from_flags(true, false), FetchMode::Save);
        assert_eq!(FetchMode::from_flags(false, true), FetchMode::UseSaved);
        assert_eq!(FetchMode::from_flags(true, true), FetchMode::UseSaved);
    }

    #[test]
    fn test_replay_reads_saved_file() {
        let tmp = tempdir().unwrap();
        let url = Url::parse("https://example.org/v1/country").unwrap();
        fs::write(tmp.path().join("v1_country.json"), r#"{"countries": []}"#).unwrap();

        let mut r = replay(tmp.path());
        let v: Value = r.download_json(&url).unwrap();
        assert_eq!(v["countries"], Value::Array(vec![]));
    }

    #[test]
    fn test_replay_missing_file() {
        let tmp = tempdir().unwrap();
        let url = Url::parse("https://example.org/v1/country/XXX/region").unwrap();
        let err = replay(tmp.path()).download_text(&url).unwrap_err();
        assert!(matches!(err, FetchError::MissingSaved { .. }));
    }

    /// Serves `body` once on a local port and returns the URL to fetch.
    fn serve_once(path: &str, body: &'static str) -> Url {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
        });
        Url::parse(&format!("http://127.0.0.1:{}{}", port, path)).unwrap()
    }

    #[test]
    fn test_save_then_replay() {
        let tmp = tempdir().unwrap();
        let saved = tmp.path().join("saved_data");
        let body = r#"{"countries": [{"country": {"iso3": "COD"}, "date": "2023-11-20"}]}"#;
        let url = serve_once("/v1/foodsecurity/country", body);

        let mut live = Retriever::new(FetchMode::Save, &saved, "test-client", Duration::ZERO)
            .unwrap();
        let fetched: Value = live.download_json(&url).unwrap();

        let path = saved.join(saved_filename(&url));
        assert_eq!(path, saved.join("v1_foodsecurity_country.json"));
        assert_eq!(fs::read_to_string(&path).unwrap(), body);

        // no server this time
        let replayed: Value = replay(&saved).download_json(&url).unwrap();
        assert_eq!(replayed, fetched);
        assert_eq!(replayed["countries"][0]["country"]["iso3"], "COD");
    }

    #[test]
    fn test_replay_bad_json() {
        let tmp = tempdir().unwrap();
        let url = Url::parse("https://example.org/broken").unwrap();
        fs::write(tmp.path().join("broken.json"), "<html>404</html>").unwrap();
        let err = replay(tmp.path()).download_json::<Value>(&url).unwrap_err();
        assert!(matches!(err, FetchError::Json { .. }));
    }
}
