// src/sources/evidence_source.rs - Approval-letter text lookup by generic application number
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Text for a generic application, or `None` when unavailable for any reason.
pub trait EvidenceSource: Send + Sync {
    fn lookup(&self, generic_id: &str) -> Option<String>;

    fn describe(&self) -> String {
        "custom evidence source".to_string()
    }
}

impl EvidenceSource for HashMap<String, String> {
    fn lookup(&self, generic_id: &str) -> Option<String> {
        self.get(generic_id)
            .filter(|text| !text.trim().is_empty())
            .cloned()
    }

    fn describe(&self) -> String {
        format!("in-memory map ({} documents)", self.len())
    }
}

/// Every lookup is unavailable; all pairs end up unvalidated but retained.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvidence;

impl EvidenceSource for NoEvidence {
    fn lookup(&self, _generic_id: &str) -> Option<String> {
        None
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

/// Plain-text letters extracted ahead of time, one `<id>.txt` per application.
#[derive(Debug, Clone)]
pub struct DirectoryEvidence {
    dir: PathBuf,
}

impl DirectoryEvidence {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!("Evidence directory {} does not exist", dir.display());
        }
        let count = fs::read_dir(&dir)
            .with_context(|| format!("Failed to list evidence directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "txt"))
            .count();
        info!("📂 Evidence directory {} holds {} text files", dir.display(), count);
        Ok(Self { dir })
    }

    fn candidate_paths(&self, generic_id: &str) -> Vec<PathBuf> {
        let id = generic_id.trim();
        vec![
            self.dir.join(format!("{}.txt", id)),
            self.dir.join(format!("ANDA{}.txt", id)),
        ]
    }
}

impl EvidenceSource for DirectoryEvidence {
    fn lookup(&self, generic_id: &str) -> Option<String> {
        for path in self.candidate_paths(generic_id) {
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => return Some(text),
                Ok(_) => debug!("Evidence file {} is empty", path.display()),
                Err(e) => warn!("Could not read evidence file {}: {}", path.display(), e),
            }
        }
        None
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}

/// JSON object mapping application numbers to letter text (or null).
#[derive(Debug, Clone, Default)]
pub struct JsonEvidence {
    texts: HashMap<String, Option<String>>,
}

impl JsonEvidence {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read evidence file {}", path.display()))?;
        let texts = Self::parse(&raw)
            .with_context(|| format!("Failed to parse evidence JSON {}", path.display()))?;
        info!(
            "📂 Loaded evidence for {} applications from {}",
            texts.texts.len(),
            path.display()
        );
        Ok(texts)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let texts: HashMap<String, Option<String>> = serde_json::from_str(raw)?;
        Ok(Self { texts })
    }
}

impl EvidenceSource for JsonEvidence {
    fn lookup(&self, generic_id: &str) -> Option<String> {
        self.texts
            .get(generic_id)
            .and_then(|text| text.as_ref())
            .filter(|text| !text.trim().is_empty())
            .cloned()
    }

    fn describe(&self) -> String {
        format!("JSON map ({} entries)", self.texts.len())
    }
}
