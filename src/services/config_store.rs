// Configuration Storage Service
// Scoring configuration with JSON persistence, env overrides and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ResonanceError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Minimum classifier confidence before its document type is trusted
    #[serde(default = "default_confidence_threshold")]
    pub classifier_confidence_threshold: f64,
    /// ML share of the hybrid score (0.7 = ML 70%, rules 30%)
    #[serde(default = "default_hybrid_weight")]
    pub hybrid_weight: f64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_true")]
    pub embedding_enabled: bool,
    #[serde(default = "default_key_section_threshold")]
    pub key_section_threshold: f64,
    #[serde(default = "default_key_section_limit")]
    pub key_section_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            classifier_confidence_threshold: 0.7,
            hybrid_weight: 0.7,
            cache_capacity: 100,
            embedding_enabled: true,
            key_section_threshold: 0.7,
            key_section_limit: 10,
        }
    }
}

fn default_confidence_threshold() -> f64 { 0.7 }
fn default_hybrid_weight() -> f64 { 0.7 }
fn default_cache_capacity() -> usize { 100 }
fn default_true() -> bool { true }
fn default_key_section_threshold() -> f64 { 0.7 }
fn default_key_section_limit() -> usize { 10 }

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ResonanceError::Config(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };
        unit("classifierConfidenceThreshold", self.classifier_confidence_threshold)?;
        unit("hybridWeight", self.hybrid_weight)?;
        unit("keySectionThreshold", self.key_section_threshold)?;
        Ok(())
    }

    /// Apply DOCRES_* environment overrides. Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<f64>("DOCRES_CONFIDENCE_THRESHOLD") {
            self.classifier_confidence_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("DOCRES_HYBRID_WEIGHT") {
            self.hybrid_weight = v;
        }
        if let Some(v) = env_parse::<usize>("DOCRES_CACHE_CAPACITY") {
            self.cache_capacity = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("[CONFIG] ignoring unparseable {}={}", key, trimmed);
            None
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("doc-resonance"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load configuration from file, defaults when the file does not exist
    pub fn load(&self) -> Result<ScoringConfig> {
        if !self.config_file.exists() {
            return Ok(ScoringConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)?;
        let config: ScoringConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file, backing up the previous version
    pub fn save(&self, config: &ScoringConfig) -> Result<()> {
        config.validate()?;
        fs::create_dir_all(&self.config_dir)?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        info!("[CONFIG] saved {}", self.config_file.display());
        Ok(())
    }

    fn create_backup(&self) -> Result<()> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<()> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names embed the timestamp, so lexical order is age order
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}
