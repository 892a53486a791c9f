use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub embeddings: EmbeddingConfig,
    pub vectors: VectorConfig,
    pub analysis: AnalysisConfig,
    pub risk: RiskConfig,
    pub frameworks: FrameworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// SQLite path for the persistent index; None keeps the index in memory.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Controls whose best confidence clears this are considered covered.
    pub gap_severity_threshold: f32,
    /// Minimum confidence for quoting matched text as evidence.
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub matrix_size: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    pub supported: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            embeddings: EmbeddingConfig {
                provider: "local".to_string(),
                model: "feature-hash".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            vectors: VectorConfig { path: None },
            analysis: AnalysisConfig {
                chunk_size: 512,
                chunk_overlap: 50,
                gap_severity_threshold: 0.7,
                confidence_threshold: 0.6,
            },
            risk: RiskConfig { matrix_size: 5 },
            frameworks: FrameworkConfig {
                supported: [
                    "ISO27001", "NIST-CSF", "SOC2", "GDPR", "HIPAA", "PCI-DSS", "CIS", "COBIT",
                    "ITIL",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
