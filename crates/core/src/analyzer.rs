use crate::chunker;
use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::error::CoreError;
use crate::models::{Collection, Control, Criticality, Gap, SearchHit, Severity};
use crate::vectorstore::{QueryHit, VectorIndex};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

const NO_EVIDENCE: &str = "No relevant policy evidence found";

/// Retrieval-augmented gap analyzer.
///
/// Indexes framework controls once, chunks and embeds policy text per call,
/// retrieves best-matching evidence per control, scores and deduplicates the
/// resulting gaps. The embedder and index are shared process-wide resources;
/// the analyzer itself holds no per-call state.
pub struct GapAnalyzer {
    embedder: Embedder,
    index: Arc<VectorIndex>,
    supported_frameworks: Vec<String>,
    chunk_size: usize,
    chunk_overlap: usize,
    batch_size: usize,
    gap_severity_threshold: f32,
    confidence_threshold: f32,
}

impl GapAnalyzer {
    pub fn new(embedder: Embedder, index: Arc<VectorIndex>, cfg: &AppConfig) -> Self {
        Self {
            embedder,
            index,
            supported_frameworks: cfg.frameworks.supported.clone(),
            chunk_size: cfg.analysis.chunk_size,
            chunk_overlap: cfg.analysis.chunk_overlap,
            batch_size: cfg.embeddings.batch_size.max(1),
            gap_severity_threshold: cfg.analysis.gap_severity_threshold,
            confidence_threshold: cfg.analysis.confidence_threshold,
        }
    }

    fn validate_framework(&self, framework: &str) -> Result<(), CoreError> {
        if self.supported_frameworks.iter().any(|f| f == framework) {
            Ok(())
        } else {
            Err(CoreError::UnsupportedFramework(framework.to_string()))
        }
    }

    /// Embed each control's `title + description` and upsert it into the
    /// frameworks collection. Ids are `{framework}:{control_id}`, so
    /// re-indexing the same framework overwrites rather than duplicates.
    pub async fn index_framework(
        &self,
        framework: &str,
        controls: &[Control],
    ) -> Result<usize, CoreError> {
        self.validate_framework(framework)?;
        if controls.is_empty() {
            info!(framework, "no controls to index");
            return Ok(0);
        }

        let texts: Vec<String> = controls
            .iter()
            .map(|c| format!("{}. {}", c.title, c.description))
            .collect();
        let vectors = self.embedder.embed(&texts).await?;

        for ((control, text), vector) in controls.iter().zip(&texts).zip(vectors) {
            let mut metadata = HashMap::new();
            metadata.insert("framework".to_string(), framework.to_string());
            metadata.insert("control_id".to_string(), control.control_id.clone());
            metadata.insert("category".to_string(), control.category.clone());
            metadata.insert(
                "criticality".to_string(),
                control.criticality.as_str().to_string(),
            );
            let id = format!("{}:{}", framework, control.control_id);
            self.index
                .upsert(Collection::Frameworks, &id, vector, text, metadata)
                .await?;
        }

        info!(framework, controls = controls.len(), "indexed framework controls");
        Ok(controls.len())
    }

    /// Full gap analysis: chunk the policy, embed and index the chunks, match
    /// them against the framework's controls, score and deduplicate.
    pub async fn analyze_compliance_gap(
        &self,
        framework: &str,
        policy_document: &str,
        top_k: usize,
    ) -> Result<Vec<Gap>, CoreError> {
        self.validate_framework(framework)?;

        let chunks = chunker::chunk(policy_document, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            info!(framework, "empty policy document, nothing to analyze");
            return Ok(Vec::new());
        }
        debug!(framework, chunks = chunks.len(), "chunked policy document");

        let mut embedded: Vec<(usize, Vec<f32>)> = Vec::with_capacity(chunks.len());
        let mut failed_chunks = 0usize;
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            match self.embedder.embed(&texts).await {
                Ok(vectors) => {
                    let offset = batch_index * self.batch_size;
                    embedded.extend(
                        vectors
                            .into_iter()
                            .enumerate()
                            .map(|(i, v)| (offset + i, v)),
                    );
                }
                Err(e) => {
                    // One bad batch excludes those chunks, not the analysis.
                    failed_chunks += batch.len();
                    warn!(error = %e, chunks = batch.len(), "embedding batch failed, skipping");
                }
            }
        }
        if failed_chunks > 0 {
            warn!(failed_chunks, "some policy chunks were excluded from retrieval");
        }

        // Chunks carry their document's id so the policies collection stays
        // filterable; re-analyzing the same document replaces its chunks
        // rather than accumulating stale ones.
        let policy_id = blake3::hash(policy_document.trim().as_bytes())
            .to_hex()
            .to_string();
        let mut policy_filter = HashMap::new();
        policy_filter.insert("policy_id".to_string(), policy_id.clone());
        self.index
            .delete(Collection::Policies, &policy_filter)
            .await?;

        let mut candidates: Vec<(QueryHit, f32, usize)> = Vec::new();
        for (chunk_index, vector) in &embedded {
            let chunk = &chunks[*chunk_index];

            let chunk_id = format!("{}:{}", policy_id, chunk.start);
            let mut chunk_meta = HashMap::new();
            chunk_meta.insert("policy_id".to_string(), policy_id.clone());
            chunk_meta.insert("start".to_string(), chunk.start.to_string());
            self.index
                .upsert(
                    Collection::Policies,
                    &chunk_id,
                    vector.clone(),
                    &chunk.text,
                    chunk_meta,
                )
                .await?;

            let mut filter = HashMap::new();
            filter.insert("framework".to_string(), framework.to_string());
            let hits = self
                .index
                .query(Collection::Frameworks, vector, top_k, Some(&filter))
                .await?;

            for hit in hits {
                let confidence = (1.0 - hit.distance).clamp(0.0, 1.0);
                candidates.push((hit, confidence, *chunk_index));
            }
        }

        // Coverage is decided on each control's best evidence across all
        // chunks, so a weak match from an unrelated chunk cannot turn a
        // covered control back into a gap.
        let mut best: HashMap<String, (f32, usize)> = HashMap::new();
        for (hit, confidence, chunk_index) in &candidates {
            let entry = best
                .entry(control_key(hit))
                .or_insert((*confidence, *chunk_index));
            if *confidence > entry.0 {
                *entry = (*confidence, *chunk_index);
            }
        }

        let mut scored = Vec::new();
        for (hit, confidence, _) in &candidates {
            let Some(&(best_confidence, best_chunk)) = best.get(&control_key(hit)) else {
                continue;
            };
            if best_confidence >= self.gap_severity_threshold {
                debug!(control = %control_key(hit), best_confidence, "control covered");
                continue;
            }
            scored.push(self.score_gap(
                framework,
                hit,
                *confidence,
                best_confidence,
                &chunks[best_chunk].text,
            ));
        }

        let mut gaps = Self::deduplicate_gaps(scored);
        // Most severe (lowest confidence) first.
        gaps.sort_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        info!(framework, gaps = gaps.len(), "gap analysis complete");
        Ok(gaps)
    }

    /// Score one below-coverage control/chunk pairing. The control's best
    /// evidence drives the quoted `current_state`; the candidate's own
    /// confidence drives severity, so dedup stays conservative.
    fn score_gap(
        &self,
        framework: &str,
        hit: &QueryHit,
        confidence: f32,
        best_confidence: f32,
        best_evidence: &str,
    ) -> Gap {
        let control_id = control_key(hit);
        let category = hit
            .metadata
            .get("category")
            .cloned()
            .unwrap_or_else(|| "General".to_string());
        let criticality = hit
            .metadata
            .get("criticality")
            .and_then(|c| Criticality::from_str(c).ok())
            .unwrap_or(Criticality::Medium);

        let mut severity = severity_band(confidence);
        if criticality == Criticality::Critical {
            severity = severity.promoted();
        }

        let current_state = if best_confidence >= self.confidence_threshold {
            best_evidence.trim().to_string()
        } else {
            NO_EVIDENCE.to_string()
        };

        let recommendations =
            build_recommendations(&control_id, &category, criticality, &current_state);

        Gap {
            control_id,
            framework: framework.to_string(),
            requirement: hit.document.clone(),
            current_state,
            severity,
            confidence,
            recommendations,
        }
    }

    /// Conservative dedup: among duplicates for a control, keep the entry
    /// with the lowest confidence so reported coverage is never overstated.
    pub fn deduplicate_gaps(gaps: Vec<Gap>) -> Vec<Gap> {
        let mut kept: Vec<Gap> = Vec::new();
        for gap in gaps {
            match kept.iter_mut().find(|g| g.control_id == gap.control_id) {
                Some(existing) => {
                    if gap.confidence < existing.confidence {
                        *existing = gap;
                    }
                }
                None => kept.push(gap),
            }
        }
        kept
    }

    /// The retrieval primitive behind gap analysis, exposed directly: embed
    /// the query and return raw ranked hits without gap scoring.
    pub async fn semantic_search(
        &self,
        query: &str,
        collection: Collection,
        top_k: usize,
        filter_metadata: Option<&HashMap<String, String>>,
    ) -> Result<Vec<SearchHit>, CoreError> {
        let vector = self.embedder.embed_one(query).await?;
        let hits = self
            .index
            .query(collection, &vector, top_k, filter_metadata)
            .await?;
        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                id: h.id,
                document: h.document,
                metadata: h.metadata,
                distance: h.distance,
            })
            .collect())
    }
}

fn severity_band(confidence: f32) -> Severity {
    if confidence < 0.30 {
        Severity::Critical
    } else if confidence < 0.45 {
        Severity::High
    } else if confidence < 0.60 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn control_key(hit: &QueryHit) -> String {
    hit.metadata
        .get("control_id")
        .cloned()
        .unwrap_or_else(|| hit.id.clone())
}

fn build_recommendations(
    control_id: &str,
    category: &str,
    criticality: Criticality,
    current_state: &str,
) -> Vec<String> {
    let mut recs = Vec::new();
    if current_state == NO_EVIDENCE {
        recs.push(format!(
            "Draft policy coverage for control {control_id}: no supporting evidence was found in the submitted document"
        ));
    } else {
        recs.push(format!(
            "Strengthen the existing policy wording to explicitly address control {control_id}"
        ));
    }
    recs.push(format!(
        "Review {category} procedures and assign an owner responsible for this control"
    ));
    if matches!(criticality, Criticality::High | Criticality::Critical) {
        recs.push(format!(
            "Prioritise remediation: this control is rated {} by the framework",
            criticality.as_str()
        ));
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap(control_id: &str, confidence: f32) -> Gap {
        Gap {
            control_id: control_id.to_string(),
            framework: "ISO27001".to_string(),
            requirement: "req".to_string(),
            current_state: NO_EVIDENCE.to_string(),
            severity: severity_band(confidence),
            confidence,
            recommendations: vec!["r".to_string()],
        }
    }

    #[test]
    fn dedup_keeps_lowest_confidence_per_control() {
        let gaps = vec![
            gap("A.5.1.1", 0.7),
            gap("A.5.1.1", 0.5),
            gap("A.8.2.1", 0.6),
        ];
        let unique = GapAnalyzer::deduplicate_gaps(gaps);
        assert_eq!(unique.len(), 2);
        let a511 = unique.iter().find(|g| g.control_id == "A.5.1.1").unwrap();
        assert_eq!(a511.confidence, 0.5);
    }

    #[test]
    fn dedup_of_empty_input_is_empty() {
        assert!(GapAnalyzer::deduplicate_gaps(Vec::new()).is_empty());
    }

    #[test]
    fn severity_bands_are_ordered() {
        assert_eq!(severity_band(0.1), Severity::Critical);
        assert_eq!(severity_band(0.35), Severity::High);
        assert_eq!(severity_band(0.5), Severity::Medium);
        assert_eq!(severity_band(0.65), Severity::Low);
    }

    #[test]
    fn critical_criticality_promotes_severity() {
        assert_eq!(Severity::Low.promoted(), Severity::Medium);
        assert_eq!(Severity::Critical.promoted(), Severity::Critical);
    }

    #[test]
    fn recommendations_never_empty() {
        let recs = build_recommendations("A.5.1.1", "Policies", Criticality::Low, NO_EVIDENCE);
        assert!(!recs.is_empty());
        let recs = build_recommendations("A.5.1.1", "Policies", Criticality::Critical, "evidence");
        assert!(recs.len() >= 3);
    }
}
