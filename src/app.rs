use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::detect::detect_annotation_type;
use crate::domain::AnnotationType;
use crate::error::KiraError;
use crate::matrix::{CountMatrix, count_hits, unify_gene_ids};
use crate::select::{SkippedFile, select_files};
use crate::store::Store;
use crate::taxon::{Metadata, TaxonRank, average_by_taxon};

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub annotation_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub annotation_type: Option<AnnotationType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub annotation_type: AnnotationType,
    pub key_column: String,
    pub detected: bool,
    pub selected: Vec<SelectedFile>,
    pub skipped: Vec<SkippedFile>,
    pub genes: usize,
    pub portals: usize,
    pub outputs: Vec<OutputFile>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedFile {
    pub portal: String,
    pub date: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub kind: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn phase(sink: &dyn ProgressSink, message: String, started: Option<Instant>) {
    sink.event(ProgressEvent {
        message,
        elapsed: started.map(|start| start.elapsed()),
    });
}

#[derive(Debug, Clone)]
pub struct App {
    store: Store,
    config: ResolvedConfig,
}

impl App {
    pub fn new(store: Store, config: ResolvedConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Runs the whole pipeline and writes the four CSV tables.
    ///
    /// Unreadable files are tolerated while selecting files and collecting
    /// gene identifiers, but abort the run while counting hits.
    pub fn run(
        &self,
        request: RunRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, KiraError> {
        let started = Instant::now();
        let registry = &self.config.registry;
        self.store.ensure_root()?;

        let (annotation_type, detected) = match request.annotation_type {
            Some(kind) => (kind, false),
            None => (detect_annotation_type(registry, &request.annotation_dir)?, true),
        };
        let spec = registry.spec(annotation_type);
        phase(
            sink,
            format!(
                "phase=Detect; annotation type {annotation_type} (key column {})",
                spec.key_column
            ),
            None,
        );

        let metadata = Metadata::load(&request.metadata_path)?;
        phase(
            sink,
            format!("phase=Metadata; {} records", metadata.len()),
            None,
        );

        let selection = select_files(
            &request.annotation_dir,
            &self.config.portal_markers,
            spec.header_skip,
        )?;
        if selection.selected.is_empty() {
            return Err(KiraError::NoAnnotationFiles(request.annotation_dir.clone()));
        }
        info!(
            selected = selection.selected.len(),
            skipped = selection.skipped.len(),
            "selected annotation files"
        );
        phase(
            sink,
            format!(
                "phase=Select; {} files kept, {} skipped",
                selection.selected.len(),
                selection.skipped.len()
            ),
            Some(started),
        );

        let genes = unify_gene_ids(&selection.selected, spec);
        info!(genes = genes.len(), "unified gene identifiers");
        phase(
            sink,
            format!("phase=Unify; {} gene identifiers", genes.len()),
            Some(started),
        );

        let tables = selection
            .selected
            .iter()
            .map(|file| count_hits(file, spec, &genes))
            .collect::<Result<Vec<_>, KiraError>>()?;
        let counts = CountMatrix::assemble(tables);
        phase(
            sink,
            format!(
                "phase=Count; {} genes x {} portals",
                counts.gene_ids().len(),
                counts.portals().len()
            ),
            Some(started),
        );

        let mut outputs = Vec::new();
        let count_path = self.store.count_table_path(annotation_type);
        Store::write_csv_atomic(&count_path, &counts)?;
        outputs.push(OutputFile {
            kind: "counts".to_string(),
            path: count_path.to_string(),
        });

        let normalized = counts.normalize(self.config.normalization_total);
        let norm_path = self.store.normalized_table_path(annotation_type);
        Store::write_csv_atomic(&norm_path, &normalized)?;
        outputs.push(OutputFile {
            kind: "normalized".to_string(),
            path: norm_path.to_string(),
        });
        phase(
            sink,
            format!(
                "phase=Normalize; columns scaled to {}",
                self.config.normalization_total
            ),
            Some(started),
        );

        for rank in TaxonRank::ALL {
            let average = average_by_taxon(&normalized, &metadata, rank);
            info!(rank = %rank, groups = average.groups().len(), "averaged by taxon");
            let path = self.store.average_table_path(annotation_type, rank);
            Store::write_csv_atomic(&path, &average)?;
            outputs.push(OutputFile {
                kind: format!("average_by_{rank}"),
                path: path.to_string(),
            });
        }
        phase(
            sink,
            "phase=Store; tables written".to_string(),
            Some(started),
        );

        Ok(RunResult {
            annotation_type,
            key_column: spec.key_column.clone(),
            detected,
            selected: selection
                .selected
                .iter()
                .map(|file| SelectedFile {
                    portal: file.portal.to_string(),
                    date: file.date.clone(),
                    file_name: file.file_name.clone(),
                })
                .collect(),
            skipped: selection.skipped,
            genes: counts.gene_ids().len(),
            portals: counts.portals().len(),
            outputs,
            finished_at: iso_timestamp(),
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use camino::Utf8PathBuf;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn event(&self, event: ProgressEvent) {
            self.messages.lock().unwrap().push(event.message);
        }
    }

    #[test]
    fn run_reports_phases_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let input = temp.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(input.join("Sp1_GO.tab"), "goAcc\nGO:1\nGO:2\n").unwrap();
        let meta = temp.path().join("meta.csv");
        std::fs::write(&meta, "portal,genus,species\nSp1,Asp,Asp nid\n").unwrap();

        let out = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
        let app = App::new(Store::new_with_root(out), ResolvedConfig::default());
        let sink = RecordingSink::default();
        let result = app
            .run(
                RunRequest {
                    annotation_dir: input,
                    metadata_path: meta,
                    annotation_type: None,
                },
                &sink,
            )
            .unwrap();

        assert!(result.detected);
        assert_eq!(result.annotation_type, AnnotationType::Go);
        let messages = sink.messages.lock().unwrap();
        let phases = messages
            .iter()
            .filter_map(|message| message.split(';').next())
            .collect::<Vec<_>>();
        assert_eq!(
            phases,
            vec![
                "phase=Detect",
                "phase=Metadata",
                "phase=Select",
                "phase=Unify",
                "phase=Count",
                "phase=Normalize",
                "phase=Store"
            ]
        );
    }
}
