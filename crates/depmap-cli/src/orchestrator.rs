use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use depmap_aggregate::{
    aggregate_dependencies, doc_tracker_path, filter_doc_tracker_items, filter_main_tracker_modules,
    main_tracker_path, mini_tracker_path,
};
use depmap_analyze::{Analyzer, RegexAnalyzer};
use depmap_core::path::{is_subpath, normalize_path};
use depmap_core::{char_priority, GlobalKeyMap, KeyInfo, TrackerKind, WEAK_SEMANTIC_CHAR};
use depmap_embed::{generate_embeddings, EmbeddingGenerationConfig, EmbeddingGenerationReport, HashingEmbedder};
use depmap_keys::{
    generate_keys, get_key_from_path, load_global_key_map, load_old_global_key_map, save_global_key_map,
    sort_key_strings_hierarchically,
};
use depmap_suggest::{suggest_dependencies, SimilarityThresholds, Suggestion};
use depmap_tracker::{
    compute_structural_update, default_mini_tracker_template, parse_tracker_file, write_tracker_file,
    write_tracker_file_with_template, SuggestedEdge, TrackerUpdateInput,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::context::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Warning,
    Error,
}

impl RunStatus {
    fn escalate(self, other: RunStatus) -> RunStatus {
        use RunStatus::*;
        match (self, other) {
            (Error, _) | (_, Error) => Error,
            (Warning, _) | (_, Warning) => Warning,
            _ => Ok,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeProjectReport {
    pub status: RunStatus,
    pub files_tracked: usize,
    pub files_analyzed: usize,
    pub analysis_errors: usize,
    pub embeddings: EmbeddingGenerationReport,
    pub mini_trackers_written: usize,
    pub doc_tracker_written: bool,
    pub main_tracker_written: bool,
    pub warnings: Vec<String>,
}

/// Runs every orchestrator phase from spec.md §4.8 against `ctx`. Each phase
/// is failure-isolated: a per-file analysis or embedding failure is logged
/// and downgrades `status` to `Warning` rather than aborting the run, while
/// key/grid invariant violations abort immediately (§7's propagation
/// policy).
pub fn run_analyze_project(ctx: &AppContext, force_analysis: bool, force_embeddings: bool) -> Result<AnalyzeProjectReport> {
    let mut status = RunStatus::Ok;
    let mut warnings = Vec::new();

    let pool = build_worker_pool(ctx.settings.workers.max_workers)?;

    // Phase: rotate global_key_map -> old; walk roots -> new path->KeyInfo.
    let roots = ctx.root_paths();
    if roots.is_empty() {
        anyhow::bail!(
            "no configured code/doc root directories exist under '{}'",
            ctx.project_root.display()
        );
    }
    let exclusions = ctx.exclusion_set();
    let (new_map, new_keys) = generate_keys(&roots, &exclusions).context("key generation failed")?;
    info!(new_keys = new_keys.len(), total = new_map.len(), "generated key map");
    save_global_key_map(&ctx.memory_dir, &new_map).context("failed to persist global key map")?;

    // The rotation above just moved the previous run's current map into the
    // "old" slot. Loading it now gives the authoritative previous key->path
    // mapping for structural migration, preferred over a tracker's own
    // (possibly stale) key-def block.
    let old_global_map = load_old_global_key_map(&ctx.memory_dir).context("failed to read rotated-out global key map")?;
    let use_old_map_for_migration = old_global_map.is_some();
    let old_map_key_to_path: HashMap<String, String> = old_global_map
        .iter()
        .flat_map(|map| map.values())
        .map(|info| (info.key_string.clone(), info.norm_path.clone()))
        .collect();

    let main_modules = filter_main_tracker_modules(
        &ctx.project_root.to_string_lossy(),
        &new_map,
        &ctx.settings.code_root_directories,
    );
    let doc_items = filter_doc_tracker_items(
        &ctx.project_root.to_string_lossy(),
        &new_map,
        &ctx.settings.doc_root_directories,
    );

    // Phase: build file_to_module map.
    let file_to_module = build_file_to_module(&new_map, &main_modules);

    // Phase: analyze files in parallel; skip excluded (already excluded by generate_keys).
    let files: Vec<&KeyInfo> = new_map.values().filter(|info| !info.is_directory).collect();
    let analyzer = RegexAnalyzer;
    let analysis_results: Vec<Result<_, String>> = pool.install(|| {
        files
            .par_iter()
            .map(|info| {
                analyzer
                    .analyze(Path::new(&info.norm_path))
                    .map_err(|e| format!("{}: {e}", info.norm_path))
            })
            .collect()
    });

    let mut records = Vec::with_capacity(analysis_results.len());
    let mut analysis_errors = 0usize;
    for result in analysis_results {
        match result {
            Ok(record) => records.push(record),
            Err(reason) => {
                analysis_errors += 1;
                warn!(%reason, "analysis failed for file, skipping suggestions for it");
                warnings.push(reason);
            }
        }
    }
    if analysis_errors > 0 {
        status = status.escalate(RunStatus::Warning);
    }

    // Phase: generate/refresh embeddings.
    let embedder = HashingEmbedder::new(ctx.settings.embedding.dimensions);
    let embed_config = EmbeddingGenerationConfig {
        embeddings_dir: ctx.embeddings_dir.clone(),
        project_root: ctx.project_root.clone(),
        max_file_bytes: ctx.settings.embedding.max_file_bytes,
        force: force_embeddings,
        exclusions: exclusions.clone(),
    };
    let embeddings = generate_embeddings(&new_map, &embedder, &embed_config).context("embedding generation failed")?;
    if !embeddings.is_success() {
        status = status.escalate(RunStatus::Warning);
        for (path, reason) in &embeddings.errors {
            warnings.push(format!("{path}: {reason}"));
        }
    }

    // Phase: compute suggestions per analyzed file.
    let thresholds = SimilarityThresholds {
        code_similarity: ctx.settings.embedding.strong_similarity_threshold,
        doc_similarity: ctx.settings.embedding.weak_similarity_threshold,
    };
    let project_root_str = ctx.project_root.to_string_lossy().to_string();
    let suggestion_results: Vec<(String, Result<Vec<Suggestion>>)> = pool.install(|| {
        records
            .par_iter()
            .filter_map(|record| {
                get_key_from_path(record.path(), &new_map).map(|source_key| {
                    let result = suggest_dependencies(
                        record,
                        &new_map,
                        &project_root_str,
                        &ctx.embeddings_dir,
                        thresholds,
                    )
                    .map_err(anyhow::Error::from);
                    (source_key, result)
                })
            })
            .collect()
    });

    let mut suggestions_by_source: HashMap<String, Vec<SuggestedEdge>> = HashMap::new();
    for (source_key, result) in suggestion_results {
        match result {
            Ok(suggestions) => {
                let edges = suggestions
                    .into_iter()
                    .map(|s| SuggestedEdge { target_key: s.target_key, dep_char: s.dep_char })
                    .collect();
                suggestions_by_source.insert(source_key, edges);
            }
            Err(e) => {
                warnings.push(format!("{source_key}: {e}"));
                status = status.escalate(RunStatus::Warning);
            }
        }
    }

    // Phase: update mini-trackers first.
    let mut mini_trackers_written = 0usize;
    for module_path in main_modules.keys() {
        let tracker_path = mini_tracker_path(module_path);
        let existing = parse_tracker_file(&tracker_path);
        let final_key_defs =
            mini_tracker_key_defs(module_path, &new_map, &suggestions_by_source, &existing.key_defs, &existing.grid);
        if final_key_defs.len() <= 1 {
            // Nothing but the module directory itself: no point writing an
            // empty mini-tracker.
            continue;
        }
        write_one_tracker(
            &tracker_path,
            &ctx.backups_dir,
            ctx.settings.tracker.backups_to_keep,
            TrackerKind::Mini,
            final_key_defs,
            &new_map,
            &suggestions_by_source,
            force_analysis,
            use_old_map_for_migration,
            &old_map_key_to_path,
        )
        .with_context(|| format!("failed to update mini-tracker at '{}'", tracker_path.display()))?;
        mini_trackers_written += 1;
    }

    // Phase: update doc tracker (all paths under doc roots).
    let doc_tracker_written = if doc_items.is_empty() {
        false
    } else {
        let path = doc_tracker_path(
            &ctx.project_root.to_string_lossy(),
            &ctx.settings.memory_dir.to_string_lossy(),
            &ctx.settings.tracker.doc_tracker_filename,
        );
        let final_key_defs: HashMap<String, String> =
            doc_items.values().map(|info| (info.key_string.clone(), info.norm_path.clone())).collect();
        write_one_tracker(
            &path,
            &ctx.backups_dir,
            ctx.settings.tracker.backups_to_keep,
            TrackerKind::Doc,
            final_key_defs,
            &new_map,
            &suggestions_by_source,
            force_analysis,
            use_old_map_for_migration,
            &old_map_key_to_path,
        )
        .context("failed to update doc tracker")?;
        true
    };

    // Phase: update main tracker. No suggestions directly; the aggregator
    // supplies edges from the mini-trackers just written above.
    let main_tracker_written = if main_modules.is_empty() {
        false
    } else {
        let path = main_tracker_path(
            &ctx.project_root.to_string_lossy(),
            &ctx.settings.memory_dir.to_string_lossy(),
            &ctx.settings.tracker.main_tracker_filename,
        );
        let final_key_defs: HashMap<String, String> =
            main_modules.values().map(|info| (info.key_string.clone(), info.norm_path.clone())).collect();
        let aggregated = aggregate_dependencies(&main_modules, &file_to_module);
        let aggregated_suggestions: HashMap<String, Vec<SuggestedEdge>> = aggregated
            .into_iter()
            .map(|(source_path, edges)| {
                let source_key = main_modules
                    .get(&source_path)
                    .map(|info| info.key_string.clone())
                    .unwrap_or(source_path);
                let edges = edges
                    .into_iter()
                    .filter_map(|(target_path, dep_char)| {
                        main_modules
                            .get(&target_path)
                            .map(|info| SuggestedEdge { target_key: info.key_string.clone(), dep_char })
                    })
                    .collect();
                (source_key, edges)
            })
            .collect();
        write_one_tracker(
            &path,
            &ctx.backups_dir,
            ctx.settings.tracker.backups_to_keep,
            TrackerKind::Main,
            final_key_defs,
            &new_map,
            &aggregated_suggestions,
            force_analysis,
            use_old_map_for_migration,
            &old_map_key_to_path,
        )
        .context("failed to update main tracker")?;
        true
    };

    Ok(AnalyzeProjectReport {
        status,
        files_tracked: files.len(),
        files_analyzed: records.len(),
        analysis_errors,
        embeddings,
        mini_trackers_written,
        doc_tracker_written,
        main_tracker_written,
        warnings,
    })
}

#[derive(Debug, Serialize)]
pub struct AnalyzeFileReport {
    pub path: String,
    pub key: Option<String>,
    pub file_type: String,
    pub suggestions: Vec<(String, char)>,
}

/// Single-file analysis without mutating any tracker: runs the analyzer and
/// suggester against the persisted global key map, for inspection.
pub fn run_analyze_file(ctx: &AppContext, path: &Path) -> Result<AnalyzeFileReport> {
    let map = load_global_key_map(&ctx.memory_dir)
        .context("failed to read global key map")?
        .context("no global key map found; run analyze-project first")?;

    let record = RegexAnalyzer.analyze(path).with_context(|| format!("analysis failed for '{}'", path.display()))?;
    let norm_path = normalize_path(path);
    let key = get_key_from_path(&norm_path, &map);

    let thresholds = SimilarityThresholds {
        code_similarity: ctx.settings.embedding.strong_similarity_threshold,
        doc_similarity: ctx.settings.embedding.weak_similarity_threshold,
    };
    let suggestions = suggest_dependencies(
        &record,
        &map,
        &ctx.project_root.to_string_lossy(),
        &ctx.embeddings_dir,
        thresholds,
    )?;

    Ok(AnalyzeFileReport {
        path: norm_path,
        key,
        file_type: record.file_type().as_str().to_string(),
        suggestions: suggestions.into_iter().map(|s| (s.target_key, s.dep_char)).collect(),
    })
}

pub fn build_worker_pool(max_workers: usize) -> Result<rayon::ThreadPool> {
    let threads = max_workers.min(2 * num_cpus::get()).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build worker pool")
}

/// Maps every tracked file to the nearest ancestor directory present in
/// `main_modules`, walking up the path components. Files outside every
/// module (e.g. under a doc root with no code-root ancestor) are omitted.
fn build_file_to_module(new_map: &GlobalKeyMap, main_modules: &GlobalKeyMap) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for info in new_map.values() {
        if info.is_directory {
            continue;
        }
        let mut candidate = Path::new(&info.norm_path).parent().map(normalize_path);
        while let Some(dir) = candidate {
            if main_modules.contains_key(&dir) {
                out.insert(info.norm_path.clone(), dir);
                break;
            }
            candidate = Path::new(&dir).parent().map(normalize_path).filter(|p| p != &dir);
        }
    }
    out
}

/// Builds the key set a module's mini-tracker should cover: the module
/// directory itself, its direct children (files and immediate
/// subdirectories), and any foreign key that belongs in the grid either
/// because this run suggests an edge to it, or because a prior run already
/// recorded one at priority >= `s` (`existing_key_defs`/`existing_grid`) —
/// without the latter clause, a foreign edge a suggester doesn't happen to
/// re-propose on a later run silently drops out of the mini-tracker.
fn mini_tracker_key_defs(
    module_path: &str,
    new_map: &GlobalKeyMap,
    suggestions_by_source: &HashMap<String, Vec<SuggestedEdge>>,
    existing_key_defs: &HashMap<String, String>,
    existing_grid: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut defs = HashMap::new();
    let Some(module_info) = new_map.get(module_path) else { return defs };
    defs.insert(module_info.key_string.clone(), module_info.norm_path.clone());

    let mut own_keys = Vec::new();
    for info in new_map.values() {
        if info.parent_path.as_deref() == Some(module_path) {
            defs.insert(info.key_string.clone(), info.norm_path.clone());
            if !info.is_directory {
                own_keys.push(info.key_string.clone());
            }
        }
    }

    let path_by_key: HashMap<&str, &str> =
        new_map.values().map(|info| (info.key_string.as_str(), info.norm_path.as_str())).collect();
    for source_key in &own_keys {
        let Some(edges) = suggestions_by_source.get(source_key) else { continue };
        for edge in edges {
            if let Some(&path) = path_by_key.get(edge.target_key.as_str()) {
                defs.entry(edge.target_key.clone()).or_insert_with(|| path.to_string());
            }
        }
    }

    let min_priority = char_priority(WEAK_SEMANTIC_CHAR);
    let sorted_existing = sort_key_strings_hierarchically(&existing_key_defs.keys().cloned().collect::<Vec<_>>());
    let own_key_set: std::collections::HashSet<&str> = own_keys.iter().map(String::as_str).collect();
    for own_key in &own_keys {
        let Some(row_idx) = sorted_existing.iter().position(|k| k == own_key) else { continue };
        let own_row = existing_grid.get(own_key).map(|row| depmap_grid::decompress(row));
        for (col_idx, other_key) in sorted_existing.iter().enumerate() {
            if own_key_set.contains(other_key.as_str()) {
                continue;
            }
            let recorded = own_row.as_ref().and_then(|row| row.chars().nth(col_idx)).unwrap_or(depmap_core::EMPTY_CHAR);
            let reciprocal = existing_grid
                .get(other_key)
                .map(|row| depmap_grid::decompress(row))
                .and_then(|row| row.chars().nth(row_idx))
                .unwrap_or(depmap_core::EMPTY_CHAR);
            if char_priority(recorded) >= min_priority || char_priority(reciprocal) >= min_priority {
                if let Some(&path) = path_by_key.get(other_key.as_str()) {
                    defs.entry(other_key.clone()).or_insert_with(|| path.to_string());
                }
            }
        }
    }
    defs
}

#[allow(clippy::too_many_arguments)]
fn write_one_tracker(
    tracker_path: &Path,
    backup_dir: &Path,
    backups_to_keep: usize,
    tracker_kind: TrackerKind,
    final_key_defs: HashMap<String, String>,
    path_to_key_info: &GlobalKeyMap,
    suggestions_by_source: &HashMap<String, Vec<SuggestedEdge>>,
    force_apply_suggestions: bool,
    use_old_map_for_migration: bool,
    old_map_key_to_path: &HashMap<String, String>,
) -> Result<()> {
    let existing = parse_tracker_file(tracker_path);
    // Prefer the previous global key map's key->path mapping when one was
    // just rotated out; it reflects every key in the project, not just the
    // ones this tracker happened to carry, so it migrates correctly even
    // after a key was renumbered by tier promotion. Fall back to the
    // tracker's own key-def block when no prior global map exists (first
    // run) or the rotation produced nothing.
    let old_key_to_path =
        if use_old_map_for_migration { old_map_key_to_path.clone() } else { existing.key_defs.clone() };
    let current_last_key_edit =
        if existing.last_key_edit.is_empty() { "Initial creation".to_string() } else { existing.last_key_edit.clone() };
    let current_last_grid_edit =
        if existing.last_grid_edit.is_empty() { "Initial creation".to_string() } else { existing.last_grid_edit.clone() };

    let result = compute_structural_update(TrackerUpdateInput {
        tracker_kind,
        existing_key_defs: &existing.key_defs,
        existing_grid: &existing.grid,
        current_last_key_edit: &current_last_key_edit,
        current_last_grid_edit: &current_last_grid_edit,
        final_key_defs,
        path_to_key_info,
        old_key_to_path: Some(old_key_to_path),
        suggestions: suggestions_by_source.clone(),
        force_apply_suggestions,
    });

    depmap_tracker::backup_tracker_file_keeping(tracker_path, backup_dir, backups_to_keep)?;

    if tracker_kind == TrackerKind::Mini {
        let module_name = tracker_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("module");
        let (prefix, suffix) = match (&existing.template_prefix, &existing.template_suffix) {
            (Some(p), Some(s)) => (p.clone(), s.clone()),
            _ => (default_mini_tracker_template(module_name), format!("{}\n", depmap_tracker::MINI_TRACKER_END_MARKER)),
        };
        write_tracker_file_with_template(
            tracker_path,
            &result.key_defs,
            &result.grid,
            &result.last_key_edit,
            &result.last_grid_edit,
            Some(&prefix),
            Some(&suffix),
        )
    } else {
        write_tracker_file(tracker_path, &result.key_defs, &result.grid, &result.last_key_edit, &result.last_grid_edit)
    }
}

/// Used by mutate::remove_key to confirm a path sits inside a tracker's own
/// key set before editing it, rather than silently no-op-ing.
pub fn tracker_contains_path(doc: &depmap_tracker::TrackerDocument, path: &str) -> bool {
    doc.key_defs.values().any(|p| is_subpath(p, path) || p == path)
}
