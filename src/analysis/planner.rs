use super::template::{NameContext, NamingTemplate};
use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::models::FileRecord;
use crate::storage::Database;
use crate::timestamp::{resolve_effective_timestamp, DateParts};
use ahash::AHashMap;
use regex::Regex;
use std::time::Instant;
use tracing::{debug, info};

/// Case-insensitive registry of every path assigned during one planning
/// pass. Guarantees uniqueness across the whole pass, not just pairwise.
#[derive(Debug, Default)]
pub struct PathRegistry {
    seen: AHashMap<String, u32>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`, or the first free `stem_N.ext` variant of it. The
    /// counter for a taken path starts at 2.
    pub fn claim(&mut self, path: String) -> String {
        let mut candidate = path;
        // Each retry appends a fresh suffix, so after len() + 1 tries the
        // candidate cannot match anything registered.
        for _ in 0..=self.seen.len() {
            let key = candidate.to_lowercase();
            match self.seen.get_mut(&key) {
                None => {
                    self.seen.insert(key, 1);
                    return candidate;
                }
                Some(count) => {
                    *count += 1;
                    candidate = with_numeric_suffix(&candidate, *count);
                }
            }
        }
        self.seen.insert(candidate.to_lowercase(), 1);
        candidate
    }
}

/// `dir/name.ext` → `dir/name_N.ext`.
pub fn with_numeric_suffix(path: &str, n: u32) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((d, f)) => (Some(d), f),
        None => (None, path),
    };
    let (stem, ext) = split_extension(file);
    let renamed = format!("{}_{}{}", stem, n, ext);
    match dir {
        Some(d) => format!("{}/{}", d, renamed),
        None => renamed,
    }
}

/// Split `name.ext` into (`name`, `.ext`). Leading-dot names have no extension.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// Computes a collision-free destination for every KEEP record.
pub struct Planner {
    target_root: String,
    template: NamingTemplate,
    date_prefix: Regex,
    folder_clean: Regex,
}

impl Planner {
    pub fn new(target_root: &str, template: NamingTemplate) -> Result<Self, Error> {
        Ok(Self {
            target_root: target_root.trim_end_matches('/').to_string(),
            template,
            date_prefix: Regex::new(r"^\d{4}[-_ ]\d{2}[-_ ]\d{2}[-_ ]?")?,
            folder_clean: Regex::new(r"[^\w\-]")?,
        })
    }

    pub fn is_already_organized(&self, path: &str) -> bool {
        path.starts_with(&format!("{}/", self.target_root))
    }

    /// Drop a leading `YYYY-MM-DD` token. A stem that is nothing but a date
    /// is kept as is.
    pub fn clean_stem(&self, stem: &str) -> String {
        let cleaned = self.date_prefix.replace(stem, "");
        if cleaned.is_empty() {
            stem.to_string()
        } else {
            cleaned.into_owned()
        }
    }

    pub fn sanitize_folder(&self, folder: &str) -> String {
        self.folder_clean.replace_all(folder, "_").into_owned()
    }

    /// Destination before collision resolution.
    pub fn proposed_path(&self, record: &FileRecord) -> String {
        let ts = resolve_effective_timestamp(record.created_at, record.modified_at);
        let date = DateParts::from_timestamp(ts);

        let (stem, actual_ext) = split_extension(record.file_name());
        let ext = if record.extension.is_empty() {
            actual_ext.to_lowercase()
        } else {
            record.extension.clone()
        };
        let clean = self.clean_stem(stem);

        let new_stem = if self.is_already_organized(&record.path) {
            // The parent here is a generated month folder, not provenance.
            NamingTemplate::fallback().render(&NameContext {
                date: &date.day,
                name: &clean,
                folder: "",
            })
        } else {
            let parent = record.parent_dir();
            let raw_folder = parent.rsplit('/').next().unwrap_or(parent);
            let folder = self.sanitize_folder(raw_folder);
            self.template.render(&NameContext {
                date: &date.day,
                name: &clean,
                folder: &folder,
            })
        };

        format!(
            "{}/{}/{}/{}{}",
            self.target_root, date.year, date.month, new_stem, ext
        )
    }

    /// Plan every KEEP record and store its target path.
    ///
    /// Library paths held by DELETE records are claimed up front: those
    /// files are still on disk when the keepers move, so no keeper may be
    /// planned onto them.
    pub fn plan(&self, db: &Database, reporter: &dyn ProgressReporter) -> Result<usize, Error> {
        info!("Generating organization plan...");
        let start = Instant::now();
        let records = db.keep_records(&self.target_root)?;
        info!("Planning moves for {} files...", records.len());
        reporter.on_stage_start(Stage::Plan, Some(records.len()));

        let mut registry = PathRegistry::new();
        for occupied in db.deleted_paths_under(&self.target_root)? {
            registry.claim(occupied);
        }
        let mut updates = Vec::with_capacity(records.len());
        for (done, record) in records.iter().enumerate() {
            let proposed = self.proposed_path(record);
            let target = registry.claim(proposed.clone());
            if target != proposed {
                debug!("Collision on '{}', using '{}'", proposed, target);
            }
            updates.push((record.id, target));
            reporter.on_stage_progress(Stage::Plan, done + 1);
        }
        let count = db.set_target_paths(&updates)?;

        reporter.on_stage_complete(Stage::Plan, count, start.elapsed().as_secs_f64());
        Ok(count)
    }
}
