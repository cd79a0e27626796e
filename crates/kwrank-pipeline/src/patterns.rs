//! Learned long-tail patterns.
//!
//! Remembers which intent operators and modifiers produced phrases that were
//! later collected for a theme, so the long-tail generator can try them first.
//! Persisted as JSON:
//!
//! ```json
//! { "email marketing": { "operators": { "como fazer": 3 }, "modifiers": { "para iniciantes": 1 } } }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kwrank_core::{Error, Result};
use kwrank_inference::text::normalize_phrase;

/// Effective operator and modifier counts for one theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePatterns {
    #[serde(default)]
    pub operators: BTreeMap<String, u64>,
    #[serde(default)]
    pub modifiers: BTreeMap<String, u64>,
}

impl ThemePatterns {
    /// Operators by descending count, ties by text.
    pub fn ranked_operators(&self) -> Vec<String> {
        ranked(&self.operators)
    }

    /// Modifiers by descending count, ties by text.
    pub fn ranked_modifiers(&self) -> Vec<String> {
        ranked(&self.modifiers)
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty() && self.modifiers.is_empty()
    }
}

fn ranked(counts: &BTreeMap<String, u64>) -> Vec<String> {
    let mut entries: Vec<(&String, &u64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().map(|(k, _)| k.clone()).collect()
}

type PatternMap = BTreeMap<String, ThemePatterns>;

/// JSON-backed store of learned patterns, keyed by normalized theme.
pub struct PatternStore {
    path: PathBuf,
    data: Mutex<PatternMap>,
}

impl PatternStore {
    /// Load the store at `path`. A missing or unreadable file yields an empty
    /// store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<PatternMap>(&content) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt pattern store, starting empty");
                    PatternMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PatternMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable pattern store, starting empty");
                PatternMap::new()
            }
        };

        debug!(path = %path.display(), themes = data.len(), "Pattern store loaded");
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PatternMap>> {
        self.data
            .lock()
            .map_err(|_| Error::Internal("pattern store lock poisoned".to_string()))
    }

    /// Learned patterns for `theme` (empty when none).
    pub fn patterns(&self, theme: &str) -> ThemePatterns {
        let key = normalize_phrase(theme);
        self.lock()
            .ok()
            .and_then(|data| data.get(&key).cloned())
            .unwrap_or_default()
    }

    /// Count the operator and modifier of every collected phrase that was
    /// also generated, then persist. Returns the number of phrases counted.
    pub fn record_effective<S: AsRef<str>>(
        &self,
        theme: &str,
        generated: &[S],
        collected: &[S],
    ) -> Result<usize> {
        let key = normalize_phrase(theme);
        if key.is_empty() {
            return Err(Error::InvalidInput("theme is empty".to_string()));
        }

        let generated: HashSet<String> = generated
            .iter()
            .map(|p| normalize_phrase(p.as_ref()))
            .collect();

        let mut data = self.lock()?;
        let entry = data.entry(key.clone()).or_default();
        let mut counted = 0;

        for phrase in collected {
            let phrase = normalize_phrase(phrase.as_ref());
            if !generated.contains(&phrase) {
                continue;
            }
            let (operator, modifier) = split_operator_modifier(&phrase, &key);
            if let Some(op) = operator {
                *entry.operators.entry(op).or_insert(0) += 1;
            }
            if let Some(m) = modifier {
                *entry.modifiers.entry(m).or_insert(0) += 1;
            }
            counted += 1;
        }

        debug!(theme = %key, counted, "Effective patterns recorded");
        write_atomic(&self.path, &data)?;
        Ok(counted)
    }

    /// Persist the current contents.
    pub fn save(&self) -> Result<()> {
        let data = self.lock()?;
        write_atomic(&self.path, &data)
    }
}

/// Write pretty JSON to a temp file, then rename over `path`.
fn write_atomic(path: &Path, data: &PatternMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(serde_json::to_string_pretty(data)?.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        warn!(from = %temp_path.display(), to = %path.display(), error = %e, "Pattern store rename failed");
        Error::Io(e)
    })
}

/// Split `phrase` around the first occurrence of `theme` into
/// `(operator, modifier)`. Single-word parts are discarded.
///
/// `"como fazer email marketing para iniciantes"` around `"email marketing"`
/// gives `(Some("como fazer"), Some("para iniciantes"))`.
pub fn split_operator_modifier(phrase: &str, theme: &str) -> (Option<String>, Option<String>) {
    let phrase = phrase.trim().to_lowercase();
    let theme = theme.trim().to_lowercase();
    if theme.is_empty() {
        return (None, None);
    }

    let Some((before, after)) = phrase.split_once(theme.as_str()) else {
        return (None, None);
    };

    let keep = |part: &str| {
        let part = part.trim();
        (part.split_whitespace().count() > 1).then(|| part.to_string())
    };
    (keep(before), keep(after))
}
