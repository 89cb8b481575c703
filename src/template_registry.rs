use rustc_hash::FxHashMap;
use serde::Serialize;

/// A registered template and how many lines have mapped onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateEntry {
    pub template_id: u64,
    pub template: String,
    pub occurrences: u64,
}

/// Template string → id, assigned in first-seen order starting at 0.
///
/// Ids are never reused or reassigned. The registry is not bounded.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    ids: FxHashMap<String, u64>,
    // indexed by template id
    entries: Vec<TemplateEntry>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `template`, assigning the next one if it has not been seen.
    /// Counts one occurrence either way.
    pub fn get_or_assign(&mut self, template: &str) -> u64 {
        if let Some(&id) = self.ids.get(template) {
            self.entries[id as usize].occurrences += 1;
            return id;
        }

        let id = self.entries.len() as u64;
        self.ids.insert(template.to_string(), id);
        self.entries.push(TemplateEntry {
            template_id: id,
            template: template.to_string(),
            occurrences: 1,
        });

        tracing::debug!(template_id = id, template, "registered new template");
        id
    }

    pub fn get(&self, template: &str) -> Option<u64> {
        self.ids.get(template).copied()
    }

    pub fn template(&self, id: u64) -> Option<&str> {
        self.entries
            .get(id as usize)
            .map(|entry| entry.template.as_str())
    }

    pub fn occurrences(&self, id: u64) -> u64 {
        self.entries
            .get(id as usize)
            .map(|entry| entry.occurrences)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TemplateEntry> {
        self.entries.iter()
    }
}
