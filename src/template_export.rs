//! Template summary export
//!
//! Writes a registry as CSV with `TemplateId,Template,Occurrences` columns,
//! optionally tagged with the partition it came from.
use crate::template_registry::TemplateRegistry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TemplateRow<'a> {
    #[serde(rename = "Partition")]
    partition: usize,
    #[serde(rename = "TemplateId")]
    template_id: u64,
    #[serde(rename = "Template")]
    template: &'a str,
    #[serde(rename = "Occurrences")]
    occurrences: u64,
}

/// Write every `(partition, registry)` pair's templates, in id order.
pub fn write_templates_csv<'a, W, I>(writer: W, registries: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (usize, &'a TemplateRegistry)>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for (partition, registry) in registries {
        for entry in registry.iter() {
            csv_writer.serialize(TemplateRow {
                partition,
                template_id: entry.template_id,
                template: &entry.template,
                occurrences: entry.occurrences,
            })?;
            rows += 1;
        }
    }

    csv_writer.flush()?;
    Ok(rows)
}

pub fn save_templates_csv<'a, I>(path: impl AsRef<Path>, registries: I) -> Result<usize>
where
    I: IntoIterator<Item = (usize, &'a TemplateRegistry)>,
{
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create template file: {}", path.display()))?;

    write_templates_csv(file, registries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_layout() {
        let mut registry = TemplateRegistry::new();
        registry.get_or_assign("token1a <*> ");
        registry.get_or_assign("token2a token2b token2c ");
        registry.get_or_assign("token1a <*> ");

        let mut out = Vec::new();
        let rows = write_templates_csv(&mut out, [(0, &registry)]).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Partition,TemplateId,Template,Occurrences\n\
             0,0,token1a <*> ,2\n\
             0,1,token2a token2b token2c ,1\n"
        );
    }

    #[test]
    fn test_commas_and_quotes_are_escaped() {
        let mut registry = TemplateRegistry::new();
        registry.get_or_assign("said \"hi\", then <*> ");

        let mut out = Vec::new();
        write_templates_csv(&mut out, [(2, &registry)]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("2,0,\"said \"\"hi\"\", then <*> \",1\n"));
    }
}
