// 📤 CSV export of one category's records

use crate::record::NormalizedRecord;
use crate::schema::CategorySchema;
use anyhow::{Context, Result};
use std::io::Write;

/// Write records as CSV: a header row of the schema's field names, then one
/// row per record in insertion order. Lists are joined with ", ".
pub fn write_csv<W: Write>(
    schema: &CategorySchema,
    records: &[NormalizedRecord],
    writer: W,
) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(schema.field_names())
        .context("Failed to write CSV header")?;

    for (i, record) in records.iter().enumerate() {
        let row: Vec<String> = schema
            .field_names()
            .map(|field| record.get(field).map(|v| v.to_string()).unwrap_or_default())
            .collect();

        csv_writer
            .write_record(&row)
            .with_context(|| format!("Failed to write CSV row {}", i + 1))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(records.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawEntry;
    use crate::schema::registry;
    use crate::validator::validate;

    #[test]
    fn test_export_projects() {
        let schema = registry().get("Progetti IT").unwrap();
        let record = validate(
            schema,
            &RawEntry::new()
                .with("Nome Progetto", "NAS")
                .with("Tecnologie", "rust, zfs")
                .with("Data di Inizio", "01/02/2024"),
        )
        .unwrap();

        let mut out = Vec::new();
        let written = write_csv(schema, &[record], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 1);
        assert_eq!(
            lines[0],
            "Nome Progetto,Descrizione,Tecnologie,Data di Inizio,Data di Fine,Stato,Obiettivo,Risultati,Repository,Note"
        );
        assert_eq!(lines[1], "NAS,,\"rust, zfs\",01/02/2024,,,,,,");
    }

    #[test]
    fn test_export_empty_category() {
        let schema = registry().get("Note Libere").unwrap();
        let mut out = Vec::new();

        assert_eq!(write_csv(schema, &[], &mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Titolo Nota,Data,Testo,Tag,Note Aggiuntive"]);
    }
}
