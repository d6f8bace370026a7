use crate::error::Error;
use crate::storage::Database;
use csv::Writer;
use std::io::Write;

const PLAN_HEADERS: [&str; 7] = [
    "id",
    "path",
    "size",
    "hash_state",
    "hash_full",
    "disposition",
    "target_path",
];

/// Write one CSV row per indexed record. Returns the number of rows.
pub fn export_plan_csv<W: Write>(db: &Database, out: W) -> Result<usize, Error> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(PLAN_HEADERS)?;

    let records = db.all_records()?;
    for record in &records {
        writer.write_record(&[
            record.id.to_string(),
            record.path.clone(),
            record.size.to_string(),
            record.hash_state.as_str().to_string(),
            record.hash_full.clone().unwrap_or_default(),
            record
                .disposition
                .map_or(String::new(), |d| d.as_str().to_string()),
            record.target_path.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(records.len())
}

pub fn export_plan_to_path(db: &Database, file_path: &str) -> Result<usize, Error> {
    let file = std::fs::File::create(file_path)?;
    export_plan_csv(db, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::InventoryEntry;

    #[test]
    fn test_export_plan_csv() {
        let db = Database::open_in_memory().unwrap();
        db.insert_inventory(&[InventoryEntry {
            path: "/src/a.jpg".to_string(),
            size: 3,
            extension: ".jpg".to_string(),
            created_at: 1704110400.0,
            modified_at: 1704110400.0,
        }])
        .unwrap();

        let mut buf = Vec::new();
        assert_eq!(export_plan_csv(&db, &mut buf).unwrap(), 1);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,path,size,hash_state,hash_full,disposition,target_path")
        );
        assert_eq!(lines.next(), Some("1,/src/a.jpg,3,UNPROCESSED,,,"));
    }
}
