use crate::models::attendance::AttendanceRecord;

pub const ATTENDANCE_CSV_HEADER: [&str; 4] = ["Student Name", "Date", "Status", "Notes"];

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    CsvError(#[from] csv::Error),

    #[error("CSV buffer could not be finished: {0}")]
    FlushError(String),
}

/// Renders attendance rows as CSV, in the order given
pub fn attendance_csv<'a>(
    records: impl IntoIterator<Item = &'a AttendanceRecord>,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ATTENDANCE_CSV_HEADER)?;

    for record in records {
        let date = record
            .day()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer.write_record([
            record.display_name().as_str(),
            date.as_str(),
            record.status.as_str(),
            record.notes_label(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::FlushError(e.error().to_string()))
}
