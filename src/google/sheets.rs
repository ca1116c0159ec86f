//! Spreadsheet tabs and bulk writes

use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::discovery::ServiceHandle;
use crate::report::{PublishError, PublishResult};

/// Rows every written sheet is sized to at minimum
pub const MIN_SHEET_ROWS: usize = 1000;

/// Cell values destined for one sheet, header row first
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRows {
    /// Target sheet id
    pub sheet_id: i64,
    /// Rows of cell text
    pub rows: Vec<Vec<String>>,
}

fn titles_to_ids(sheets: &Value) -> IndexMap<String, i64> {
    sheets
        .as_array()
        .map(|sheets| {
            sheets
                .iter()
                .filter_map(|sheet| {
                    let props = sheet.get("properties")?;
                    let title = props.get("title")?.as_str()?;
                    let id = props.get("sheetId").and_then(Value::as_i64).unwrap_or(0);
                    Some((title.to_string(), id))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Look up the id of the sheet titled `name`
pub fn sheet_id(sheets: &IndexMap<String, i64>, name: &str) -> PublishResult<i64> {
    sheets
        .get(name)
        .copied()
        .ok_or_else(|| PublishError::UnexpectedResponse(format!("sheet {name} missing after creation")))
}

/// Sheet ids by title, adding a tab for every name not yet present
pub async fn get_or_create_sheets(
    sheets: &ServiceHandle,
    spreadsheet_id: &str,
    names: &[String],
) -> PublishResult<IndexMap<String, i64>> {
    let response = sheets
        .invoke("spreadsheets.get", &[("spreadsheetId", spreadsheet_id.to_string())], None)
        .await?;
    let mut existing = titles_to_ids(response.json().get("sheets").unwrap_or(&Value::Null));

    let missing: Vec<&String> = names.iter().filter(|n| !existing.contains_key(*n)).collect();
    if missing.is_empty() {
        return Ok(existing);
    }

    debug!(spreadsheet_id, count = missing.len(), "Adding sheets");
    let requests: Vec<Value> = missing
        .iter()
        .map(|title| json!({ "addSheet": { "properties": { "title": title } } }))
        .collect();

    let response = sheets
        .invoke(
            "spreadsheets.batchUpdate",
            &[("spreadsheetId", spreadsheet_id.to_string())],
            Some(json!({ "requests": requests, "includeSpreadsheetInResponse": true })),
        )
        .await?;

    let added = response
        .json()
        .pointer("/updatedSpreadsheet/sheets")
        .ok_or_else(|| PublishError::UnexpectedResponse(format!("batchUpdate without sheets: {}", response.body)))?;
    for (title, id) in titles_to_ids(added) {
        existing.entry(title).or_insert(id);
    }

    Ok(existing)
}

/// Batch update body resizing each sheet and replacing its cells
pub fn write_requests(writes: &[SheetRows]) -> Value {
    let requests: Vec<Value> = writes
        .iter()
        .flat_map(|sheet| {
            let rows: Vec<Value> = sheet
                .rows
                .iter()
                .map(|row| {
                    let values: Vec<Value> = row
                        .iter()
                        .map(|cell| json!({ "userEnteredValue": { "stringValue": cell } }))
                        .collect();
                    json!({ "values": values })
                })
                .collect();

            [
                json!({
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet.sheet_id,
                            "gridProperties": { "rowCount": sheet.rows.len().max(MIN_SHEET_ROWS) }
                        },
                        "fields": "gridProperties.rowCount"
                    }
                }),
                json!({
                    "updateCells": {
                        "range": { "sheetId": sheet.sheet_id },
                        "rows": rows,
                        "fields": "*"
                    }
                }),
            ]
        })
        .collect();

    json!({ "requests": requests, "includeSpreadsheetInResponse": false })
}

/// Write every sheet in one batch update
pub async fn write_rows(sheets: &ServiceHandle, spreadsheet_id: &str, writes: &[SheetRows]) -> PublishResult<()> {
    if writes.is_empty() {
        return Ok(());
    }
    sheets
        .invoke(
            "spreadsheets.batchUpdate",
            &[("spreadsheetId", spreadsheet_id.to_string())],
            Some(write_requests(writes)),
        )
        .await?;
    Ok(())
}
