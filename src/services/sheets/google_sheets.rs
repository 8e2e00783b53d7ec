//! # Google Sheets Client

//! This module defines the `GoogleSheetsClient` struct, which implements `SheetClient` on top of the Google Sheets REST API (v4).
//! Values are always written with `valueInputOption=RAW` so that cells such as seal numbers stay text instead of being coerced into numbers.
//! Authentication uses a bearer access token supplied through configuration.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;
use crate::config::SheetsSettings;
use crate::errors::{TrackerError, TrackerResult};
use crate::services::sheets::{Row, SheetClient};

/// Represents a client for one spreadsheet on the Google Sheets API
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    /// The shared HTTP client
    client: Client,
    /// The API root, e.g. `https://sheets.googleapis.com/`
    base_url: Url,
    /// The spreadsheet (workbook) identifier from its URL
    spreadsheet_id: String,
    /// OAuth2 bearer token with the spreadsheets scope
    access_token: Secret<String>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheetsClient {
    /// Creates a new `GoogleSheetsClient` from the sheet settings
    ///
    /// # Arguments
    ///
    /// * `settings`: The `sheets` section of the application settings
    ///
    /// # Returns
    ///
    /// * `Ok(Self)`: The created client
    /// * `Err(TrackerError::ConfigError)`: If the access token or spreadsheet id is missing, or the API URL is unusable
    pub fn new(settings: &SheetsSettings) -> TrackerResult<Self> {
        let access_token = settings.access_token.clone()
            .ok_or_else(|| TrackerError::ConfigError("sheets.access_token is required for the google backend".into()))?;
        if settings.spreadsheet_id.is_empty() {
            return Err(TrackerError::ConfigError("sheets.spreadsheet_id is required for the google backend".into()));
        }
        let base_url = Url::parse(&settings.api_base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::ConfigError(format!("sheets.api_base_url is not a base URL: {}", base_url)));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            spreadsheet_id: settings.spreadsheet_id.clone(),
            access_token,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["v4", "spreadsheets"]).extend(segments);
        }
        url
    }

    fn values_url(&self, range: &str, suffix: &str) -> Url {
        let range = format!("{}{}", range, suffix);
        self.url(&[self.spreadsheet_id.as_str(), "values", range.as_str()])
    }

    fn batch_update_url(&self) -> Url {
        let target = format!("{}:batchUpdate", self.spreadsheet_id);
        self.url(&[target.as_str()])
    }

    /// Maps a non-success response to a `TrackerError`, naming the sheet when the API could not resolve it
    async fn check(response: Response, sheet: Option<&str>) -> TrackerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if let Some(sheet) = sheet {
            if status == StatusCode::BAD_REQUEST && message.contains("Unable to parse range") {
                return Err(TrackerError::SheetNotFound(sheet.to_string()));
            }
        }
        warn!("Sheets API returned {}: {}", status, message);
        Err(TrackerError::SheetApi { status: status.as_u16(), message })
    }

    async fn sheet_properties(&self) -> TrackerResult<Vec<SheetProperties>> {
        let mut url = self.url(&[self.spreadsheet_id.as_str()]);
        url.query_pairs_mut().append_pair("fields", "sheets.properties(sheetId,title)");
        let response = self.client.get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        let meta: SpreadsheetMeta = Self::check(response, None).await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn sheet_id(&self, title: &str) -> TrackerResult<i64> {
        self.sheet_properties().await?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .ok_or_else(|| TrackerError::SheetNotFound(title.to_string()))
    }

    async fn batch_update(&self, request: serde_json::Value) -> TrackerResult<()> {
        let response = self.client.post(self.batch_update_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({ "requests": [request] }))
            .send()
            .await?;
        Self::check(response, None).await?;
        Ok(())
    }
}

/// A1 reference to a whole sheet; quotes in titles are doubled
fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn anchor_range(sheet: &str, row: usize) -> String {
    format!("{}!A{}", sheet_range(sheet), row)
}

#[async_trait]
impl SheetClient for GoogleSheetsClient {
    async fn worksheet_titles(&self) -> TrackerResult<Vec<String>> {
        Ok(self.sheet_properties().await?.into_iter().map(|p| p.title).collect())
    }

    async fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> TrackerResult<()> {
        if self.worksheet_exists(title).await? {
            return Err(TrackerError::SheetExists(title.to_string()));
        }
        debug!("Adding worksheet '{}'", title);
        self.batch_update(json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                }
            }
        })).await
    }

    async fn delete_worksheet(&self, title: &str) -> TrackerResult<()> {
        let sheet_id = self.sheet_id(title).await?;
        self.batch_update(json!({ "deleteSheet": { "sheetId": sheet_id } })).await
    }

    async fn get_values(&self, sheet: &str) -> TrackerResult<Vec<Row>> {
        let mut url = self.values_url(&sheet_range(sheet), "");
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        let response = self.client.get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        let range: ValueRange = Self::check(response, Some(sheet)).await?.json().await?;
        Ok(range.values)
    }

    async fn append_row(&self, sheet: &str, row: Row) -> TrackerResult<()> {
        let mut url = self.values_url(&sheet_range(sheet), ":append");
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let response = self.client.post(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        Self::check(response, Some(sheet)).await?;
        Ok(())
    }

    async fn update_rows(&self, sheet: &str, start_row: usize, rows: Vec<Row>) -> TrackerResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = anchor_range(sheet, start_row);
        let mut url = self.values_url(&range, "");
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self.client.put(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        Self::check(response, Some(sheet)).await?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> TrackerResult<()> {
        if row == 0 {
            return Err(TrackerError::SheetApi { status: 400, message: "rows are numbered from 1".into() });
        }
        let sheet_id = self.sheet_id(sheet).await?;
        self.batch_update(json!({
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row - 1,
                    "endIndex": row
                }
            }
        })).await
    }

    async fn clear_below(&self, sheet: &str, start_row: usize) -> TrackerResult<()> {
        if start_row == 0 {
            return Err(TrackerError::SheetApi { status: 400, message: "rows are numbered from 1".into() });
        }
        let sheet_id = self.sheet_id(sheet).await?;
        // an open-ended range with no cell data resets the values of every cell it covers
        self.batch_update(json!({
            "updateCells": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": start_row - 1
                },
                "fields": "userEnteredValue"
            }
        })).await
    }
}
