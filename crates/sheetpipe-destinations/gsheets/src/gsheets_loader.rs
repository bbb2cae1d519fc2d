use crate::auth;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetpipe_core::{Error, Loader, Result, Table};
use tracing::{debug, info};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/spreadsheets".to_string(),
        "https://www.googleapis.com/auth/drive".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GsheetsConfig {
    /// Path to the service-account key file, normally supplied through the
    /// environment.
    #[serde(default)]
    pub credentials_path: String,

    /// Spreadsheet id, as it appears in the document URL.
    pub spreadsheet_id: String,

    /// OAuth scopes requested for the access token.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl Default for GsheetsConfig {
    fn default() -> Self {
        Self {
            credentials_path: String::new(),
            spreadsheet_id: String::new(),
            scopes: default_scopes(),
        }
    }
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
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Serialize)]
struct ValueRange {
    range: String,
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "updatedCells", default)]
    updated_cells: u64,
}

/// Title of the worksheet with the lowest index.
fn first_title(meta: SpreadsheetMeta) -> Option<String> {
    meta.sheets
        .into_iter()
        .min_by_key(|sheet| sheet.properties.index)
        .map(|sheet| sheet.properties.title)
}

/// A1 range covering a whole worksheet; single quotes in titles are
/// doubled per A1 notation.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn api_error(status: StatusCode, body: String, context: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("{} ({}): {}", context, status, body))
        }
        StatusCode::NOT_FOUND => Error::NotFound(format!("{}: {}", context, body)),
        StatusCode::TOO_MANY_REQUESTS => Error::Quota(format!("{}: {}", context, body)),
        _ => Error::Pipeline(format!("{} ({}): {}", context, status, body)),
    }
}

/// Writes a table into the first worksheet of a Google spreadsheet,
/// replacing its previous contents entirely.
pub struct GsheetsLoader {
    config: GsheetsConfig,
    client: reqwest::Client,
}

impl GsheetsLoader {
    pub fn new(config: GsheetsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn first_worksheet(&self, token: &str) -> Result<String> {
        let url = format!(
            "{}/{}?fields=sheets(properties(title,index))",
            SHEETS_API_BASE, self.config.spreadsheet_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Failed to reach Sheets API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body, "Failed to open spreadsheet"));
        }

        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| Error::Pipeline(format!("Invalid spreadsheet metadata: {}", e)))?;

        first_title(meta).ok_or_else(|| {
            Error::NotFound(format!(
                "spreadsheet {} has no worksheets",
                self.config.spreadsheet_id
            ))
        })
    }

    async fn clear_values(&self, token: &str, title: &str) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}:clear",
            SHEETS_API_BASE,
            self.config.spreadsheet_id,
            sheet_range(title)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Failed to reach Sheets API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body, "Failed to clear worksheet"));
        }

        debug!("Cleared worksheet '{}'", title);
        Ok(())
    }

    async fn write_grid(
        &self,
        token: &str,
        title: &str,
        grid: Vec<Vec<Value>>,
    ) -> Result<u64> {
        let range = format!("{}!A1", sheet_range(title));
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_BASE, self.config.spreadsheet_id, range
        );

        let body = ValueRange {
            range: range.clone(),
            major_dimension: "ROWS",
            values: grid,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Failed to reach Sheets API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, text, "Failed to update worksheet"));
        }

        let update: UpdateResponse = response
            .json()
            .await
            .map_err(|e| Error::Pipeline(format!("Invalid update response: {}", e)))?;

        Ok(update.updated_cells)
    }
}

#[async_trait]
impl Loader for GsheetsLoader {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn load(&self, table: Table) -> Result<()> {
        if self.config.credentials_path.is_empty() {
            return Err(Error::Configuration(
                "destination.credentials_path is not set".to_string(),
            ));
        }
        if self.config.spreadsheet_id.is_empty() {
            return Err(Error::Configuration(
                "destination.spreadsheet_id is not set".to_string(),
            ));
        }

        let key = auth::load_key(&self.config.credentials_path)?;
        let token = auth::fetch_access_token(&self.client, &key, &self.config.scopes).await?;
        info!("Authenticated as {}", key.client_email);

        let title = self.first_worksheet(&token).await?;

        let grid = table.to_grid();
        let row_count = grid.len();

        self.clear_values(&token, &title).await?;
        let updated_cells = self.write_grid(&token, &title, grid).await?;

        info!(
            "Overwrote worksheet '{}' with {} row(s), {} cell(s) updated",
            title, row_count, updated_cells
        );

        Ok(())
    }
}
