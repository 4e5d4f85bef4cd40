use std::sync::Arc;

use anyhow::{Context, Result};

use crate::client;
use crate::config;
use crate::data::{
    self, ExportService, FeedService, RecordService, SchemaService,
};
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let record_service: Arc<dyn RecordService>;
    let schema_service: Arc<dyn SchemaService>;
    let feed_service: Arc<dyn FeedService>;
    let export_service: Arc<dyn ExportService>;
    let status: String;

    if cfg.api.base_url.trim().is_empty() {
        // No API configured yet: browse the built-in sample data so the
        // keybindings can be explored offline.
        record_service = Arc::new(data::MockRecordService);
        schema_service = Arc::new(data::MockSchemaService);
        feed_service = Arc::new(data::MockFeedService);
        export_service = Arc::new(data::MockExportService);
        status = format!(
            "No api.base_url configured ({display_path}); browsing sample data."
        );
    } else {
        let api = client::Client::new(client::ClientConfig {
            base_url: cfg.api.base_url.clone(),
            user_agent: cfg.api.user_agent.clone(),
            http_client: None,
        })
        .context("initialize records client")?;
        let api = Arc::new(api);
        record_service = Arc::new(data::HttpRecordService::new(api.clone()));
        schema_service = Arc::new(data::HttpSchemaService::new(api.clone()));
        feed_service = Arc::new(data::HttpFeedService::new(api.clone()));
        export_service = Arc::new(data::HttpExportService::new(api));
        status = format!("Connected to {}.", cfg.api.base_url.trim());
    }

    let options = ui::Options {
        status_message: status,
        object: cfg.api.object.clone(),
        record_id: cfg.api.record_id.clone(),
        viewer_id: cfg.api.viewer_id.clone(),
        page_size: cfg.ui.page_size,
        editable: cfg.ui.editable,
        record_service,
        schema_service,
        feed_service,
        export_service,
        export_dir: cfg.export.dir.clone(),
        config_path: display_path,
    };

    let mut model = ui::Model::new(options)?;
    model.run()
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/recview/config.yaml".to_string()
    }
}
