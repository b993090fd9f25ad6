//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::BillomatClient;
use crate::config::ClientConfig;
use crate::error::{Result, ResultExt};
use crate::pagination::BatchOutcome;
use crate::resource::{self, Resource};
use crate::types::{Filters, Record};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::{BufWriter, Write};
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing results to stdout.
    ///
    /// Stdout is buffered but not locked, so nothing else is blocked while
    /// requests are in flight.
    pub async fn run(&self) -> Result<()> {
        let mut out = BufWriter::new(std::io::stdout());

        if let Commands::Resources = self.cli.command {
            self.resources(&mut out)?;
        } else {
            let client = BillomatClient::new(self.load_config()?)?;
            self.run_with(&client, &mut out).await?;
        }

        out.flush()?;
        Ok(())
    }

    /// Run the CLI command against an existing client
    pub async fn run_with(&self, client: &BillomatClient, out: &mut impl Write) -> Result<()> {
        let started = Instant::now();

        match &self.cli.command {
            Commands::Resources => self.resources(out)?,
            Commands::List {
                resource,
                per_page,
                filters,
                concurrent,
            } => {
                let resource = Resource::parse(resource)?;
                let filters: Filters = filters.iter().cloned().collect();
                let per_page = per_page.unwrap_or(client.config().pagination.per_page);

                let request = client.page_request(resource, filters).per_page(per_page);

                if *concurrent {
                    let outcome = client.list_concurrent_request(request).await?;
                    self.emit_outcome(out, resource, &outcome)?;
                } else {
                    let records = client.list_request(request).await?;
                    self.emit_records(out, &records)?;
                }
            }
            Commands::Get { resource, id } => {
                let record = client.get(Resource::parse(resource)?, id).await?;
                self.emit(out, &record)?;
            }
            Commands::Children { resource, ids } => {
                let resource = Resource::parse(resource)?;
                let outcome = client.list_children(resource, ids).await?;
                self.emit_outcome(out, resource, &outcome)?;
            }
            Commands::Delete { resource, id } => {
                let resource = Resource::parse(resource)?;
                client.delete(resource, id).await?;
                self.emit(out, &json!({ "deleted": { "resource": resource.path, "id": id } }))?;
            }
            Commands::Pdf {
                resource,
                id,
                output,
            } => {
                let bytes = client.pdf_file(Resource::parse(resource)?, id).await?;
                fs::write(output, &bytes)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                self.emit(
                    out,
                    &json!({ "file": output.display().to_string(), "bytes": bytes.len() }),
                )?;
            }
        }

        info!("Finished in {:.2}s", started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Load the client configuration from `--config` or the environment
    fn load_config(&self) -> Result<ClientConfig> {
        match &self.cli.config {
            Some(path) => ClientConfig::from_file(path),
            None => ClientConfig::from_env(),
        }
    }

    fn resources(&self, out: &mut impl Write) -> Result<()> {
        for resource in resource::ALL {
            self.emit(
                out,
                &json!({
                    "path": resource.path,
                    "data_key": resource.data_key,
                    "parent_key": resource.parent_key,
                }),
            )?;
        }
        Ok(())
    }

    fn emit_outcome(
        &self,
        out: &mut impl Write,
        resource: Resource,
        outcome: &BatchOutcome,
    ) -> Result<()> {
        if !outcome.is_complete() {
            warn!(
                "{resource}: {} of {} request(s) failed, result is incomplete",
                outcome.failed,
                outcome.failed + outcome.succeeded
            );
        }
        self.emit_records(out, &outcome.records)
    }

    fn emit_records(&self, out: &mut impl Write, records: &[Record]) -> Result<()> {
        for record in records {
            self.emit(out, record)?;
        }
        Ok(())
    }

    fn emit(&self, out: &mut impl Write, value: &impl Serialize) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        writeln!(out, "{line}")?;
        Ok(())
    }
}
