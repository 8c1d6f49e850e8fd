use std::sync::Arc;

use s3_tagger::cli::Cli;
use s3_tagger::config::Settings;
use s3_tagger::error::Result;
use s3_tagger::logging::{self, LogContext};
use s3_tagger::runner;
use s3_tagger::storage::S3Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments; validation happens before any network call
    let cli = Cli::parse_args();
    let settings = Settings::load(&cli)?;

    // Initialize logging
    logging::init_subscriber(&settings.log_level)?;
    let ctx = LogContext::new(&settings.environment, &settings.application);
    ctx.span().in_scope(|| tracing::info!("args initiated"));

    let store = S3Store::connect(&settings.store_config()).await;

    match runner::run(&settings, Arc::new(store), &ctx).await {
        Ok(summary) => {
            ctx.span().in_scope(|| {
                tracing::info!(
                    objects_found = summary.objects_found,
                    objects_matched = summary.matched,
                    "--Finished--"
                )
            });
            Ok(())
        }
        Err(e) => {
            ctx.span().in_scope(|| {
                tracing::error!(error_message = %e, "Exception occurred for invocation")
            });
            Err(e)
        }
    }
}
