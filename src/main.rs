use clap::Parser;
use statement_extract::config::cli::CliArgs;
use statement_extract::utils::error::{ErrorSeverity, PipelineError};
use statement_extract::utils::{logger, validation::Validate};
use statement_extract::{build_pipeline, AppConfig, ExtractionResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting statement-extract CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(e);
    }

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(e),
    };

    let document_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let bytes = match tokio::fs::read(&args.file).await {
        Ok(bytes) => bytes,
        Err(e) => fail(PipelineError::IoError(e)),
    };

    let result = match pipeline.extract_document(&document_name, bytes).await {
        Ok(result) => result,
        Err(e) => fail(e),
    };

    report(&result, &args)?;
    Ok(())
}

fn report(result: &ExtractionResult, args: &CliArgs) -> anyhow::Result<()> {
    let json = if args.compact {
        serde_json::to_string(result)?
    } else {
        serde_json::to_string_pretty(result)?
    };
    println!("{}", json);

    match result.transactions_csv() {
        Some(csv) => {
            tracing::info!("✅ Found {} transactions", result.transactions().len());
            if let Some(path) = &args.csv_out {
                std::fs::write(path, csv)?;
                tracing::info!("📁 Transactions CSV saved to: {}", path.display());
                eprintln!("📁 Transactions CSV saved to: {}", path.display());
            }
        }
        None => {
            tracing::warn!("No transactions table found, details come from the model only");
            eprintln!("⚠️ No transactions table found in the document");
            if args.csv_out.is_some() {
                eprintln!("No CSV written");
            }
        }
    }

    Ok(())
}

fn fail(e: PipelineError) -> ! {
    tracing::error!(
        "❌ Extraction failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
