use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use medqa_snomed::dataset::{read_question_at, read_questions, read_reasoning};
use medqa_snomed::output::ResultWriter;
use medqa_snomed::pipeline::{count_correct, smoke};
use medqa_snomed::{
    build_client, Driver, GenerationStage, ModelClient, ModelConfig, Provider, RunConfig,
    RunSummary, ValidationStage,
};

const DEFAULT_DATASET: &str = "data_clean/questions/US/4_options/phrases_no_exclude_train.jsonl";
const DEFAULT_GENERATED: &str = "mcqs_gemini.json";
const DEFAULT_VALIDATED: &str = "mcqs_validated.json";

#[derive(Parser)]
#[command(name = "medqa-snomed", version, about)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct ModelArgs {
    /// Hosted model API; its key is read from GEMINI_API_KEY or OPENAI_API_KEY
    #[arg(long, global = true, value_enum, default_value_t = Provider::Gemini)]
    provider: Provider,
    /// Model identifier, defaults to the provider's
    #[arg(long, global = true)]
    model: Option<String>,
    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    temperature: Option<f32>,
    /// Request timeout; none by default
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Free-form reasoning for a single question, printed with the correct answer
    Smoke {
        #[arg(long, default_value = DEFAULT_DATASET)]
        input: PathBuf,
        /// 0-based line of the question to use
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Structured SNOMED CT reasoning for the first questions of a dataset
    Generate {
        #[arg(long, default_value = DEFAULT_DATASET)]
        input: PathBuf,
        #[arg(long, default_value = DEFAULT_GENERATED)]
        output: PathBuf,
        #[arg(long, default_value_t = RunConfig::default().limit)]
        limit: usize,
        /// Pause between questions
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Validate and enhance the output of `generate`
    Validate {
        #[arg(long, default_value = DEFAULT_GENERATED)]
        input: PathBuf,
        #[arg(long, default_value = DEFAULT_VALIDATED)]
        output: PathBuf,
        /// Pause between questions
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
}

impl ModelArgs {
    fn config(&self) -> medqa_snomed::Result<ModelConfig> {
        let mut config = ModelConfig::from_env(self.provider)?;
        if let Some(model) = &self.model {
            config = config.with_model(model.as_str());
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.as_str());
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MEDQA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("medqa_snomed=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn log_summary(summary: &RunSummary, output: &ResultWriter) {
    tracing::info!(
        processed = summary.processed,
        ok = summary.ok,
        fallback = summary.fallback,
        errors = summary.errors,
        output = %output.path().display(),
        "run finished"
    );
}

async fn run_smoke(client: &dyn ModelClient, input: PathBuf, index: usize) -> medqa_snomed::Result<()> {
    let record = read_question_at(&input, index)?;
    let text = smoke(client, &record).await?;
    println!("Model response:\n\n{}", text);
    let answer = match (record.ground_truth(), record.answer.as_deref()) {
        (Some(label), Some(text)) => format!("{} ({})", label, text),
        (Some(label), None) => label.to_string(),
        (None, Some(text)) => text.to_owned(),
        (None, None) => "not given".to_owned(),
    };
    println!("\nCorrect answer from dataset: {}", answer);
    Ok(())
}

async fn run_generate(
    client: &dyn ModelClient,
    input: PathBuf,
    output: PathBuf,
    run: RunConfig,
) -> medqa_snomed::Result<()> {
    let records = read_questions(&input, Some(run.limit))?;
    tracing::info!(records = records.len(), input = %input.display(), "starting generation");
    let writer = ResultWriter::new(output);
    let entries = Driver::new(client, writer.clone(), run.delay)
        .run(&GenerationStage, &records)
        .await?;
    log_summary(&RunSummary::tally(&entries), &writer);
    tracing::info!(
        correct = count_correct(&records, &entries),
        total = records.len(),
        "answers matching the dataset"
    );
    Ok(())
}

async fn run_validate(
    client: &dyn ModelClient,
    input: PathBuf,
    output: PathBuf,
    delay: Duration,
) -> medqa_snomed::Result<()> {
    let prior = read_reasoning(&input)?;
    tracing::info!(records = prior.len(), input = %input.display(), "starting validation");
    let writer = ResultWriter::new(output);
    let entries = Driver::new(client, writer.clone(), delay)
        .run(&ValidationStage, &prior)
        .await?;
    log_summary(&RunSummary::tally(&entries), &writer);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.model.config().context("model configuration")?;
    tracing::debug!(?config, "model configured");
    let client = build_client(config).context("building model client")?;

    match cli.cmd {
        Cmd::Smoke { input, index } => run_smoke(client.as_ref(), input, index)
            .await
            .context("smoke run failed"),
        Cmd::Generate {
            input,
            output,
            limit,
            delay_ms,
        } => {
            let run = RunConfig {
                limit,
                delay: Duration::from_millis(delay_ms),
            };
            run_generate(client.as_ref(), input, output, run)
                .await
                .context("generation run failed")
        }
        Cmd::Validate {
            input,
            output,
            delay_ms,
        } => run_validate(client.as_ref(), input, output, Duration::from_millis(delay_ms))
            .await
            .context("validation run failed"),
    }
}
