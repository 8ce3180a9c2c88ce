use anyhow::Result;
use clap::Parser;
use fdm_modules::cli::{load_args, load_options, select_module};
use fdm_modules::ModuleOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run one FDM module and print its JSON result.
#[derive(Parser, Debug)]
#[command(name = "fdm-module", version, about)]
struct Args {
    /// Module to run: flex_config_policy, flex_config_object, file_upload,
    /// or the path of a JSON resource schema
    module: String,

    /// JSON file holding the module arguments
    args_file: PathBuf,

    /// JSON file with run options (api_prefix, tls_verify, timeout_secs)
    #[arg(long, env = "FDM_MODULE_OPTIONS")]
    options: Option<PathBuf>,

    /// Override the API prefix
    #[arg(long, env = "FDM_API_PREFIX")]
    api_prefix: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FDM_TIMEOUT")]
    timeout: Option<u64>,
}

impl Args {
    fn module_options(&self) -> Result<ModuleOptions> {
        let mut options = match &self.options {
            Some(path) => load_options(path)?,
            None => ModuleOptions::default(),
        };
        if let Some(prefix) = &self.api_prefix {
            options.api_prefix.clone_from(prefix);
        }
        if self.insecure {
            options.tls_verify = false;
        }
        if let Some(timeout) = self.timeout {
            options.timeout_secs = timeout;
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let module = select_module(&args.module, args.module_options()?)?;
    let module_args = load_args(&args.args_file)?;

    let result = module.run(&module_args).await;
    println!("{}", serde_json::to_string(&result)?);

    Ok(if result.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
