mod config;
mod run;

use clap::Parser;

use cloud::awscli::AwsCliCloud;
use common::logger::init_logger;
use ledger::store::pg_store::PgLedgerStore;
use queue::probe::condor::CondorProbe;

#[derive(Debug, Parser)]
#[clap(name = "provisioner", version)]
struct Cli {
    /// Path to the INI configuration file.
    #[clap(long, default_value = "provisioner.ini")]
    config: String,

    /// Path to the cloud-init user-data template. Overrides the
    /// configured path.
    #[clap(long)]
    cloudinit: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("provisioner");

    let cli = Cli::parse();
    let settings = config::Settings::load(&cli.config)?;

    let cloudinit_path = cli
        .cloudinit
        .unwrap_or_else(|| settings.provision.cloudinit_file.clone());
    let user_data_template = tokio::fs::read_to_string(&cloudinit_path).await?;

    let store = PgLedgerStore::new(&settings.database_url()).await?;
    let api = AwsCliCloud::new();
    let probe = CondorProbe::new();

    run::run(
        &api,
        &store,
        &probe,
        &settings.provision_config(),
        &user_data_template,
    )
    .await
}
