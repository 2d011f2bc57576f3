use tiktrue_admin_node::config::AdminNodeConfig;
use tiktrue_admin_node::kernel::AdminKernel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tiktrue_telemetry::init_tracing("admin-node");

    let config = AdminNodeConfig::from_env();
    let kernel = AdminKernel::bootstrap(config).await?;
    kernel.run().await
}
