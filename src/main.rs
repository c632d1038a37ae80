use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use student_form_submit::models::RunAbort;
use student_form_submit::orchestrator::interrupt;
use student_form_submit::utils::logging;
use student_form_submit::{App, Config, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::load(&PathBuf::from(path))?,
        Err(_) => {
            let config = Config::from_env();
            config.validate()?;
            config
        }
    };

    // 初始化日志
    logging::init(&config)?;

    let credentials = Credentials::from_env()?;

    // 第一次 Ctrl-C 在两条记录之间生效，第二次立即退出
    let cancellation = CancellationToken::new();
    let handle = cancellation.clone();
    tokio::spawn(async move {
        if interrupt::forward_interrupts(interrupt::ctrl_c_stream(), handle).await {
            std::process::exit(130);
        }
    });

    // 初始化并运行应用
    let result = App::initialize(config)
        .await?
        .with_cancellation(cancellation)
        .run(&credentials)
        .await;

    match result.abort_reason() {
        None | Some(RunAbort::Cancelled) => Ok(()),
        Some(reason) => bail!("运行中止: {}", reason),
    }
}
