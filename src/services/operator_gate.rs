//! 人工确认 - 业务能力层
//!
//! 照片上传和最终提交由操作员在浏览器中完成，这里只负责"等待操作员说继续"。

use async_trait::async_trait;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::error::ConfirmationError;
use crate::workflow::RecordCtx;

/// 人工确认通道
///
/// `confirm` 只在操作员明确确认后返回，没有超时。
#[async_trait]
pub trait OperatorGate: Send + Sync {
    async fn confirm(&self, ctx: &RecordCtx) -> Result<(), ConfirmationError>;
}

/// 控制台确认：打印操作步骤，等待回车
pub struct ConsoleGate {
    input: Mutex<BufReader<Stdin>>,
}

impl ConsoleGate {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(stdin())),
        }
    }
}

impl Default for ConsoleGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorGate for ConsoleGate {
    async fn confirm(&self, ctx: &RecordCtx) -> Result<(), ConfirmationError> {
        println!("\n{}", "=".repeat(80));
        println!("需要人工操作: {} {} (第 {} 行)", ctx, ctx.identifier, ctx.row);
        println!("{}", "=".repeat(80));
        println!("请在浏览器中完成以下步骤:");
        println!("1. 上传学员的证件照");
        println!("2. 核对所有已填写的信息");
        println!("3. 点击 'Submit Now' 按钮");
        println!("4. 提交成功后回到这里");
        println!("5. 按回车继续处理下一位学员");
        println!("{}\n", "=".repeat(80));

        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(ConfirmationError::ChannelClosed);
        }
        Ok(())
    }
}
