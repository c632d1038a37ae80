//! Ctrl-C 处理
//!
//! 第一次中断只请求取消，当前学员处理完后停止；第二次中断要求立即退出。

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// 监听中断信号
///
/// 第一次中断取消 `token`；再次中断时返回 `true`，由调用方决定如何退出。
/// 信号流结束时返回 `false`。
pub async fn forward_interrupts<S>(signals: S, token: CancellationToken) -> bool
where
    S: Stream<Item = ()>,
{
    futures::pin_mut!(signals);
    while signals.next().await.is_some() {
        if token.is_cancelled() {
            warn!("⚠️ 再次收到 Ctrl-C，立即退出");
            return true;
        }
        warn!("⚠️ 收到 Ctrl-C，当前学员处理完后停止（再按一次立即退出）");
        token.cancel();
    }
    false
}

/// 进程的 Ctrl-C 信号流
pub fn ctrl_c_stream() -> impl Stream<Item = ()> {
    futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_interrupt_only_cancels() {
        let token = CancellationToken::new();
        let exit = forward_interrupts(futures::stream::iter([()]), token.clone()).await;
        assert!(!exit);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_interrupt_requests_exit() {
        let token = CancellationToken::new();
        let exit = forward_interrupts(futures::stream::iter([(), ()]), token.clone()).await;
        assert!(exit);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_token_alone() {
        let token = CancellationToken::new();
        let exit = forward_interrupts(futures::stream::empty(), token.clone()).await;
        assert!(!exit);
        assert!(!token.is_cancelled());
    }
}
