//! 步骤调度：并发上限与重试退避
//!
//! 就绪步骤通过 Semaphore 限制同时运行的数量；重试等待时间按指数退避计算并封顶。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::EngineError;

/// 重试退避策略：base * 2^n，封顶 max
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// 不等待，测试中常用
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// 第 retries_used 次重试前应等待的时长
    pub fn delay_for(&self, retries_used: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let multiplier = 1u128 << retries_used.min(20);
        let backoff_ms = base_ms.saturating_mul(multiplier).min(max_ms);
        Duration::from_millis(u64::try_from(backoff_ms).unwrap_or(u64::MAX))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(5))
    }
}

/// 任务调度器：并发许可 + 退避策略
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    /// 步骤并发限制（默认 3）
    step_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    backoff: BackoffPolicy,
}

impl TaskScheduler {
    pub fn new(max_concurrent_steps: usize) -> Self {
        let max_concurrent = max_concurrent_steps.max(1);
        Self {
            step_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// 获取步骤执行许可；信号量不会被关闭，关闭时按取消处理
    pub async fn acquire_step(&self) -> Result<OwnedSemaphorePermit, EngineError> {
        self.step_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Cancelled)
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_exponentially_and_caps() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(30), Duration::from_millis(350));
    }

    #[test]
    fn test_zero_backoff() {
        assert_eq!(BackoffPolicy::none().delay_for(3), Duration::ZERO);
    }

    #[test]
    fn test_scheduler_minimum_one_slot() {
        let scheduler = TaskScheduler::new(0);
        assert_eq!(scheduler.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_acquire_limits_permits() {
        let scheduler = TaskScheduler::new(2);
        let a = scheduler.acquire_step().await.unwrap();
        let _b = scheduler.acquire_step().await.unwrap();
        let third = tokio::time::timeout(Duration::from_millis(20), scheduler.acquire_step()).await;
        assert!(third.is_err());
        drop(a);
        let third = tokio::time::timeout(Duration::from_millis(200), scheduler.acquire_step()).await;
        assert!(third.is_ok());
    }
}
