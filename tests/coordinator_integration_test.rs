//! 多 Agent 协调集成测试：顺序传递、并行故障隔离、协作轮次、超时与取消

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use colony::agent::{Agent, AgentEvent, AgentProfile, PlannerConfig};
    use colony::coordinator::{AgentCoordinator, CoordinatorConfig, Topology};
    use colony::core::{BackoffPolicy, TaskScheduler};
    use colony::llm::{FnLlmClient, LlmClient, LlmError, MockLlmClient};
    use colony::memory::Message;
    use colony::tools::{EchoTool, ToolRegistry};
    use tokio_util::sync::CancellationToken;

    /// 每次回复前等待固定时长
    struct SlowLlm(Duration);

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            tokio::time::sleep(self.0).await;
            MockLlmClient.complete(messages).await
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        Arc::new(registry)
    }

    fn agent(role: &str, llm: Arc<dyn LlmClient>) -> Agent {
        Agent::new(
            AgentProfile::new(role),
            llm,
            registry(),
            TaskScheduler::new(2).with_backoff(BackoffPolicy::none()),
            PlannerConfig::default(),
        )
    }

    fn mock(role: &str) -> Agent {
        agent(role, Arc::new(MockLlmClient))
    }

    fn config(rounds: usize, agent_timeout: Duration) -> CoordinatorConfig {
        CoordinatorConfig {
            collaborative_rounds: rounds,
            agent_timeout,
        }
    }

    #[tokio::test]
    async fn test_sequential_passes_previous_output() {
        let coordinator = AgentCoordinator::new(
            vec![mock("researcher"), mock("writer")],
            CoordinatorConfig::default(),
        );
        let result = coordinator
            .run("explain ownership", Topology::Sequential, &CancellationToken::new())
            .await;

        assert_eq!(result.len(), 2);
        assert!(result.success);
        let first = &result.entries[0].result;
        let second = &result.entries[1].result;
        assert!(first.success);
        assert_eq!(first.goal, "explain ownership");
        assert!(second.goal.contains("Previous result from 'researcher'"));
        assert!(second.goal.contains(&first.text));
        assert_eq!(result.final_text, second.text);
    }

    #[tokio::test]
    async fn test_parallel_isolates_failing_agent() {
        let coordinator = AgentCoordinator::new(
            vec![
                mock("analyst"),
                agent("broken", Arc::new(FnLlmClient::unavailable())),
                mock("writer"),
            ],
            CoordinatorConfig::default(),
        );
        let result = coordinator
            .run("compare runtimes", Topology::Parallel, &CancellationToken::new())
            .await;

        assert_eq!(result.len(), 3);
        let roles: Vec<&str> = result.entries.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["analyst", "broken", "writer"]);

        let by_role = result.results_by_role();
        assert!(by_role["analyst"].success);
        assert!(by_role["writer"].success);
        assert!(!by_role["broken"].success);
        assert!(by_role["broken"].error.is_some());

        assert!(result.success);
        assert!(result.final_text.contains("## analyst"));
        assert!(result.final_text.contains("## writer"));
    }

    #[tokio::test]
    async fn test_parallel_agent_timeout_does_not_block_others() {
        let coordinator = AgentCoordinator::new(
            vec![mock("fast"), agent("slow", Arc::new(SlowLlm(Duration::from_secs(10))))],
            config(3, Duration::from_millis(200)),
        );
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.run("summarize", Topology::Parallel, &CancellationToken::new()),
        )
        .await
        .expect("coordination must finish");

        let by_role = result.results_by_role();
        assert!(by_role["fast"].success);
        let slow = by_role["slow"];
        assert!(!slow.success);
        assert!(slow.error.as_deref().unwrap().contains("timed out"));
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_collaborative_runs_configured_rounds() {
        let coordinator = AgentCoordinator::new(
            vec![mock("drafter"), mock("critic")],
            config(3, Duration::from_secs(30)),
        );
        let result = coordinator
            .run("design a cache", Topology::Collaborative, &CancellationToken::new())
            .await;

        assert_eq!(result.len(), 3);
        let rounds: Vec<usize> = result.entries.iter().map(|e| e.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);
        let roles: Vec<&str> = result.entries.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["drafter", "critic", "drafter"]);

        let draft = &result.entries[0].result;
        assert!(draft.goal.contains("Produce a first draft"));
        assert!(result.entries[1].result.goal.contains(&draft.text));
        assert!(result.entries[2].result.goal.contains("Critique:"));
        assert_eq!(result.final_text, result.entries[2].result.text);
    }

    #[tokio::test]
    async fn test_cancel_keeps_finished_results() {
        let coordinator = AgentCoordinator::new(
            vec![
                mock("quick"),
                agent("lagging", Arc::new(SlowLlm(Duration::from_secs(10)))),
            ],
            CoordinatorConfig::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.run("survey", Topology::Parallel, &cancel),
        )
        .await
        .expect("cancelled coordination must return promptly");

        assert!(result.cancelled);
        assert_eq!(result.len(), 2);
        let by_role = result.results_by_role();
        assert!(by_role["quick"].success);
        assert!(!by_role["lagging"].success);
    }

    #[tokio::test]
    async fn test_progress_events_reported() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let coordinator =
            AgentCoordinator::new(vec![mock("a"), mock("b")], CoordinatorConfig::default()).with_events(tx);
        coordinator
            .run("ping", Topology::Sequential, &CancellationToken::new())
            .await;
        drop(coordinator);

        let mut progress = Vec::new();
        let mut plans = 0;
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::CoordinationProgress { completed, total, .. } => progress.push((completed, total)),
                AgentEvent::PlanCreated { .. } => plans += 1,
                _ => {}
            }
        }
        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        assert_eq!(plans, 2);
    }
}
