//! 上下文引擎集成测试：容量淘汰、摘要编号、Run 归档、动作包装

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stepwise::memory::{
        ActionContextIntegrator, ContextEngine, ContextEngineOptions, StepMetadata, StepStatus,
    };
    use stepwise::AgentError;
    use tokio::sync::Mutex;

    fn engine(max_steps: usize) -> ContextEngine {
        ContextEngine::new(ContextEngineOptions {
            max_steps,
            use_ai_summaries: false,
        })
    }

    #[tokio::test]
    async fn test_step_list_never_exceeds_max_steps() {
        for max_steps in 1..=4 {
            let mut engine = engine(max_steps);
            engine.start_run("bounded", None).await;
            for i in 0..10 {
                engine.add_step(format!("a{}", i), "step", None).unwrap();
                assert!(engine.current_run().unwrap().steps.len() <= max_steps);
            }
            let first = &engine.current_run().unwrap().steps[0];
            assert_eq!(first.action, format!("a{}", 10 - max_steps));
        }
    }

    #[tokio::test]
    async fn test_max_steps_two_keeps_b_and_c() {
        let mut engine = engine(2);
        engine.start_run("scenario", None).await;
        engine.add_step("a", "first", None).unwrap();
        engine.add_step("b", "second", None).unwrap();
        engine.add_step("c", "third", None).unwrap();
        let actions: Vec<_> = engine
            .current_run()
            .unwrap()
            .steps
            .iter()
            .map(|s| s.action.as_str())
            .collect();
        assert_eq!(actions, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_step_leaves_steps_unchanged() {
        let mut engine = engine(5);
        engine.start_run("run", None).await;
        let step = engine
            .add_step(
                "aiInput",
                "type email",
                Some(StepMetadata::default().with_value("demo@example.com")),
            )
            .unwrap();
        engine
            .complete_step(&step.id, StepStatus::Success, None, None)
            .await;

        let before = serde_json::to_string(&engine.current_run().unwrap().steps).unwrap();
        let result = engine
            .complete_step("not-a-step", StepStatus::Failure, Some("x".into()), None)
            .await;
        let after = serde_json::to_string(&engine.current_run().unwrap().steps).unwrap();
        assert!(result.is_none());
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_start_run_archives_active_run() {
        let mut engine = engine(5);
        engine.start_run("login", None).await;
        engine.add_step("aiTap", "sign in", None).unwrap();
        assert_eq!(engine.run_history().len(), 0);

        engine.start_run("checkout", None).await;
        assert_eq!(engine.run_history().len(), 1);
        assert_eq!(engine.run_history()[0].name, "login");
        assert!(engine.current_run().unwrap().steps.is_empty());
    }

    #[tokio::test]
    async fn test_run_with_failure_step_fails() {
        let mut engine = engine(5);
        engine.start_run("run", None).await;
        let ok = engine.add_step("aiTap", "ok", None).unwrap();
        let bad = engine.add_step("aiTap", "bad", None).unwrap();
        engine.complete_step(&ok.id, StepStatus::Success, None, None).await;
        engine
            .complete_step(&bad.id, StepStatus::Failure, Some("not found".into()), None)
            .await;
        let run = engine.complete_run().await.unwrap();
        assert_eq!(run.result, StepStatus::Failure);
        assert_eq!(serde_json::to_value(&run).unwrap()["result"], "failure");
    }

    #[tokio::test]
    async fn test_summaries_use_fallback_format() {
        let mut engine = engine(5);
        engine.start_run("run", None).await;
        assert_eq!(engine.action_summaries(), "");
        for (action, desc, status) in [
            ("aiTap", "open menu", StepStatus::Success),
            ("aiQuery", "read price", StepStatus::Failure),
        ] {
            let step = engine.add_step(action, desc, None).unwrap();
            engine.complete_step(&step.id, status, None, None).await;
        }
        assert_eq!(
            engine.action_summaries(),
            "1. aiTap: open menu (success)\n2. aiQuery: read price (failure)"
        );
    }

    #[tokio::test]
    async fn test_wrap_passes_value_and_error_through() {
        let mut engine = engine(5);
        engine.start_run("wrap", None).await;
        let integrator = ActionContextIntegrator::new(Arc::new(Mutex::new(engine)));

        let value: Result<Vec<String>, AgentError> = integrator
            .wrap_with_action_recording(
                "aiQuery",
                "list items",
                async { Ok(vec!["apple".to_string(), "pear".to_string()]) },
                None,
            )
            .await;
        assert_eq!(value.unwrap(), vec!["apple", "pear"]);

        let failed: Result<u8, AgentError> = integrator
            .wrap_with_action_recording(
                "aiTap",
                "missing button",
                async { Err(AgentError::task_failed("tap missing button", Some("Element not found"))) },
                None,
            )
            .await;
        let err = failed.unwrap_err();
        assert_eq!(err.to_string(), "tap missing button\nReason: Element not found");

        assert_eq!(
            integrator.action_summaries().await,
            "1. aiQuery: list items (success)\n2. aiTap: missing button (failure)"
        );
        let engine = integrator.engine();
        let engine = engine.lock().await;
        let steps = engine.completed_steps();
        assert_eq!(steps[0].action_result, Some(serde_json::json!(["apple", "pear"])));
        assert_eq!(
            steps[1].error.as_deref(),
            Some("tap missing button\nReason: Element not found")
        );
    }
}
