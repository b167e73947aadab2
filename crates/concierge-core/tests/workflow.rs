use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use concierge_core::config::{WeatherConfig, WorkflowConfig};
use concierge_core::workflow::{SessionStore, TemplateLoader, WorkflowStep, WorkflowTemplate};
use concierge_core::{
    Classifier, ConciergeConfig, ConciergeError, ConciergeInner, Router, ScriptedPort, StepReport,
    WorkflowEngine,
};

fn issue_port() -> ScriptedPort {
    // Render prompts echo the query, so their rule has to come first.
    ScriptedPort::new("")
        .on("Format a helpful", "Your ticket has been created.")
        .on(r#"Query: "Execute create_ticket""#, r#"{"action": "create_ticket"}"#)
        .on(r#"Query: "Execute provide_solution""#, r#"{"action": "general_help"}"#)
}

fn engine_with(port: ScriptedPort, templates: TemplateLoader) -> (Arc<WorkflowEngine>, Arc<Router>) {
    let classifier = Classifier::new(Arc::new(port), Duration::from_secs(2));
    let router = Arc::new(Router::new(classifier, WeatherConfig::default()));
    let engine = WorkflowEngine::new(router.clone(), templates, Arc::new(SessionStore::new()));
    (Arc::new(engine), router)
}

fn email(address: &str) -> HashMap<String, serde_json::Value> {
    HashMap::from([("customer_email".to_string(), serde_json::json!(address))])
}

#[tokio::test]
async fn issue_resolution_runs_to_completion() {
    let (engine, router) = engine_with(issue_port(), TemplateLoader::with_builtins());

    let first = engine
        .start("issue_resolution", "s-1", email("sam@example.com"))
        .await
        .unwrap();
    match first {
        StepReport::StepCompleted { step, result, has_next } => {
            assert_eq!(step, WorkflowStep::new("support", "create_ticket"));
            assert!(result.success);
            assert_eq!(result.reply_text, "Your ticket has been created.");
            assert!(has_next);
        }
        other => panic!("expected a completed step, got {:?}", other),
    }

    let tickets = router.support_tools().unwrap().tickets().await;
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].customer_email, "sam@example.com");
    assert_eq!(tickets[0].description, "Execute create_ticket");

    let status = engine.status("s-1").await.unwrap();
    assert_eq!(status.cursor, 1);
    assert_eq!(status.total_steps, 3);
    assert!((status.progress_percent - 100.0 / 3.0).abs() < 1e-9);
    assert!(!status.completed);

    // No order id in "Execute check_order_status": the order handler asks for one.
    let second = engine.advance("s-1").await.unwrap();
    assert!(matches!(second, StepReport::StepCompleted { has_next: true, .. }));

    let third = engine.advance("s-1").await.unwrap();
    match third {
        StepReport::StepCompleted { step, has_next, .. } => {
            assert_eq!(step.action, "provide_solution");
            assert!(!has_next);
        }
        other => panic!("expected a completed step, got {:?}", other),
    }

    let status = engine.status("s-1").await.unwrap();
    assert!(status.completed);
    assert_eq!(status.progress_percent, 100.0);
    assert_eq!(status.results.len(), 3);
    assert_eq!(status.results[1].handler_name, "Order Agent");
}

#[tokio::test]
async fn advance_on_completed_session_is_idempotent() {
    let (engine, _) = engine_with(issue_port(), TemplateLoader::with_builtins());
    engine.start("issue_resolution", "s-2", HashMap::new()).await.unwrap();
    engine.advance("s-2").await.unwrap();
    engine.advance("s-2").await.unwrap();

    for _ in 0..3 {
        match engine.advance("s-2").await.unwrap() {
            StepReport::Completed { results } => {
                assert_eq!(results.len(), 3);
                assert_eq!(results[0].handler_name, "Support Agent");
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }
    assert_eq!(engine.status("s-2").await.unwrap().results.len(), 3);
}

#[tokio::test]
async fn start_replaces_existing_session() {
    let (engine, _) = engine_with(issue_port(), TemplateLoader::with_builtins());
    engine.start("issue_resolution", "shared", HashMap::new()).await.unwrap();
    engine.advance("shared").await.unwrap();

    engine.start("order_fulfillment", "shared", HashMap::new()).await.unwrap();

    let status = engine.status("shared").await.unwrap();
    assert_eq!(status.template_id, "order_fulfillment");
    assert_eq!(status.cursor, 1);
    assert_eq!(status.results.len(), 1);
    assert_eq!(status.results[0].handler_name, "Product Agent");
    assert_eq!(engine.sessions().len().await, 1);
}

#[tokio::test]
async fn usage_errors_are_reported() {
    let mut templates = TemplateLoader::with_builtins();
    templates.insert(WorkflowTemplate::new(
        "mixed",
        vec![
            WorkflowStep::new("weather", "get_weather"),
            WorkflowStep::new("shipping", "book_courier"),
        ],
    ));
    let (engine, _) = engine_with(ScriptedPort::new(""), templates);

    assert!(matches!(
        engine.start("unknown", "s", HashMap::new()).await,
        Err(ConciergeError::UnknownTemplate(_))
    ));
    assert!(matches!(
        engine.advance("missing").await,
        Err(ConciergeError::SessionNotFound(_))
    ));

    engine.start("mixed", "s", HashMap::new()).await.unwrap();
    let err = engine.advance("s").await.unwrap_err();
    assert_eq!(err.code(), "unknown_handler");

    // The failed step left the session where it was.
    let status = engine.status("s").await.unwrap();
    assert_eq!(status.cursor, 1);
    assert_eq!(status.results.len(), 1);

    engine.sessions().remove("s").await;
    assert!(engine.status("s").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_sessions_advance_concurrently() {
    let (engine, router) = engine_with(issue_port(), TemplateLoader::with_builtins());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("session-{}", i);
            engine.start("issue_resolution", &id, HashMap::new()).await?;
            while !engine.advance(&id).await?.is_completed() {}
            Ok::<_, ConciergeError>(engine.status(&id).await?)
        }));
    }

    for task in tasks {
        let status = task.await.unwrap().unwrap();
        assert!(status.completed);
        assert_eq!(status.results.len(), 3);
    }

    assert_eq!(engine.sessions().len().await, 8);
    assert_eq!(router.support_tools().unwrap().ticket_count().await, 8);

    engine.sessions().clear().await;
    assert!(engine.sessions().is_empty().await);
}

#[tokio::test]
async fn templates_load_from_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("returns.yaml"),
        r#"
id: "returns"
name: "Returns"
steps:
  - handler: "support"
    action: "faq_answer"
"#,
    )
    .unwrap();

    let config = ConciergeConfig {
        workflows: WorkflowConfig {
            template_dir: Some(dir.path().to_string_lossy().to_string()),
        },
        ..ConciergeConfig::default()
    };
    let port = ScriptedPort::new("")
        .on("customer support query", r#"{"action": "faq_answer", "faq_topic": "returns"}"#);
    let concierge = ConciergeInner::new(config, Arc::new(port)).unwrap();

    assert!(concierge.workflows.templates().get("order_fulfillment").is_some());
    let report = concierge
        .workflows
        .start("returns", "r-1", HashMap::new())
        .await
        .unwrap();

    match report {
        StepReport::StepCompleted { result, has_next, .. } => {
            assert!(!has_next);
            assert!(result.success);
            assert!(result.reply_text.contains("30 days"));
        }
        other => panic!("expected a completed step, got {:?}", other),
    }
}
