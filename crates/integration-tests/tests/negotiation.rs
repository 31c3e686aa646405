mod harness;

use std::time::Duration;

use chorus_config::ProviderKind;
use chorus_llm::{GenerationSettings, LlmError, Message, ReasoningEffort, TurnRequest, TurnStatus};
use harness::mock_vendor::{MockVendor, PLAIN_ANSWER, Reply};
use harness::targets::{drain, session, transport};

fn request(effort: ReasoningEffort) -> TurnRequest {
    TurnRequest::new(
        vec![Message::user("hello")],
        GenerationSettings::default().with_reasoning_effort(effort),
    )
}

#[tokio::test]
async fn rejected_reasoning_effort_is_retried_without_it() {
    let vendor = MockVendor::start(Reply::RejectReasoning).await.unwrap();
    let session = session("compat", ProviderKind::OpenaiCompatible, &vendor, transport(Duration::from_secs(10)));

    let (deltas, outcome) = drain(session.start(request(ReasoningEffort::High))).await;

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.text, PLAIN_ANSWER);
    assert_eq!(deltas.iter().filter(|d| d.is_final).count(), 1);

    let requests = vendor.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["reasoning_effort"], "high");
    assert!(requests[1].get("reasoning_effort").is_none());
}

#[tokio::test]
async fn rejected_thinking_is_retried_without_it() {
    let vendor = MockVendor::start(Reply::RejectReasoning).await.unwrap();
    let session = session("claude", ProviderKind::Anthropic, &vendor, transport(Duration::from_secs(10)));

    let (_, outcome) = drain(session.start(request(ReasoningEffort::Low))).await;

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.text, PLAIN_ANSWER);

    let requests = vendor.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("thinking").is_some());
    assert!(requests[1].get("thinking").is_none());
}

#[tokio::test]
async fn no_retry_when_reasoning_was_not_requested() {
    let vendor = MockVendor::start(Reply::Unauthorized).await.unwrap();
    let session = session("compat", ProviderKind::OpenaiCompatible, &vendor, transport(Duration::from_secs(10)));

    let (_, outcome) = drain(session.start(request(ReasoningEffort::High))).await;

    assert!(matches!(outcome.status, TurnStatus::Failed(LlmError::Unauthorized { .. })));
    assert_eq!(vendor.requests().len(), 1);
}
