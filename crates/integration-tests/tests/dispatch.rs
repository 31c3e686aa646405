mod harness;

use std::time::Duration;

use chorus_config::ProviderKind;
use chorus_llm::{Dispatcher, GenerationSettings, LlmError, Message, ResponseMode};
use harness::mock_vendor::{MockVendor, Reply, STALL_FRAGMENT};
use harness::targets::{session, transport};

fn history() -> Vec<Message> {
    vec![Message::user("introduce yourself")]
}

#[tokio::test]
async fn one_timed_out_target_leaves_the_others_intact() {
    let first = MockVendor::start(Reply::text(&["first ", "answer"])).await.unwrap();
    let slow = MockVendor::start(Reply::Slow(Duration::from_secs(30))).await.unwrap();
    let third = MockVendor::start(Reply::text(&["third ", "answer"])).await.unwrap();
    let http = transport(Duration::from_millis(500));

    let dispatcher = Dispatcher::new(vec![
        session("one", ProviderKind::OpenaiCompatible, &first, http.clone()),
        session("two", ProviderKind::OpenaiCompatible, &slow, http.clone()),
        session("three", ProviderKind::Anthropic, &third, http),
    ])
    .unwrap();

    let results = dispatcher
        .dispatch(history(), GenerationSettings::default(), ResponseMode::Auto)
        .join()
        .await;

    assert_eq!(results.len(), 3);
    let labels: Vec<_> = results.iter().map(|r| r.provider_label.as_str()).collect();
    assert_eq!(labels, ["one", "two", "three"]);
    assert!(results.iter().all(|r| r.is_complete));

    assert_eq!(results[0].error, None);
    assert_eq!(results[0].text, "first answer");
    assert!(matches!(results[1].error, Some(LlmError::RequestFailed(_))), "{:?}", results[1].error);
    assert!(results[1].text.is_empty());
    assert_eq!(results[2].error, None);
    assert_eq!(results[2].text, "third answer");
}

#[tokio::test]
async fn cancel_all_stops_stalled_targets() {
    let quick = MockVendor::start(Reply::text(&["done"])).await.unwrap();
    let stalled = MockVendor::start(Reply::Stall).await.unwrap();
    let http = transport(Duration::from_secs(30));

    let dispatcher = Dispatcher::new(vec![
        session("quick", ProviderKind::OpenaiCompatible, &quick, http.clone()),
        session("stalled", ProviderKind::OpenaiCompatible, &stalled, http),
    ])
    .unwrap();
    let mut dispatch = dispatcher.dispatch(history(), GenerationSettings::default(), ResponseMode::Stream);

    let mut quick_done = false;
    let mut stalled_started = false;
    while !(quick_done && stalled_started) {
        let (index, delta) = dispatch.next_progress().await.unwrap();
        quick_done |= index == 0 && delta.is_final;
        stalled_started |= index == 1;
    }

    dispatch.cancel_all();
    let results = tokio::time::timeout(Duration::from_secs(5), dispatch.join()).await.unwrap();

    assert_eq!(results[0].text, "done");
    assert!(!results[0].cancelled);
    assert_eq!(results[0].error, None);

    assert!(results[1].cancelled);
    assert_eq!(results[1].error, None);
    assert_eq!(results[1].text, STALL_FRAGMENT);
    assert!(results.iter().all(|r| r.is_complete));
}

#[test]
fn empty_target_list_is_refused() {
    let Err(error) = Dispatcher::new(Vec::new()) else {
        panic!("empty target list accepted");
    };
    assert!(matches!(error, LlmError::NoApiService(_)));
}
