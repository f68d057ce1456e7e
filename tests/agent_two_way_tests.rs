use mailbox_agent::{Agent, AgentStatus, Ask, CancellationToken, Error, Tell};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{ASK_TIMEOUT, ConcurrencyProbe, Rejected};

fn running_total() -> mailbox_agent::AgentHandle<i64, i64, i64> {
    Agent::start_two_way(
        0i64,
        |state, m: i64| Ok::<_, Infallible>((state + m, state)),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn test_ask_returns_previous_state_and_advances() {
    let agent = running_total();

    assert_eq!(agent.ask(5, ASK_TIMEOUT).await.unwrap(), 0);
    assert_eq!(agent.ask(3, ASK_TIMEOUT).await.unwrap(), 5);
    assert_eq!(agent.snapshot(ASK_TIMEOUT).await.unwrap(), 8);
}

#[rstest]
#[case(vec![1, 2, 3], vec![0, 1, 3], 6)]
#[case(vec![10, -4, 7, 0], vec![0, 10, 6, 13], 13)]
#[case(vec![], vec![], 0)]
#[tokio::test]
async fn test_replies_follow_fold_order(
    #[case] messages: Vec<i64>,
    #[case] expected_replies: Vec<i64>,
    #[case] expected_state: i64,
) {
    let agent = running_total();

    let mut replies = Vec::new();
    for m in messages {
        replies.push(agent.ask(m, ASK_TIMEOUT).await.unwrap());
    }

    assert_eq!(replies, expected_replies);
    assert_eq!(agent.snapshot(ASK_TIMEOUT).await.unwrap(), expected_state);
}

#[tokio::test]
async fn test_tell_and_ask_share_one_queue() {
    let agent = running_total();

    agent.tell(2).unwrap();
    agent.tell(2).unwrap();
    assert_eq!(agent.ask(1, ASK_TIMEOUT).await.unwrap(), 4);
}

#[test_log::test(tokio::test)]
async fn test_failed_transition_resolves_ask_then_faults() {
    let agent = Agent::start_two_way(
        0usize,
        |handled, message: &'static str| {
            if message == "bad" {
                Err(Rejected(message.to_string()))
            } else {
                Ok((handled + 1, message.len()))
            }
        },
        CancellationToken::new(),
    );

    assert_eq!(agent.ask("good", ASK_TIMEOUT).await.unwrap(), 4);

    let err = agent.ask("bad", ASK_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Transition(_)));
    assert!(err.to_string().contains("rejected message: bad"));

    let err = agent.ask("good", ASK_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Faulted { .. }));
    assert!(err.is_terminal());

    // The failing message did not advance the state.
    assert_eq!(agent.snapshot(ASK_TIMEOUT).await.unwrap(), 1);
}

#[tokio::test]
async fn test_asks_queued_behind_a_failure_resolve_with_fault() {
    let agent = Agent::start_two_way_async(
        (),
        |(), message: &'static str| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if message == "bad" {
                Err(Rejected(message.to_string()))
            } else {
                Ok(((), message))
            }
        },
        CancellationToken::new(),
    );

    let (bad, after_one, after_two) = tokio::join!(
        agent.ask("bad", ASK_TIMEOUT),
        agent.ask("good", ASK_TIMEOUT),
        agent.ask("also good", ASK_TIMEOUT),
    );

    assert!(matches!(bad, Err(Error::Transition(_))));
    assert!(matches!(after_one, Err(Error::Faulted { .. })));
    assert!(matches!(after_two, Err(Error::Faulted { .. })));
}

#[tokio::test]
async fn test_panicking_transition_is_a_transition_failure() {
    let agent = Agent::start_two_way(
        0u32,
        |state, divisor: u32| {
            if divisor == 0 {
                panic!("division by zero");
            }
            Ok::<_, Infallible>((state + 100 / divisor, state))
        },
        CancellationToken::new(),
    );

    assert_eq!(agent.ask(4, ASK_TIMEOUT).await.unwrap(), 0);

    let err = agent.ask(0, ASK_TIMEOUT).await.unwrap_err();
    assert!(err.to_string().contains("division by zero"));
    assert!(matches!(agent.status(), AgentStatus::Faulted { .. }));
    assert_eq!(agent.snapshot(ASK_TIMEOUT).await.unwrap(), 25);
}

#[tokio::test]
async fn test_timeout_only_affects_the_waiting_caller() {
    let agent = Agent::start_two_way_async(
        0u32,
        |state, _: ()| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, Infallible>((state + 1, state + 1))
        },
        CancellationToken::new(),
    );

    let err = agent.ask((), Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(agent.status(), AgentStatus::Running);

    // The timed-out message still gets processed, in order.
    assert_eq!(agent.ask((), ASK_TIMEOUT).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_asks_get_distinct_replies() {
    let probe = ConcurrencyProbe::new();
    let transition_probe = probe.clone();
    let agent = Agent::start_two_way_async(
        0u32,
        move |ticket, _: ()| {
            let probe = transition_probe.clone();
            async move {
                let _guard = probe.enter();
                tokio::task::yield_now().await;
                Ok::<_, Infallible>((ticket + 1, ticket))
            }
        },
        CancellationToken::new(),
    );

    let mut callers = Vec::new();
    for _ in 0..50 {
        let agent = agent.clone();
        callers.push(tokio::spawn(async move { agent.ask((), ASK_TIMEOUT).await.unwrap() }));
    }

    let mut tickets = Vec::new();
    for caller in callers {
        tickets.push(caller.await.unwrap());
    }
    tickets.sort_unstable();

    assert_eq!(tickets, (0..50).collect::<Vec<_>>());
    assert_eq!(probe.max_concurrent(), 1);
}

#[tokio::test]
async fn test_handles_usable_through_traits() {
    let agent = running_total();
    let teller: Arc<dyn Tell<i64>> = Arc::new(agent.clone());
    let asker: Arc<dyn Ask<i64, Reply = i64>> = Arc::new(agent.clone());

    teller.tell(7).unwrap();
    assert_eq!(asker.ask(1, ASK_TIMEOUT).await.unwrap(), 7);
    assert_eq!(agent.snapshot(ASK_TIMEOUT).await.unwrap(), 8);
}
