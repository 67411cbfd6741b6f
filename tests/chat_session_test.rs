use echomeet::session::SessionBootstrapper;
use echomeet::test_utils::{
    FakeChatBackend, FakeVideoBackend, RecordingNavigator, RecordingNotifier, StaticTokenProvider,
};
use echomeet::{SessionError, UserId};
use meetcore::link::CallLink;
use meetcore::types::{AuthenticatedUser, Counterpart, Notification};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn uid(s: &str) -> UserId {
    s.parse().unwrap()
}

fn bootstrapper(
    me: &str,
    tokens: Arc<StaticTokenProvider>,
    chat: Arc<FakeChatBackend>,
    notifier: Arc<RecordingNotifier>,
) -> SessionBootstrapper {
    let _ = env_logger::builder().is_test(true).try_init();
    SessionBootstrapper::builder()
        .with_user(AuthenticatedUser::new(uid(me), "Test User"))
        .with_api_key("api-key")
        .with_token_provider(tokens)
        .with_chat_backend(chat)
        .with_video_backend(Arc::new(FakeVideoBackend::default()))
        .with_notifier(notifier)
        .with_navigator(Arc::new(RecordingNavigator::default()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn both_participants_open_the_same_channel() {
    let chat = Arc::new(FakeChatBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = Arc::new(StaticTokenProvider::new("t"));

    let alice = bootstrapper("u42", tokens.clone(), chat.clone(), notifier.clone());
    let bob = bootstrapper("u7", tokens.clone(), chat.clone(), notifier.clone());

    let a = alice.open_chat(uid("u7")).await.unwrap();
    let b = bob.open_chat(uid("u42")).await.unwrap();

    assert_eq!(a.session_id(), b.session_id());
    assert_eq!(a.session_id().as_str(), "u42-u7");
    assert_eq!(chat.channel_count(), 1);
    assert_eq!(a.counterpart(), &Counterpart::Known(uid("u7")));
    assert_eq!(b.counterpart(), &Counterpart::Known(uid("u42")));

    let channel = chat.channel_by_id("u42-u7").unwrap();
    assert!(channel.is_watched());
    assert_eq!(channel.members(), &[uid("u42"), uid("u7")]);
    assert_eq!(
        chat.connections(),
        vec![(uid("u42"), "t".to_string()), (uid("u7"), "t".to_string())]
    );
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn call_invite_link_points_at_the_conversation() {
    let chat = Arc::new(FakeChatBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let boot = bootstrapper(
        "u42",
        Arc::new(StaticTokenProvider::new("t")),
        chat.clone(),
        notifier.clone(),
    );

    let session = boot.open_chat(uid("u7")).await.unwrap();
    let link = session
        .send_call_invite("https://meet.example/")
        .await
        .unwrap();

    assert_eq!(
        link.to_string(),
        "https://meet.example/call/u42-u7?targetUserId=u7"
    );
    let messages = chat.channel_by_id("u42-u7").unwrap().messages();
    assert_eq!(
        messages,
        vec![
            "I've started a video call. Join me here: https://meet.example/call/u42-u7?targetUserId=u7"
                .to_string()
        ]
    );
    assert_eq!(
        notifier.notifications(),
        vec![Notification::success("Video call link sent successfully!")]
    );

    // The receiver joins through the same link.
    let parsed = CallLink::parse(&link.to_string()).unwrap();
    assert_eq!(parsed, link);
}

#[tokio::test]
async fn failed_invite_is_reported() {
    let chat = Arc::new(FakeChatBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let boot = bootstrapper(
        "u42",
        Arc::new(StaticTokenProvider::new("t")),
        chat.clone(),
        notifier.clone(),
    );

    let session = boot.open_chat(uid("u7")).await.unwrap();
    chat.channel_by_id("u42-u7")
        .unwrap()
        .fail_send
        .store(true, Ordering::SeqCst);

    let err = session.send_call_invite("https://meet.example").await.unwrap_err();
    assert!(matches!(err, SessionError::Connection(_)));
    assert_eq!(
        notifier.notifications(),
        vec![Notification::error(
            "Could not send the video call link. Please try again."
        )]
    );
}

#[tokio::test]
async fn chat_connection_failure_notifies() {
    let chat = Arc::new(FakeChatBackend::default());
    chat.fail_connect.store(true, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());
    let boot = bootstrapper(
        "u42",
        Arc::new(StaticTokenProvider::new("t")),
        chat.clone(),
        notifier.clone(),
    );

    let err = boot.open_chat(uid("u7")).await.unwrap_err();
    assert!(matches!(err, SessionError::Connection(_)));
    assert_eq!(chat.channel_count(), 0);
    assert_eq!(
        notifier.notifications(),
        vec![Notification::error(
            "Could not connect to chat. Please try again."
        )]
    );
}

#[tokio::test]
async fn token_failure_is_a_connection_error() {
    let chat = Arc::new(FakeChatBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = Arc::new(StaticTokenProvider::failing());
    let boot = bootstrapper("u42", tokens.clone(), chat.clone(), notifier.clone());

    assert!(matches!(
        boot.open_chat(uid("u7")).await,
        Err(SessionError::Connection(_))
    ));
    assert!(chat.connections().is_empty());
    assert_eq!(tokens.fetches(), 1);
}

#[tokio::test]
async fn chat_with_self_has_no_counterpart() {
    let chat = Arc::new(FakeChatBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let boot = bootstrapper(
        "u42",
        Arc::new(StaticTokenProvider::new("t")),
        chat.clone(),
        notifier.clone(),
    );

    let session = boot.open_chat(uid("u42")).await.unwrap();
    assert_eq!(session.session_id().as_str(), "u42-u42");
    assert_eq!(session.counterpart(), &Counterpart::Unknown);
}
