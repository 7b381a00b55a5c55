//! End-to-end: controller + router + SDK against a scripted IRC server on
//! loopback TCP.

use std::time::Duration;

use ircpanel_core::{
    Category, ConnectError, ConsoleOrder, Panel, SdkConnector, SessionController, SessionState,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(5);

async fn wait_until(panel: &Panel, what: &str, check: impl Fn(&Panel) -> bool) {
    timeout(LIMIT, async {
        while !check(panel) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

fn has_line(panel: &Panel, text: &str, category: Category) -> bool {
    panel
        .lock()
        .console
        .lines()
        .any(|l| l.text == text && l.category == category)
}

#[tokio::test]
async fn chat_round_trip_with_nick_fallback() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut seen = Vec::new();

        macro_rules! expect {
            () => {{
                let line = timeout(LIMIT, lines.next_line())
                    .await
                    .expect("client went quiet")
                    .unwrap()
                    .expect("client hung up");
                seen.push(line.clone());
                line
            }};
        }
        macro_rules! reply {
            ($line:expr) => {
                write
                    .write_all(format!("{}\r\n", $line).as_bytes())
                    .await
                    .unwrap()
            };
        }

        assert_eq!(expect!(), "NICK bob");
        assert!(expect!().starts_with("USER "));
        reply!(":irc.test 433 * bob :Nickname is already in use");
        assert_eq!(expect!(), "NICK bob_2");
        reply!(":irc.test 001 bob_2 :Welcome to the test network");
        reply!(":irc.test 375 bob_2 :- irc.test Message of the day -");

        assert_eq!(expect!(), "JOIN #rust");
        reply!(":bob_2!u@localhost JOIN #rust");
        reply!(":alice!a@localhost PRIVMSG #rust :hi bob");

        assert_eq!(expect!(), "PRIVMSG #rust :hello alice");
        assert_eq!(expect!(), "QUIT :User has disconnected.");
        seen
    });

    let panel = Panel::new(ConsoleOrder::OldestFirst);
    let mut ctl = SessionController::new(SdkConnector::default(), panel.clone());
    ctl.connect("bob", &addr, "rust").await.unwrap();

    wait_until(&panel, "join", |p| p.session_state() == SessionState::Joined).await;
    wait_until(&panel, "alice's message", |p| {
        has_line(p, "<alice>: hi bob", Category::ChatMessage)
    })
    .await;
    assert!(panel
        .lock()
        .console
        .lines()
        .any(|l| l.category == Category::Error && l.text.contains("375")));

    ctl.submit_message("hello alice").await.unwrap();
    assert!(has_line(&panel, "<bob_2>: hello alice", Category::SelfEcho));

    ctl.disconnect().await.unwrap();
    assert_eq!(panel.session_state(), SessionState::Disconnected);

    let seen = timeout(LIMIT, server).await.unwrap().unwrap();
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn refused_connection_surfaces_connect_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let panel = Panel::new(ConsoleOrder::OldestFirst);
    let mut ctl = SessionController::new(SdkConnector::default(), panel.clone());
    let err = ctl.connect("bob", &addr, "rust").await.unwrap_err();

    assert!(matches!(err, ConnectError::Connection { .. }));
    assert_eq!(panel.session_state(), SessionState::Disconnected);
    let guard = panel.lock();
    let line = guard.console.latest().unwrap();
    assert_eq!(line.category, Category::Error);
    assert!(line.text.starts_with("> Connection failed"));
}

#[tokio::test]
async fn latin1_chat_keeps_the_session_joined() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        macro_rules! next {
            () => {
                timeout(LIMIT, lines.next_line())
                    .await
                    .expect("client went quiet")
                    .unwrap()
                    .expect("client hung up")
            };
        }

        assert_eq!(next!(), "NICK bob");
        next!(); // USER
        write
            .write_all(b":irc.test 001 bob :Welcome\r\n")
            .await
            .unwrap();
        assert_eq!(next!(), "JOIN #rust");
        write
            .write_all(b":bob!u@localhost JOIN #rust\r\n")
            .await
            .unwrap();
        write
            .write_all(b":alice!a@localhost PRIVMSG #rust :caf\xe9\r\n")
            .await
            .unwrap();
        write
            .write_all(b":alice!a@localhost PRIVMSG #rust :still there?\r\n")
            .await
            .unwrap();
        assert_eq!(next!(), "QUIT :User has disconnected.");
    });

    let panel = Panel::new(ConsoleOrder::OldestFirst);
    let mut ctl = SessionController::new(SdkConnector::default(), panel.clone());
    ctl.connect("bob", &addr, "rust").await.unwrap();

    wait_until(&panel, "the message after the latin-1 one", |p| {
        has_line(p, "<alice>: still there?", Category::ChatMessage)
    })
    .await;
    assert!(has_line(&panel, "<alice>: caf\u{FFFD}", Category::ChatMessage));
    assert_eq!(panel.session_state(), SessionState::Joined);

    ctl.disconnect().await.unwrap();
    timeout(LIMIT, server).await.unwrap().unwrap();
}
