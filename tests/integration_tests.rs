//! Integration tests for the echarlar session core.
//! These tests drive the public API only, against an in-process transport and
//! against a real TCP server on a loopback port.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};
    use tokio_util::codec::{Framed, LinesCodec};

    use echarlar::chat::ChatConfig;
    use echarlar::{
        Author, MessageExchanger, SessionManager, SessionStatus, TcpTransport, Transport,
        TransportError,
    };

    /// Replies from a fixed script; handshakes fail while `refusals` remain.
    #[derive(Default)]
    struct Script {
        refusals: AtomicUsize,
        handshakes: AtomicUsize,
        replies: Mutex<VecDeque<Result<String, TransportError>>>,
    }

    impl Script {
        fn replying(replies: &[&str]) -> Self {
            let script = Self::default();
            script
                .replies
                .lock()
                .unwrap()
                .extend(replies.iter().map(|r| Ok(r.to_string())));
            script
        }
    }

    #[async_trait::async_trait]
    impl Transport for Script {
        async fn handshake(&self) -> Result<(), TransportError> {
            self.handshakes.fetch_add(1, Ordering::SeqCst);
            let refused = self
                .refusals
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                Err(TransportError::closed("connection refused"))
            } else {
                Ok(())
            }
        }

        async fn round_trip(&self, _: &str) -> Result<String, TransportError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::closed("script exhausted")))
        }
    }

    fn pairs<T: Transport>(exchanger: &MessageExchanger<T>) -> Vec<(Author, String)> {
        exchanger
            .transcript()
            .iter()
            .map(|entry| (entry.author, entry.text.clone()))
            .collect()
    }

    #[tokio::test]
    async fn connect_then_hello() {
        let session = Arc::new(SessionManager::new(Script::replying(&["hi there"])));
        let exchanger = MessageExchanger::new(Arc::clone(&session));
        assert_eq!(session.status(), SessionStatus::Idle);

        assert_ok!(session.connect().await);
        assert_eq!(session.status(), SessionStatus::Connected);

        let reply = assert_ok!(exchanger.send("hello").await);
        assert_eq!(reply, "hi there");
        assert_eq!(
            pairs(&exchanger),
            vec![
                (Author::Local, "hello".to_string()),
                (Author::Remote, "hi there".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn send_while_idle_is_not_connected() {
        let session = Arc::new(SessionManager::new(Script::replying(&["unused"])));
        let exchanger = MessageExchanger::new(session);

        let err = assert_err!(exchanger.send("x").await);
        assert!(err.is_not_connected());
        assert!(exchanger.transcript().is_empty());
    }

    #[tokio::test]
    async fn failed_connect_then_retry_unblocks_sends() {
        let script = Script::replying(&["pong"]);
        script.refusals.store(1, Ordering::SeqCst);
        let session = Arc::new(SessionManager::new(script));
        let exchanger = MessageExchanger::new(Arc::clone(&session));

        assert!(session.connect().await.unwrap_err().is_handshake());
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(exchanger.send("x").await.unwrap_err().is_not_connected());
        assert!(exchanger.is_empty());

        session.connect().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(exchanger.send("ping").await.unwrap(), "pong");
    }

    #[tokio::test]
    async fn repeated_connect_handshakes_once() {
        let script = Arc::new(Script::default());
        let session = SessionManager::new(Arc::clone(&script));
        session.connect().await.unwrap();
        session.connect().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(script.handshakes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_never_split_pairs() {
        let script = Script::default();
        script.replies.lock().unwrap().extend([
            Ok("r1".to_string()),
            Err(TransportError::codec("garbled", None)),
            Ok("r3".to_string()),
        ]);
        let session = Arc::new(SessionManager::new(script));
        let exchanger = MessageExchanger::new(Arc::clone(&session));
        session.connect().await.unwrap();

        exchanger.send("m1").await.unwrap();
        let err = assert_err!(exchanger.send("m2").await);
        assert_eq!(err.unsent_text(), Some("m2"));
        exchanger.send("m3").await.unwrap();

        assert_eq!(
            pairs(&exchanger),
            vec![
                (Author::Local, "m1".to_string()),
                (Author::Remote, "r1".to_string()),
                (Author::Local, "m3".to_string()),
                (Author::Remote, "r3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn tcp_session_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LinesCodec::new());
            framed.send("Enter your username: ").await.unwrap();
            while let Some(Ok(line)) = framed.next().await {
                framed.send(line.to_uppercase()).await.unwrap();
            }
        });

        let config = ChatConfig::new().with_port(port).with_greeting(true);
        let session = Arc::new(SessionManager::new(config.transport()));
        let exchanger = MessageExchanger::new(Arc::clone(&session));

        session.connect().await.unwrap();
        assert_eq!(exchanger.send("kursat").await.unwrap(), "KURSAT");
        assert_eq!(exchanger.send("hello").await.unwrap(), "HELLO");
        assert_eq!(exchanger.transcript().len(), 4);

        exchanger.reset().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(exchanger.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn tcp_server_gone_fails_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let session = Arc::new(SessionManager::new(TcpTransport::new("127.0.0.1", port)));
        let exchanger = MessageExchanger::new(Arc::clone(&session));
        session.connect().await.unwrap();
        server.await.unwrap();

        let err = exchanger.send("anyone there?").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.unsent_text(), Some("anyone there?"));
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(exchanger.is_empty());
    }

    #[tokio::test]
    async fn tcp_oversized_reply_keeps_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LinesCodec::new());
            let _ = framed.next().await;
            framed.send("y".repeat(64)).await.unwrap();
            let mut received = Vec::new();
            while let Some(Ok(line)) = framed.next().await {
                framed.send(line.to_uppercase()).await.unwrap();
                received.push(line);
            }
            received
        });

        let config = ChatConfig::new()
            .with_port(port)
            .with_max_line_length(16);
        let session = Arc::new(SessionManager::new(config.transport()));
        let exchanger = MessageExchanger::new(Arc::clone(&session));
        assert_ok!(session.connect().await);

        let err = assert_err!(exchanger.send("first").await);
        assert_eq!(err.unsent_text(), Some("first"));
        assert_eq!(session.status(), SessionStatus::Connected);
        assert!(exchanger.is_empty());

        let reply = assert_ok!(exchanger.send("second").await);
        assert_eq!(reply, "SECOND");
        assert_eq!(
            pairs(&exchanger),
            vec![
                (Author::Local, "second".to_string()),
                (Author::Remote, "SECOND".to_string()),
            ]
        );

        assert_ok!(session.disconnect().await);
        assert_eq!(server.await.unwrap(), vec!["second"]);
    }

    #[tokio::test]
    async fn tcp_connect_refused_is_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let session = SessionManager::new(TcpTransport::new("127.0.0.1", port));
        let err = session.connect().await.unwrap_err();
        assert!(err.is_handshake());
        assert_eq!(session.status(), SessionStatus::Failed);
    }
}
