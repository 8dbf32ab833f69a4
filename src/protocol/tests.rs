// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::WireConfig;
use crate::core::buffer::{Bufferable, ReadCursor, WriteCursor};
use crate::core::codec::{Opcode, Packet, PacketCodec};
use crate::error::{Result, WireError};
use crate::protocol::dispatcher::{Context, Dispatcher};
use crate::protocol::registry::OpcodeRegistry;
use crate::protocol::sender::PacketSender;
use crate::protocol::Protocol;
use crate::ConnectionId;

#[derive(Debug, PartialEq)]
enum LobbyPacket {
    Login { name: String },
    Welcome { motd: Option<String> },
    Chat { text: String },
}

impl Packet for LobbyPacket {
    fn opcode(&self) -> Opcode {
        match self {
            LobbyPacket::Login { .. } => 0,
            LobbyPacket::Welcome { .. } => 1,
            LobbyPacket::Chat { .. } => 2,
        }
    }

    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        match self {
            LobbyPacket::Login { name } => name.save(out),
            LobbyPacket::Welcome { motd } => motd.save(out),
            LobbyPacket::Chat { text } => text.save(out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Session {
    PreLogin,
    InGame,
}

fn registry() -> OpcodeRegistry<LobbyPacket> {
    OpcodeRegistry::builder()
        .register(0, "Login", |cur: &mut ReadCursor<'_>| {
            Ok(LobbyPacket::Login {
                name: String::restore(cur)?,
            })
        })
        .register(1, "Welcome", |cur: &mut ReadCursor<'_>| {
            Ok(LobbyPacket::Welcome {
                motd: Option::<String>::restore(cur)?,
            })
        })
        .register(2, "Chat", |cur: &mut ReadCursor<'_>| {
            Ok(LobbyPacket::Chat {
                text: String::restore(cur)?,
            })
        })
        .build()
        .expect("registry should build")
}

fn dispatcher() -> Dispatcher<LobbyPacket, Session> {
    Dispatcher::builder()
        .on(0, Session::PreLogin, |packet: &LobbyPacket, cx| {
            let LobbyPacket::Login { name } = packet else {
                panic!("route/opcode mismatch");
            };
            cx.set_state(Session::InGame);
            cx.sender()
                .send(LobbyPacket::Welcome {
                    motd: Some(format!("hello {name}")),
                })?
                .send(LobbyPacket::Chat {
                    text: "server of record".into(),
                })?;
            Ok(())
        })
        .on(2, Session::InGame, |packet: &LobbyPacket, cx| {
            let LobbyPacket::Chat { text } = packet else {
                panic!("route/opcode mismatch");
            };
            cx.sender().send(LobbyPacket::Chat {
                text: text.to_uppercase(),
            })?;
            Ok(())
        })
        .build()
        .expect("dispatcher should build")
}

#[tokio::test]
async fn decode_dispatch_send_full_cycle() {
    let codec = PacketCodec::new(Arc::new(registry()));
    let table = dispatcher();

    let (tx, mut rx) = mpsc::channel(8);
    let sender = PacketSender::new(ConnectionId::next(), tx);
    let mut state = Session::PreLogin;

    // Peer sends Login("rhea") as a frame body.
    let frame = codec
        .encode(&LobbyPacket::Login {
            name: "rhea".into(),
        })
        .unwrap();
    let packet = codec.decode(&frame).unwrap();

    let mut cx = Context::new(sender.connection(), &mut state, &sender);
    table.dispatch(&packet, &mut cx).unwrap();

    assert_eq!(state, Session::InGame);
    assert_eq!(
        rx.recv().await.unwrap(),
        LobbyPacket::Welcome {
            motd: Some("hello rhea".into())
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        LobbyPacket::Chat {
            text: "server of record".into()
        }
    );
}

#[tokio::test]
async fn chat_before_login_is_dropped() {
    let codec = PacketCodec::new(Arc::new(registry()));
    let table = dispatcher();

    let (tx, mut rx) = mpsc::channel(8);
    let sender = PacketSender::new(ConnectionId::next(), tx);
    let mut state = Session::PreLogin;

    let frame = codec
        .encode(&LobbyPacket::Chat { text: "hi".into() })
        .unwrap();
    let packet = codec.decode(&frame).unwrap();

    let mut cx = Context::new(sender.connection(), &mut state, &sender);
    table.dispatch(&packet, &mut cx).unwrap();

    // Still pre-login, nothing echoed.
    assert_eq!(state, Session::PreLogin);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn handler_error_does_not_poison_later_dispatch() {
    let table = Dispatcher::builder()
        .on(2, Session::InGame, |packet: &LobbyPacket, cx| {
            let LobbyPacket::Chat { text } = packet else {
                panic!("route/opcode mismatch");
            };
            if text.is_empty() {
                return Err(WireError::malformed(0, "empty chat line"));
            }
            cx.sender().send(LobbyPacket::Chat { text: text.clone() })?;
            Ok(())
        })
        .build()
        .unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let sender = PacketSender::new(ConnectionId::next(), tx);
    let mut state = Session::InGame;
    let mut cx = Context::new(sender.connection(), &mut state, &sender);

    let err = table
        .dispatch(&LobbyPacket::Chat { text: String::new() }, &mut cx)
        .unwrap_err();
    assert!(!err.is_fatal());

    table
        .dispatch(&LobbyPacket::Chat { text: "ok".into() }, &mut cx)
        .unwrap();
    assert_eq!(rx.recv().await.unwrap(), LobbyPacket::Chat { text: "ok".into() });
}

#[test]
fn protocol_rejects_invalid_wire_settings() {
    let wire = WireConfig {
        max_frame_len: 1,
        ..WireConfig::default()
    };

    let err = Protocol::new(registry(), dispatcher(), Session::PreLogin, wire).unwrap_err();
    assert!(matches!(err, WireError::Misconfiguration(_)));
}

#[test]
fn protocol_exposes_its_parts() {
    let protocol = Protocol::new(
        registry(),
        dispatcher(),
        Session::PreLogin,
        WireConfig::default(),
    )
    .unwrap();

    assert_eq!(protocol.initial_state(), Session::PreLogin);
    assert_eq!(protocol.codec().registry().len(), 3);
    assert_eq!(protocol.dispatcher().len(), 2);
}
