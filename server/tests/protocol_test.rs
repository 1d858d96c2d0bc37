//! Kiosk wire format and message rendering.

use chrono::{Local, TimeZone};

use netchat_operator::chat::messages::{render_payment, Message, MessageKind, Sender};
use netchat_operator::tcp::protocol::{
    decode, encode, encode_operator, DecodeError, Frame, Payload, BROADCAST_LABEL, REPLY_LABEL,
};

#[test]
fn decodes_heartbeat_and_logout() {
    let hb = decode("PC-01|bob|__HEARTBEAT__").unwrap();
    assert_eq!(hb.pc_name, "PC-01");
    assert_eq!(hb.member, "bob");
    assert_eq!(hb.payload, Payload::Heartbeat);

    let out = decode("PC-01|bob|__LOGOUT_CLEAN__\n").unwrap();
    assert_eq!(out.payload, Payload::CleanLogout);
}

#[test]
fn decodes_payment_fields_positionally() {
    let frame = decode("PC-02|bob|__PAYMENT__|Alice|50000|QRIS").unwrap();
    assert_eq!(
        frame.payload,
        Payload::Payment {
            sender_name: "Alice".to_string(),
            amount: "50000".to_string(),
            method: "QRIS".to_string(),
        }
    );
}

#[test]
fn incomplete_payment_is_rejected() {
    assert_eq!(
        decode("PC-02|bob|__PAYMENT__|Alice|50000"),
        Err(DecodeError::IncompletePayment)
    );
    assert_eq!(
        decode("PC-02|bob|__PAYMENT__"),
        Err(DecodeError::IncompletePayment)
    );
}

#[test]
fn frames_with_too_few_fields_are_rejected() {
    assert_eq!(decode("PC-01|bob"), Err(DecodeError::MissingFields));
    assert_eq!(decode("garbage"), Err(DecodeError::MissingFields));
    assert_eq!(decode(""), Err(DecodeError::MissingFields));
}

#[test]
fn chat_text_is_the_whole_remaining_body() {
    let frame = decode("PC-04|dina|a|b|c").unwrap();
    assert_eq!(
        frame.payload,
        Payload::Chat {
            text: "a|b|c".to_string()
        }
    );
}

#[test]
fn multi_line_chat_is_one_frame() {
    let frame = decode("PC-01|bob|first line\nsecond|part|here\n").unwrap();
    assert_eq!(frame.pc_name, "PC-01");
    assert_eq!(frame.member, "bob");
    assert_eq!(
        frame.payload,
        Payload::Chat {
            text: "first line\nsecond|part|here".to_string()
        }
    );
}

#[test]
fn reserved_token_prefix_wins_over_chat() {
    // The delimiter is not escaped: chat that starts with a reserved token
    // is read as that frame type.
    let frame = decode("PC-04|dina|__HEARTBEAT__|not really").unwrap();
    assert_eq!(frame.payload, Payload::Heartbeat);
}

#[test]
fn operator_frames_carry_origin_and_label() {
    assert_eq!(encode_operator(REPLY_LABEL, "hello"), "OPERATOR|Admin|hello");
    assert_eq!(
        encode_operator(BROADCAST_LABEL, "Hi all"),
        "OPERATOR|Broadcast|Hi all"
    );
}

#[test]
fn kiosk_encoding_matches_decoder() {
    let frame = Frame {
        pc_name: "PC-09".to_string(),
        member: "erin".to_string(),
        payload: Payload::Payment {
            sender_name: "Erin".to_string(),
            amount: "15000".to_string(),
            method: "DANA".to_string(),
        },
    };
    let wire = encode(&frame);
    assert_eq!(wire, "PC-09|erin|__PAYMENT__|Erin|15000|DANA");
    assert_eq!(decode(&wire).unwrap(), frame);
}

#[test]
fn payment_renders_confirmation_and_plain_summary() {
    let at = Local.with_ymd_and_hms(2025, 7, 19, 9, 5, 0).single().unwrap();
    let msg = Message::payment("Alice", "50000", "QRIS", at);
    assert_eq!(msg.content, render_payment("Alice", "50000", "QRIS"));
    assert_eq!(msg.kind, MessageKind::Payment);
    assert_eq!(msg.sender, Sender::Client);
    assert_eq!(
        msg.summary(),
        "Konfirmasi Pembayaran | Nama: Alice | Jumlah: Rp 50000 | ID: QRIS"
    );
}

#[test]
fn shutdown_notice_uses_hours_and_minutes() {
    let at = Local.with_ymd_and_hms(2025, 7, 19, 9, 5, 42).single().unwrap();
    let msg = Message::shutdown_notice(at);
    assert_eq!(msg.content, "Klien Shutdown Paksa di Jam 09:05");
    assert_eq!(msg.sender, Sender::System);
    assert_eq!(msg.kind, MessageKind::Shutdown);
}

#[test]
fn long_summaries_are_truncated() {
    let at = Local.with_ymd_and_hms(2025, 7, 19, 9, 5, 0).single().unwrap();
    let msg = Message::client_chat("x".repeat(200), at);
    let summary = msg.summary();
    assert_eq!(summary.chars().count(), 81);
    assert!(summary.ends_with('…'));
}
