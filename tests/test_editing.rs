//! Input editing and terminal behavior tests.
//!
//! Tests backspace, word and line erasure, Ctrl-C, context help and hidden
//! fields through the ECMA-48 layer.

#[allow(clippy::duplicate_mod)]
#[path = "helpers.rs"]
mod helpers;

use clink::{Callbacks, DecodeError, Error, IoMode, MinimalConfig, Output, Peer, ReadState, Tree};
use helpers::fixtures::{self, MockTransport, COMMANDS, FIELDS, USER};

const RUB: &str = "\x08 \x08";

// ============================================================================
// Echo and Erasure
// ============================================================================

#[test]
fn test_typed_characters_echo() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show");
    assert_eq!(helpers::take_output(&mut peer), "show");

    helpers::type_input(&mut peer, " motd\r");
    assert_eq!(helpers::take_output(&mut peer), " motd\nUser> ");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_backspace_sequence() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "ab\x7f");
    assert_eq!(helpers::take_output(&mut peer), format!("ab{}", RUB));

    helpers::type_input(&mut peer, "\x08");
    assert_eq!(helpers::take_output(&mut peer), RUB);
}

#[test]
fn test_backspace_on_empty_line_is_noop() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "\x7f\x7f");
    assert_eq!(helpers::take_output(&mut peer), "");

    helpers::type_input(&mut peer, "\r");
    assert_eq!(helpers::take_output(&mut peer), "\nUser> ");
    assert!(helpers::calls(&peer).is_empty());
}

#[test]
fn test_backspace_until_empty() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "test\x7f\x7f\x7f\x7f\x7f");
    assert_eq!(helpers::take_output(&mut peer), format!("test{}", RUB.repeat(4)));

    helpers::type_input(&mut peer, "\r");
    assert_eq!(helpers::take_output(&mut peer), "\nUser> ");
}

#[test]
fn test_backspace_removes_whole_codepoint() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "echo ø\x7fx\r");
    assert_eq!(helpers::calls(&peer)[0].argv, ["x"]);
}

#[test]
fn test_delete_line() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "reload");
    helpers::take_output(&mut peer);
    helpers::type_input(&mut peer, "\x15");
    assert_eq!(helpers::take_output(&mut peer), RUB.repeat(6));

    helpers::type_input(&mut peer, "show motd\r");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_delete_word() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show users");
    helpers::take_output(&mut peer);
    helpers::type_input(&mut peer, "\x17");
    assert_eq!(helpers::take_output(&mut peer), RUB.repeat(5));

    helpers::type_input(&mut peer, "motd\r");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_meta_delete_erases_word() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "echo one two\x1b\x7f\r");
    assert_eq!(helpers::calls(&peer)[0].argv, ["one"]);
}

#[test]
fn test_xterm_backspace_uses_dch1() {
    let tree = helpers::tree();
    let mut peer = helpers::telnet(&tree, "xterm");

    helpers::type_input(&mut peer, "ab\x7f");
    assert_eq!(helpers::take_output(&mut peer), "ab\x08\x1b[P");
}

#[test]
fn test_crlf_is_one_line() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show motd\r\n");
    helpers::type_input(&mut peer, "show users\n");
    assert_eq!(helpers::paths(&peer), ["show motd", "show users"]);
    assert_eq!(peer.opaque().output().matches("User> ").count(), 2);
}

#[test]
fn test_line_full_rings_bell() {
    let tree = Tree::with_config::<MinimalConfig>(COMMANDS, FIELDS, Callbacks::new(fixtures::prompt))
        .unwrap();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, &"x".repeat(128));
    helpers::take_output(&mut peer);
    helpers::type_input(&mut peer, "y");
    assert_eq!(helpers::take_output(&mut peer), "\x07");
}

#[test]
fn test_navigation_keys_ignored() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show\x1b[D\x1b[A\x1b[1;5C motd");
    assert_eq!(helpers::take_output(&mut peer), "show motd");
    helpers::type_input(&mut peer, "\r");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_invalid_utf8_is_fatal() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    assert!(matches!(peer.read(&[0xff]), Err(Error::Decode(_))));
}

#[test]
fn test_line_before_bad_byte_still_runs() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    assert_eq!(
        peer.read(b"show motd\r\x80"),
        Err(Error::Decode(DecodeError::StrayFollowByte))
    );
    assert_eq!(helpers::paths(&peer), ["show motd"]);
    assert_eq!(helpers::take_output(&mut peer), "show motd\nUser> ");
}

// ============================================================================
// Cancel
// ============================================================================

#[test]
fn test_ctrl_c_abandons_line() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show");
    helpers::take_output(&mut peer);
    helpers::type_input(&mut peer, "\x03");
    assert_eq!(helpers::take_output(&mut peer), "^C\nUser> ");
    assert_eq!(peer.state(), ReadState::New);

    helpers::type_input(&mut peer, "show motd\r");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_ctrl_c_abandons_fields() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "login\ralice\rsec\x03");
    assert_eq!(peer.state(), ReadState::New);
    assert!(helpers::calls(&peer).is_empty());

    helpers::type_input(&mut peer, "show motd\r");
    assert_eq!(helpers::calls(&peer)[0].username, None);
}

// ============================================================================
// Context Help
// ============================================================================

#[test]
fn test_question_mark_shows_completions() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "show ");
    helpers::take_output(&mut peer);
    helpers::type_input(&mut peer, "?");

    let expected = [
        "?\n".to_string(),
        format!("  {:<18} - {}\n", "show motd", "Message of the day"),
        format!("  {:<18} - {}\n", "show users", "Who is logged in"),
        "User> show ".to_string(),
    ]
    .concat();
    assert_eq!(helpers::take_output(&mut peer), expected);

    helpers::type_input(&mut peer, "motd\r");
    assert_eq!(helpers::paths(&peer), ["show motd"]);
}

#[test]
fn test_question_mark_on_empty_line_lists_all() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "?");
    let output = helpers::take_output(&mut peer);
    helpers::assert_contains_all(&output, &["echo", "enable", "login", "show users"]);
    helpers::assert_contains_none(&output, &["disable", "configure"]);
    helpers::assert_prompt(&output, "User");
}

#[test]
fn test_f1_shows_help() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "\x1bOP");
    helpers::assert_contains_all(&helpers::take_output(&mut peer), &["show motd", "User> "]);
}

#[test]
fn test_question_mark_in_field_is_text() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "login\rwho?\rpw\r");
    assert_eq!(helpers::calls(&peer)[0].username.as_deref(), Some("who?"));
}

// ============================================================================
// Hidden Fields
// ============================================================================

#[test]
fn test_hidden_field_does_not_echo() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    helpers::type_input(&mut peer, "login\ralice\r");
    helpers::take_output(&mut peer);

    helpers::type_input(&mut peer, "secret\x7f\x7f");
    assert_eq!(helpers::take_output(&mut peer), "");

    helpers::type_input(&mut peer, "\r");
    assert_eq!(helpers::take_output(&mut peer), "\nUser> ");
    assert_eq!(helpers::calls(&peer)[0].password.as_deref(), Some("secr"));
}

// ============================================================================
// Save and Restore
// ============================================================================

#[test]
fn test_save_restore_with_capabilities() {
    let tree = helpers::tree();
    let mut peer = helpers::telnet(&tree, "xterm");

    peer.send(Output::Save).unwrap();
    peer.print("status").unwrap();
    peer.send(Output::RestoreAndDeleteToEol).unwrap();
    assert_eq!(helpers::take_output(&mut peer), "\x1b7status\x1b8\x1b[K");
}

#[test]
fn test_save_restore_simulated_on_dumb_terminal() {
    let tree = helpers::tree();
    let mut peer = helpers::ecma48(&tree);

    peer.send(Output::Save).unwrap();
    peer.print("løp").unwrap();
    peer.send(Output::RestoreAndDeleteToEol).unwrap();
    assert_eq!(helpers::take_output(&mut peer), format!("løp{}", RUB.repeat(3)));
}

#[test]
fn test_restore_without_save_on_plain_ends_line() {
    let tree = helpers::tree();
    let mut peer = helpers::plain(&tree);

    peer.send(Output::RestoreAndDeleteToEol).unwrap();
    assert_eq!(helpers::take_output(&mut peer), "\r\n");
}

#[test]
fn test_accept_in_ecma48_mode() {
    let tree = helpers::tree();
    let mut peer = Peer::accept(&tree, IoMode::Ecma48, MockTransport::new()).unwrap();
    peer.set_mode(USER);
    assert_eq!(helpers::take_output(&mut peer), "Welcome\nnone> ");
}
