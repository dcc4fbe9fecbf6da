//! Shared test helpers to reduce duplication across integration tests.

#![allow(dead_code)]

#[allow(clippy::duplicate_mod)]
#[path = "fixtures/mod.rs"]
pub mod fixtures;

use clink::{Callbacks, IoMode, Tree};
use fixtures::{Call, MockTransport, TestPeer, COMMANDS, FIELDS, USER};

// Telnet bytes
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;
pub const ECHO: u8 = 1;
pub const SGA: u8 = 3;
pub const TTYPE: u8 = 24;

// ============================================================================
// Tree and Peer Creation Helpers
// ============================================================================

/// The standard test tree, with a message of the day.
pub fn tree() -> Tree<MockTransport> {
    Tree::new(
        COMMANDS,
        FIELDS,
        Callbacks::new(fixtures::prompt).with_motd(fixtures::motd),
    )
    .unwrap()
}

/// Create a started peer in user mode with its output cleared.
pub fn peer(tree: &Tree<MockTransport>, io: IoMode) -> TestPeer<'_> {
    let mut peer = TestPeer::new(tree, io, MockTransport::new());
    peer.set_mode(USER);
    peer.ready().unwrap();
    peer.opaque_mut().clear_output();
    peer
}

/// Plain-mode peer.
pub fn plain(tree: &Tree<MockTransport>) -> TestPeer<'_> {
    peer(tree, IoMode::Plain)
}

/// ECMA-48 peer.
pub fn ecma48(tree: &Tree<MockTransport>) -> TestPeer<'_> {
    peer(tree, IoMode::Ecma48)
}

/// Telnet peer that has finished negotiating terminal type `ttype`.
pub fn telnet<'a>(tree: &'a Tree<MockTransport>, ttype: &str) -> TestPeer<'a> {
    let mut peer = TestPeer::new(tree, IoMode::Telnet, MockTransport::new());
    peer.set_mode(USER);
    peer.ready().unwrap();
    peer.read(&[IAC, WILL, TTYPE]).unwrap();
    peer.read(&ttype_is(ttype)).unwrap();
    assert!(peer.is_started());
    peer.opaque_mut().clear_output();
    peer
}

/// `IAC SB TTYPE IS <name> IAC SE`.
pub fn ttype_is(name: &str) -> Vec<u8> {
    let mut v = vec![IAC, SB, TTYPE, 0];
    v.extend_from_slice(name.as_bytes());
    v.extend_from_slice(&[IAC, SE]);
    v
}

// ============================================================================
// Input Helpers
// ============================================================================

/// Feed `input` in one read.
pub fn type_input(peer: &mut TestPeer<'_>, input: &str) {
    let n = peer.read(input.as_bytes()).unwrap();
    assert_eq!(n, input.len());
}

/// Feed `input` one byte per read.
pub fn type_bytewise(peer: &mut TestPeer<'_>, input: &[u8]) {
    for b in input {
        peer.read(core::slice::from_ref(b)).unwrap();
    }
}

/// Feed a line and return the output it produced.
pub fn execute(peer: &mut TestPeer<'_>, line: &str) -> String {
    peer.opaque_mut().clear_output();
    type_input(peer, line);
    type_input(peer, "\n");
    take_output(peer)
}

// ============================================================================
// Output Helpers
// ============================================================================

/// Output so far, clearing it.
pub fn take_output(peer: &mut TestPeer<'_>) -> String {
    let out = peer.opaque().output();
    peer.opaque_mut().clear_output();
    out
}

/// Raw output bytes so far, clearing them.
pub fn take_bytes(peer: &mut TestPeer<'_>) -> Vec<u8> {
    let out = peer.opaque().output_bytes().to_vec();
    peer.opaque_mut().clear_output();
    out
}

/// Recorded callbacks.
pub fn calls<'p>(peer: &'p TestPeer<'_>) -> &'p [Call] {
    &peer.opaque().calls
}

/// Paths of the recorded callbacks.
pub fn paths(peer: &TestPeer<'_>) -> Vec<String> {
    calls(peer).iter().map(|c| c.path.clone()).collect()
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert output contains every expected string.
pub fn assert_contains_all(output: &str, expected: &[&str]) {
    for s in expected {
        assert!(output.contains(s), "expected {:?} in output: {:?}", s, output);
    }
}

/// Assert output contains none of the forbidden strings.
pub fn assert_contains_none(output: &str, forbidden: &[&str]) {
    for s in forbidden {
        assert!(!output.contains(s), "unexpected {:?} in output: {:?}", s, output);
    }
}

/// Assert output ends with the prompt for `mode_name`.
pub fn assert_prompt(output: &str, mode_name: &str) {
    let prompt = format!("{}> ", mode_name);
    assert!(output.ends_with(&prompt), "expected prompt {:?} at end of {:?}", prompt, output);
}

/// Assert `needle` occurs in `haystack` as a contiguous byte run.
pub fn assert_bytes_contain(haystack: &[u8], needle: &[u8]) {
    assert!(
        haystack.windows(needle.len()).any(|w| w == needle),
        "expected {:?} in {:?}",
        needle,
        haystack
    );
}
