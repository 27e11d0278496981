//! Capability string parser
//!
//! Monitors describe themselves with a small parenthesized grammar:
//!
//! ```text
//! (prot(monitor)type(lcd)model(ACME)cmds(01 02)vcp(02 04 14(05 08 0B) 16))
//! ```
//!
//! Vendor strings are routinely malformed, so this parser never fails:
//! anything it cannot make sense of is recorded as an erratum (the raw
//! offending fragment plus a reason) and parsing resumes at the next
//! sibling group. The result is always a complete [`CapabilityDocument`].
//!
//! Recovery is per smallest self-contained fragment, so an input where
//! nothing parses yields one erratum per unparseable fragment, not one
//! for the whole string; only a blank input collapses to a single
//! whole-input erratum.
//!
//! All numeric tokens in the grammar are hexadecimal without a prefix;
//! once parsed they are plain integers and must not be re-read as hex.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::vcp::FeatureCode;

/// How a monitor advertises a VCP feature in its capability string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcpAccess {
    /// Any value in range is legal; no enumeration given.
    Continuous,
    /// Exactly this set of values is legal.
    Discrete(BTreeSet<u16>),
}

/// A recorded, non-fatal parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErratum {
    /// The raw offending fragment, from its key token to the point where
    /// the parser re-synchronized.
    pub fragment: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Parsed capability string. Built once per fetch, immutable after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDocument {
    /// Top-level `key(value)` groups stored verbatim (model, type, prot,
    /// mccs_ver, ... and any unrecognized key). Later duplicates win.
    pub attributes: BTreeMap<String, String>,
    /// Non-VCP command codes from the `cmds` group.
    pub commands: BTreeSet<u8>,
    /// Features from the `vcp` group.
    pub vcp_features: BTreeMap<FeatureCode, VcpAccess>,
    /// Every fragment that failed to parse, in input order.
    pub errata: Vec<ParseErratum>,
}

/// Parse a capability string into a document.
///
/// Pure and total: the same input always yields the same document, and
/// grammar problems surface in `errata`, never as an error.
pub fn parse_capabilities(input: &str) -> CapabilityDocument {
    let mut doc = CapabilityDocument::default();
    if input.trim().is_empty() {
        doc.errata.push(ParseErratum {
            fragment: input.to_string(),
            reason: "empty capability string".to_string(),
        });
        return doc;
    }
    let mut parser = Parser {
        src: input,
        tokens: lex(input),
        i: 0,
        doc,
    };
    parser.parse_top();
    parser.doc
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Word,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn lex(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                tokens.push(Token {
                    kind: TokenKind::Open,
                    start: i,
                    end: i + 1,
                });
                i += 1;
            }
            b')' => {
                tokens.push(Token {
                    kind: TokenKind::Close,
                    start: i,
                    end: i + 1,
                });
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && bytes[i] != b'('
                    && bytes[i] != b')'
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Word,
                    start,
                    end: i,
                });
            }
        }
    }
    tokens
}

/// A run of 2-hex-digit bytes, e.g. `"14"` or `"0102"`.
fn hex_bytes(text: &str) -> Result<Vec<u8>, String> {
    if text.is_empty() || text.len() % 2 != 0 {
        return Err(format!("expected hex byte, got \"{text}\""));
    }
    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| format!("expected hex byte, got \"{text}\""))
        })
        .collect()
}

/// Values inside a discrete group: a 4-hex-digit token is one 16-bit
/// value, anything else is a run of single bytes.
fn hex_values(text: &str) -> Result<Vec<u16>, String> {
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return u16::from_str_radix(text, 16)
            .map(|value| vec![value])
            .map_err(|_| format!("expected hex value, got \"{text}\""));
    }
    Ok(hex_bytes(text)?.into_iter().map(u16::from).collect())
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    i: usize,
    doc: CapabilityDocument,
}

impl<'a> Parser<'a> {
    fn text(&self, tok: Token) -> &'a str {
        &self.src[tok.start..tok.end]
    }

    fn kind(&self, idx: usize) -> Option<TokenKind> {
        self.tokens.get(idx).map(|t| t.kind)
    }

    /// Index just past the close paren balancing the open at `open_idx`,
    /// or `tokens.len()` if the input runs out first.
    fn resync_after(&self, open_idx: usize) -> usize {
        let mut depth = 0i32;
        for (offset, tok) in self.tokens[open_idx..].iter().enumerate() {
            match tok.kind {
                TokenKind::Open => depth += 1,
                TokenKind::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return open_idx + offset + 1;
                    }
                }
                TokenKind::Word => {}
            }
        }
        self.tokens.len()
    }

    fn erratum(&mut self, start: usize, end: usize, reason: String) {
        self.doc.errata.push(ParseErratum {
            fragment: self.src[start..end].to_string(),
            reason,
        });
    }

    fn parse_top(&mut self) {
        let mut wrapper: Option<Token> = None;
        while self.i < self.tokens.len() {
            let tok = self.tokens[self.i];
            match tok.kind {
                TokenKind::Word => {
                    if self.kind(self.i + 1) == Some(TokenKind::Open) {
                        self.parse_group(tok);
                    } else {
                        self.erratum(tok.start, tok.end, "expected '(' after key".to_string());
                        self.i += 1;
                    }
                }
                TokenKind::Open => {
                    if self.i == 0 {
                        // whole-string wrapper
                        wrapper = Some(tok);
                        self.i += 1;
                    } else {
                        let resync = self.resync_after(self.i);
                        let end = self.tokens[resync - 1].end;
                        self.erratum(tok.start, end, "group without key".to_string());
                        self.i = resync;
                    }
                }
                TokenKind::Close => {
                    if wrapper.take().is_none() {
                        self.erratum(tok.start, tok.end, "unmatched ')'".to_string());
                    }
                    self.i += 1;
                }
            }
        }
        // A wrapper left unclosed at end-of-input is only tolerated when
        // an erratum already points at the group whose resync consumed
        // the missing close; a clean document with a dangling wrapper
        // means the string was truncated, and that has to surface.
        if let Some(tok) = wrapper {
            if self.doc.errata.is_empty() {
                self.erratum(tok.start, tok.end, "unmatched '('".to_string());
            }
        }
    }

    /// Dispatch one `key ( ... )` group. On failure records a single
    /// erratum spanning the whole group and resynchronizes past it; a
    /// malformed group contributes nothing else to the document.
    fn parse_group(&mut self, key: Token) {
        let open_idx = self.i + 1;
        let key_text = self.text(key).to_ascii_lowercase();
        let result = match key_text.as_str() {
            "cmds" => self.parse_cmds(open_idx),
            "vcp" => self.parse_vcp(open_idx),
            _ => self.parse_attribute(&key_text, open_idx),
        };
        match result {
            Ok(next) => self.i = next,
            Err(reason) => {
                let resync = self.resync_after(open_idx);
                let end = self.tokens[resync - 1].end;
                self.erratum(key.start, end, reason);
                self.i = resync;
            }
        }
    }

    /// `cmds(01 02 ...)` — hex command bytes.
    fn parse_cmds(&mut self, open_idx: usize) -> Result<usize, String> {
        let mut staged = BTreeSet::new();
        let mut i = open_idx + 1;
        loop {
            match self.kind(i) {
                None => return Err("unterminated group".to_string()),
                Some(TokenKind::Open) => return Err("unexpected '('".to_string()),
                Some(TokenKind::Close) => {
                    self.doc.commands.append(&mut staged);
                    return Ok(i + 1);
                }
                Some(TokenKind::Word) => {
                    staged.extend(hex_bytes(self.text(self.tokens[i]))?);
                    i += 1;
                }
            }
        }
    }

    /// `vcp(02 04 14(05 08 0B) 16)` — feature codes, each optionally
    /// followed by its enumerated legal values.
    fn parse_vcp(&mut self, open_idx: usize) -> Result<usize, String> {
        let mut staged: BTreeMap<FeatureCode, VcpAccess> = BTreeMap::new();
        let mut i = open_idx + 1;
        loop {
            match self.kind(i) {
                None => return Err("unterminated group".to_string()),
                Some(TokenKind::Open) => {
                    return Err("value group without feature code".to_string())
                }
                Some(TokenKind::Close) => {
                    self.doc.vcp_features.append(&mut staged);
                    return Ok(i + 1);
                }
                Some(TokenKind::Word) => {
                    let codes = hex_bytes(self.text(self.tokens[i]))?;
                    i += 1;
                    if self.kind(i) == Some(TokenKind::Open) {
                        // nested value group binds to the last code of
                        // the run
                        let (values, next) = self.parse_value_group(i)?;
                        i = next;
                        if let Some((&last, rest)) = codes.split_last() {
                            for &code in rest {
                                staged.insert(FeatureCode::from_raw(code), VcpAccess::Continuous);
                            }
                            staged.insert(FeatureCode::from_raw(last), VcpAccess::Discrete(values));
                        }
                    } else {
                        for code in codes {
                            staged.insert(FeatureCode::from_raw(code), VcpAccess::Continuous);
                        }
                    }
                }
            }
        }
    }

    fn parse_value_group(&self, open_idx: usize) -> Result<(BTreeSet<u16>, usize), String> {
        let mut values = BTreeSet::new();
        let mut i = open_idx + 1;
        loop {
            match self.kind(i) {
                None => return Err("unterminated group".to_string()),
                Some(TokenKind::Open) => return Err("unexpected '('".to_string()),
                Some(TokenKind::Close) => return Ok((values, i + 1)),
                Some(TokenKind::Word) => {
                    values.extend(hex_values(self.text(self.tokens[i]))?);
                    i += 1;
                }
            }
        }
    }

    /// Any other key: store the balanced group content verbatim.
    fn parse_attribute(&mut self, key: &str, open_idx: usize) -> Result<usize, String> {
        let mut depth = 0i32;
        for (offset, tok) in self.tokens[open_idx..].iter().enumerate() {
            match tok.kind {
                TokenKind::Open => depth += 1,
                TokenKind::Close => {
                    depth -= 1;
                    if depth == 0 {
                        let open = self.tokens[open_idx];
                        let value = self.src[open.end..tok.start].trim().to_string();
                        self.doc.attributes.insert(key.to_string(), value);
                        return Ok(open_idx + offset + 1);
                    }
                }
                TokenKind::Word => {}
            }
        }
        Err("unterminated group".to_string())
    }
}
