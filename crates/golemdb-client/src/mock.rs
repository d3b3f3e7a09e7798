//! In-memory mock of the GolemBase store.
//!
//! `MockClient` implements [`GolemBaseClient`](crate::GolemBaseClient) over a
//! map of entities and evaluates the store's predicate grammar locally:
//! identifiers, double-quoted strings with `\"` escapes, unsigned integer
//! literals, comparison operators `=`, `<`, `<=`, `>`, `>=`, the glob
//! operator `~` (wildcards `*`, `?`, `[set]`), logical `&&`/`||`, and
//! parentheses. String comparisons rank by byte order and numeric
//! comparisons by u64 order, matching the store's native comparators.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use golemdb_common::{DbError, DbResult};

use super::client::GolemBaseClient;
use super::entity::{Entity, EntityMetadata, EntityUpdate, QueryHit, Receipt};

/// In-memory backing store used by the adapter's test suites.
pub struct MockClient {
    state: RwLock<MockState>,
    account_address: String,
}

struct MockState {
    entities: BTreeMap<u64, Entity>,
    next_key: u64,
    current_block: u64,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    /// Creates an empty mock store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState {
                entities: BTreeMap::new(),
                next_key: 1,
                current_block: 0,
            }),
            account_address: "0xmock000000000000000000000000000000000001".to_string(),
        }
    }

    /// Number of live entities in the store.
    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    /// Advances the block height, expiring entities whose BTL has elapsed.
    pub fn advance_blocks(&self, blocks: u64) {
        let mut state = self.state.write();
        state.current_block += blocks;
        let now = state.current_block;
        state.entities.retain(|_, e| e.btl > now);
    }

    fn key_bytes(key: u64) -> Vec<u8> {
        key.to_be_bytes().to_vec()
    }

    fn key_from_bytes(bytes: &[u8]) -> DbResult<u64> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| DbError::Rpc {
            message: format!("malformed entity key of length {}", bytes.len()),
        })?;
        Ok(u64::from_be_bytes(arr))
    }
}

#[async_trait]
impl GolemBaseClient for MockClient {
    async fn create_entities(&self, entities: Vec<Entity>) -> DbResult<Vec<Receipt>> {
        let mut state = self.state.write();
        let mut receipts = Vec::with_capacity(entities.len());
        for mut entity in entities {
            let key = state.next_key;
            state.next_key += 1;
            let expiration_block = state.current_block + entity.btl;
            entity.btl = expiration_block;
            state.entities.insert(key, entity);
            receipts.push(Receipt {
                entity_key: Self::key_bytes(key),
                expiration_block,
            });
        }
        Ok(receipts)
    }

    async fn update_entities(&self, updates: Vec<EntityUpdate>) -> DbResult<Vec<Receipt>> {
        let mut state = self.state.write();
        let current_block = state.current_block;
        let mut receipts = Vec::with_capacity(updates.len());
        for update in updates {
            let key = Self::key_from_bytes(&update.entity_key)?;
            if !state.entities.contains_key(&key) {
                return Err(DbError::Rpc {
                    message: format!("entity {key} not found"),
                });
            }
            let mut entity = update.entity;
            let expiration_block = current_block + entity.btl;
            entity.btl = expiration_block;
            state.entities.insert(key, entity);
            receipts.push(Receipt {
                entity_key: update.entity_key,
                expiration_block,
            });
        }
        Ok(receipts)
    }

    async fn delete_entities(&self, keys: Vec<Vec<u8>>) -> DbResult<Vec<Receipt>> {
        let mut state = self.state.write();
        let mut receipts = Vec::with_capacity(keys.len());
        for key_bytes in keys {
            let key = Self::key_from_bytes(&key_bytes)?;
            if state.entities.remove(&key).is_none() {
                return Err(DbError::Rpc {
                    message: format!("entity {key} not found"),
                });
            }
            receipts.push(Receipt {
                entity_key: key_bytes,
                expiration_block: 0,
            });
        }
        Ok(receipts)
    }

    async fn query_entities(&self, predicate: &str) -> DbResult<Vec<QueryHit>> {
        let ast = parse_predicate(predicate)?;
        let state = self.state.read();
        let mut hits = Vec::new();
        for (key, entity) in &state.entities {
            if ast.matches(entity) {
                hits.push(QueryHit {
                    entity_key: Self::key_bytes(*key),
                    storage_value: entity.payload.clone(),
                });
            }
        }
        Ok(hits)
    }

    async fn get_entity_metadata(&self, key: &[u8]) -> DbResult<EntityMetadata> {
        let key = Self::key_from_bytes(key)?;
        let state = self.state.read();
        let entity = state.entities.get(&key).ok_or_else(|| DbError::Rpc {
            message: format!("entity {key} not found"),
        })?;
        Ok(EntityMetadata {
            string_annotations: entity.string_annotations.clone(),
            numeric_annotations: entity.numeric_annotations.clone(),
            expiration_block: entity.btl,
        })
    }

    async fn get_storage_value(&self, key: &[u8]) -> DbResult<Vec<u8>> {
        let key = Self::key_from_bytes(key)?;
        let state = self.state.read();
        let entity = state.entities.get(&key).ok_or_else(|| DbError::Rpc {
            message: format!("entity {key} not found"),
        })?;
        Ok(entity.payload.clone())
    }

    async fn get_account_address(&self) -> DbResult<String> {
        Ok(self.account_address.clone())
    }
}

// ---------------------------------------------------------------------------
// Predicate grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Or(Box<Predicate>, Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Compare {
        field: String,
        op: CompareOp,
        value: PredicateValue,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Glob,
}

#[derive(Debug, Clone, PartialEq)]
enum PredicateValue {
    Str(String),
    Num(u64),
}

impl Predicate {
    fn matches(&self, entity: &Entity) -> bool {
        match self {
            Predicate::Or(a, b) => a.matches(entity) || b.matches(entity),
            Predicate::And(a, b) => a.matches(entity) && b.matches(entity),
            Predicate::Compare { field, op, value } => match value {
                PredicateValue::Str(expected) => {
                    let Some(actual) = entity.string_annotations.get(field) else {
                        return false;
                    };
                    match op {
                        CompareOp::Eq => actual == expected,
                        CompareOp::Lt => actual.as_str() < expected.as_str(),
                        CompareOp::LtEq => actual.as_str() <= expected.as_str(),
                        CompareOp::Gt => actual.as_str() > expected.as_str(),
                        CompareOp::GtEq => actual.as_str() >= expected.as_str(),
                        CompareOp::Glob => glob_match(expected, actual),
                    }
                }
                PredicateValue::Num(expected) => {
                    let Some(actual) = entity.numeric_annotations.get(field) else {
                        return false;
                    };
                    match op {
                        CompareOp::Eq => actual == expected,
                        CompareOp::Lt => actual < expected,
                        CompareOp::LtEq => actual <= expected,
                        CompareOp::Gt => actual > expected,
                        CompareOp::GtEq => actual >= expected,
                        CompareOp::Glob => false,
                    }
                }
            },
        }
    }
}

fn parse_predicate(input: &str) -> DbResult<Predicate> {
    let mut parser = PredicateParser {
        chars: input.chars().collect(),
        pos: 0,
        input,
    };
    let predicate = parser.parse_or()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("trailing input after predicate"));
    }
    Ok(predicate)
}

struct PredicateParser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl PredicateParser<'_> {
    fn error(&self, message: &str) -> DbError {
        DbError::Rpc {
            message: format!(
                "invalid predicate at offset {}: {} in {:?}",
                self.pos, message, self.input
            ),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos + expected.chars().count();
        if end <= self.chars.len()
            && self.chars[self.pos..end].iter().collect::<String>() == expected
        {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> DbResult<Predicate> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            let right = self.parse_and()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> DbResult<Predicate> {
        let mut left = self.parse_atom()?;
        while self.eat("&&") {
            let right = self.parse_atom()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> DbResult<Predicate> {
        self.skip_whitespace();
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> DbResult<Predicate> {
        let field = self.parse_identifier()?;
        let op = self.parse_operator()?;
        let value = self.parse_value()?;
        if op == CompareOp::Glob && !matches!(value, PredicateValue::Str(_)) {
            return Err(self.error("glob operator requires a string operand"));
        }
        Ok(Predicate::Compare { field, op, value })
    }

    fn parse_identifier(&mut self) -> DbResult<String> {
        self.skip_whitespace();
        let mut ident = String::new();
        if self.peek() == Some('$') {
            ident.push('$');
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() || ident == "$" {
            return Err(self.error("expected identifier"));
        }
        Ok(ident)
    }

    fn parse_operator(&mut self) -> DbResult<CompareOp> {
        self.skip_whitespace();
        // Two-character operators first.
        if self.eat("<=") {
            return Ok(CompareOp::LtEq);
        }
        if self.eat(">=") {
            return Ok(CompareOp::GtEq);
        }
        match self.bump() {
            Some('=') => Ok(CompareOp::Eq),
            Some('<') => Ok(CompareOp::Lt),
            Some('>') => Ok(CompareOp::Gt),
            Some('~') => Ok(CompareOp::Glob),
            _ => Err(self.error("expected comparison operator")),
        }
    }

    fn parse_value(&mut self) -> DbResult<PredicateValue> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some(other) => {
                                value.push('\\');
                                value.push(other);
                            }
                            None => return Err(self.error("unterminated string literal")),
                        },
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string literal")),
                    }
                }
                Ok(PredicateValue::Str(value))
            }
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                let value = digits
                    .parse::<u64>()
                    .map_err(|_| self.error("integer literal out of range"))?;
                Ok(PredicateValue::Num(value))
            }
            _ => Err(self.error("expected string or integer literal")),
        }
    }
}

/// Matches a glob pattern (`*` any sequence, `?` any single character,
/// `[set]` character classes with leading `!` negation) against text.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, 0, &text, 0)
}

fn glob_match_at(pattern: &[char], mut p: usize, text: &[char], mut t: usize) -> bool {
    while p < pattern.len() {
        match pattern[p] {
            '*' => {
                // Collapse consecutive stars, then try every suffix.
                while p + 1 < pattern.len() && pattern[p + 1] == '*' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                for start in t..=text.len() {
                    if glob_match_at(pattern, p + 1, text, start) {
                        return true;
                    }
                }
                return false;
            }
            '?' => {
                if t >= text.len() {
                    return false;
                }
                p += 1;
                t += 1;
            }
            '[' => {
                let Some(close) = pattern[p + 1..].iter().position(|&c| c == ']') else {
                    // Unterminated class matches a literal '['.
                    if t < text.len() && text[t] == '[' {
                        p += 1;
                        t += 1;
                        continue;
                    }
                    return false;
                };
                if t >= text.len() {
                    return false;
                }
                let class = &pattern[p + 1..p + 1 + close];
                if !class_matches(class, text[t]) {
                    return false;
                }
                p += close + 2;
                t += 1;
            }
            c => {
                if t >= text.len() || text[t] != c {
                    return false;
                }
                p += 1;
                t += 1;
            }
        }
    }
    t == text.len()
}

fn class_matches(class: &[char], c: char) -> bool {
    let (negated, class) = match class.first() {
        Some('!') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut matched = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == '-' {
            if class[i] <= c && c <= class[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if class[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    matched != negated
}
