//! Cache keys for compiled statement plans.
//!
//! A [`Signature`] captures every input that affects the generated SQL of one
//! plan. Names are length-prefixed (`<len>:<name>`) and every group carries a
//! tag and a count, so two different column sets can never encode to the same
//! key even when their concatenations coincide (`["ab", "c"]` vs `["a", "bc"]`).

use archivedb_core::Dialect;
use std::fmt;

/// Which statement family a plan belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Insert,
    Update,
    Upsert,
}

impl PlanKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PlanKind::Insert => "insert",
            PlanKind::Update => "update",
            PlanKind::Upsert => "upsert",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic key identifying one compiled plan shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Start a signature for `kind` under `dialect`.
    pub fn builder(dialect: Dialect, kind: PlanKind) -> SignatureBuilder {
        let mut buf = String::with_capacity(64);
        buf.push_str(dialect.name());
        buf.push(';');
        buf.push_str(kind.as_str());
        buf.push(';');
        SignatureBuilder { buf }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental [`Signature`] encoder.
#[derive(Debug)]
pub struct SignatureBuilder {
    buf: String,
}

impl SignatureBuilder {
    /// Append a boolean input under a one-letter tag.
    pub fn flag(mut self, tag: char, value: bool) -> Self {
        self.buf.push(tag);
        self.buf.push(if value { '1' } else { '0' });
        self.buf.push(';');
        self
    }

    /// Append a list of names under a one-letter tag.
    pub fn group<S: AsRef<str>>(mut self, tag: char, names: &[S]) -> Self {
        use std::fmt::Write as _;

        self.buf.push(tag);
        let _ = write!(self.buf, "{}:", names.len());
        for name in names {
            let name = name.as_ref();
            let _ = write!(self.buf, "{}:{}", name.len(), name);
        }
        self.buf.push(';');
        self
    }

    pub fn finish(self) -> Signature {
        Signature(self.buf)
    }
}
