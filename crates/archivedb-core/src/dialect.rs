//! SQL dialect formatting: identifier quoting and positional placeholders.
//!
//! Statement shapes (including `ON CONFLICT ... DO UPDATE` and `RETURNING`)
//! are written against the Postgres grammar; SQLite accepts the same shapes
//! and differs only in placeholder syntax.

/// SQL dialect used when compiling statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
}

impl Dialect {
    /// Stable name, folded into statement signatures.
    pub const fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// `count` comma-separated placeholders numbered from `start`.
    pub fn placeholders(self, count: usize, start: usize) -> String {
        (start..start + count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => quote_ident(name),
        }
    }

    /// Quote and comma-join a column list: `"a","b"`.
    pub fn quote_list<S: AsRef<str>>(self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n.as_ref()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `"a"=$s AND "b"=$s+1` over the given columns.
    pub fn where_equals<S: AsRef<str>>(self, columns: &[S], start: usize) -> String {
        columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{}={}",
                    self.quote_identifier(c.as_ref()),
                    self.placeholder(start + i)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// `("a","b") IN (($s,$s+1),(...))` for `rows` key tuples.
    pub fn where_in<S: AsRef<str>>(self, columns: &[S], rows: usize, start: usize) -> String {
        let width = columns.len();
        let groups = (0..rows)
            .map(|r| format!("({})", self.placeholders(width, start + r * width)))
            .collect::<Vec<_>>()
            .join(",");
        format!("({}) IN ({})", self.quote_list(columns), groups)
    }
}

/// Quote an identifier using ANSI double quotes.
///
/// Embedded double quotes are escaped by doubling them.
#[inline]
pub fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{escaped}\"")
}
