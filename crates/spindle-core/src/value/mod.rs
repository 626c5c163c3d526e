//! The tagged-value data model.
//!
//! [`Data`] is a closed set of value variants sharing a polymorphic
//! operation surface: member access, copy-on-write mutation, arithmetic,
//! comparison, spreading. Values are immutable once constructed — member
//! operations on collections return new containers rather than mutating in
//! place.

mod changer;
mod ops;

pub use changer::{AdvanceType, Changer, ChangerStep, Command, SelectorSpec};
pub use ops::{Op, TestOp, UnaryOp};

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::expr::Expr;

/// A tagged value flowing through expression evaluation and rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Number(f64),
    Str(String),
    Bool(bool),
    /// Ordered sequence; author-facing indexing is 1-based.
    Array(Vec<Data>),
    /// Keyed by the key's canonical string; the original key is retained in
    /// the entry so `datanames`-style listings can reproduce it.
    Map(BTreeMap<String, (Data, Data)>),
    /// Kept sorted and deduplicated by canonical string, so structural
    /// equality is insertion-order-insensitive by construction.
    Set(Vec<Data>),
    Color(Color),
    Type(TypeName),
    Lambda(Lambda),
    Changer(Changer),
    Command(Command),
    /// `?name` — a reference to a named hook, used by revision macros.
    HookRef(String),
    /// Deferred `all`/`any` quantifier over a source collection; tested
    /// lazily when compared against the other operand.
    Checker(Checker),
    /// The neutral marker returned by instant macros (`set`, `put`, `move`).
    NoValue,
}

/// An RGB color. `+` between colors averages channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel-wise average, the meaning of `Color + Color`.
    pub fn mix(self, other: Color) -> Color {
        Color {
            r: ((self.r as u16 + other.r as u16) / 2) as u8,
            g: ((self.g as u16 + other.g as u16) / 2) as u8,
            b: ((self.b as u16 + other.b as u16) / 2) as u8,
        }
    }

    /// Look up a builtin color keyword (`red`, `white`, ...).
    pub fn named(name: &str) -> Option<Color> {
        let c = match name {
            "red" => Color::new(0xe6, 0x19, 0x19),
            "orange" => Color::new(0xe6, 0x8d, 0x19),
            "yellow" => Color::new(0xe5, 0xe6, 0x19),
            "lime" => Color::new(0x80, 0xe6, 0x19),
            "green" => Color::new(0x19, 0xe6, 0x19),
            "aqua" | "cyan" => Color::new(0x19, 0xe5, 0xe6),
            "blue" => Color::new(0x19, 0x7f, 0xe6),
            "navy" => Color::new(0x19, 0x19, 0xe6),
            "purple" => Color::new(0x7f, 0x19, 0xe6),
            "magenta" | "fuchsia" => Color::new(0xe6, 0x19, 0xe5),
            "white" => Color::new(0xff, 0xff, 0xff),
            "black" => Color::new(0x00, 0x00, 0x00),
            "grey" | "gray" => Color::new(0x88, 0x88, 0x88),
            _ => return None,
        };
        Some(c)
    }

    /// Parse a `#rgb` or `#rrggbb` literal.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let expand = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = expand(&hex[0..1])?;
                let g = expand(&hex[1..2])?;
                let b = expand(&hex[2..3])?;
                Some(Color::new(r * 17, g * 17, b * 17))
            }
            6 => Some(Color::new(
                expand(&hex[0..2])?,
                expand(&hex[2..4])?,
                expand(&hex[4..6])?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A datatype value, the right-hand side of `matches` / `is a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Number,
    Str,
    Bool,
    Array,
    Map,
    Set,
    Color,
    Lambda,
    Changer,
    Command,
    HookRef,
}

impl TypeName {
    pub fn name(self) -> &'static str {
        match self {
            TypeName::Number => "number",
            TypeName::Str => "string",
            TypeName::Bool => "boolean",
            TypeName::Array => "array",
            TypeName::Map => "datamap",
            TypeName::Set => "dataset",
            TypeName::Color => "colour",
            TypeName::Lambda => "lambda",
            TypeName::Changer => "changer",
            TypeName::Command => "command",
            TypeName::HookRef => "hook name",
        }
    }

    /// Resolve a bare datatype keyword (`num`, `str`, `dm`, ...).
    pub fn named(word: &str) -> Option<TypeName> {
        let t = match word {
            "num" | "number" => TypeName::Number,
            "str" | "string" => TypeName::Str,
            "bool" | "boolean" => TypeName::Bool,
            "array" => TypeName::Array,
            "dm" | "datamap" => TypeName::Map,
            "ds" | "dataset" => TypeName::Set,
            "color" | "colour" => TypeName::Color,
            "lambda" => TypeName::Lambda,
            "changer" => TypeName::Changer,
            "command" => TypeName::Command,
            _ => return None,
        };
        Some(t)
    }
}

/// A lambda: `each _x`, `_x where cond`, `via it + 1`, or combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    /// The bound loop variable, without its `_` sigil.
    pub var: Option<String>,
    /// `where` filter clause, evaluated once per element.
    pub filter: Option<Rc<Expr>>,
    /// `via` transform clause, evaluated once per element.
    pub via: Option<Rc<Expr>>,
}

/// The deferred quantifier produced by the `all`/`any` pseudo-members.
#[derive(Debug, Clone, PartialEq)]
pub struct Checker {
    /// `true` for `all`, `false` for `any`.
    pub all: bool,
    pub items: Vec<Data>,
}

impl Data {
    /// Canonical (author-visible) string for this value.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Number(_) => "number",
            Data::Str(_) => "string",
            Data::Bool(_) => "boolean",
            Data::Array(_) => "array",
            Data::Map(_) => "datamap",
            Data::Set(_) => "dataset",
            Data::Color(_) => "colour",
            Data::Type(_) => "datatype",
            Data::Lambda(_) => "lambda",
            Data::Changer(_) => "changer",
            Data::Command(_) => "command",
            Data::HookRef(_) => "hook name",
            Data::Checker(_) => "checker",
            Data::NoValue => "instant",
        }
    }

    pub fn is_of_type(&self, t: TypeName) -> bool {
        matches!(
            (self, t),
            (Data::Number(_), TypeName::Number)
                | (Data::Str(_), TypeName::Str)
                | (Data::Bool(_), TypeName::Bool)
                | (Data::Array(_), TypeName::Array)
                | (Data::Map(_), TypeName::Map)
                | (Data::Set(_), TypeName::Set)
                | (Data::Color(_), TypeName::Color)
                | (Data::Lambda(_), TypeName::Lambda)
                | (Data::Changer(_), TypeName::Changer)
                | (Data::Command(_), TypeName::Command)
                | (Data::HookRef(_), TypeName::HookRef)
        )
    }

    /// Build a set value: sorts by canonical string and drops duplicates.
    pub fn set_from(mut items: Vec<Data>) -> Data {
        items.sort_by(|a, b| natural_cmp(&a.to_string(), &b.to_string()));
        items.dedup();
        Data::Set(items)
    }

    /// Build a map value from alternating key/value pairs.
    pub fn map_from(pairs: Vec<(Data, Data)>) -> Data {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), (k, v));
        }
        Data::Map(map)
    }
}

/// Format a number the way authors see it: no trailing `.0` when integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Number(n) => write!(f, "{}", format_number(*n)),
            Data::Str(s) => write!(f, "{s}"),
            Data::Bool(b) => write!(f, "{b}"),
            Data::Array(items) | Data::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Data::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Data::Color(c) => write!(f, "{c}"),
            Data::Type(t) => write!(f, "[the {} datatype]", t.name()),
            Data::Lambda(_) => write!(f, "[a lambda]"),
            Data::Changer(_) => write!(f, "[a changer]"),
            Data::Command(_) => write!(f, "[a command]"),
            Data::HookRef(name) => write!(f, "?{name}"),
            Data::Checker(c) => {
                write!(f, "[{} of a collection]", if c.all { "all" } else { "any" })
            }
            Data::NoValue => Ok(()),
        }
    }
}

/// Human-friendly alphanumeric comparison: digit runs compare numerically,
/// so `"Item9"` sorts before `"Item10"`.
pub fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();
    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let mut na = 0u64;
                    while let Some(d) = ca.peek().and_then(|c| c.to_digit(10)) {
                        na = na.saturating_mul(10).saturating_add(d as u64);
                        ca.next();
                    }
                    let mut nb = 0u64;
                    while let Some(d) = cb.peek().and_then(|c| c.to_digit(10)) {
                        nb = nb.saturating_mul(10).saturating_add(d as u64);
                        cb.next();
                    }
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match x.cmp(&y) {
                        Ordering::Equal => {
                            ca.next();
                            cb.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_drops_integral_fraction() {
        assert_eq!(Data::Number(54.0).to_string(), "54");
        assert_eq!(Data::Number(2.5).to_string(), "2.5");
        assert_eq!(Data::Number(-3.0).to_string(), "-3");
    }

    #[test]
    fn array_display_matches_author_format() {
        let a = Data::Array(vec![Data::Number(2.0), Data::Number(3.0), Data::Number(4.0)]);
        assert_eq!(a.to_string(), "[2, 3, 4]");
    }

    #[test]
    fn set_equality_ignores_insertion_order() {
        let a = Data::set_from(vec![Data::Number(1.0), Data::Number(2.0), Data::Number(3.0)]);
        let b = Data::set_from(vec![Data::Number(3.0), Data::Number(2.0), Data::Number(1.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn set_collapses_duplicates() {
        let a = Data::set_from(vec![Data::Number(1.0), Data::Number(1.0), Data::Number(2.0)]);
        let Data::Set(items) = &a else { panic!("expected set") };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn array_equality_is_order_sensitive() {
        let a = Data::Array(vec![Data::Number(1.0), Data::Number(2.0)]);
        let b = Data::Array(vec![Data::Number(2.0), Data::Number(1.0)]);
        assert_ne!(a, b);
    }

    #[test]
    fn natural_cmp_sorts_digit_runs_numerically() {
        use std::cmp::Ordering;
        assert_eq!(natural_cmp("Item9", "Item10"), Ordering::Less);
        assert_eq!(natural_cmp("Item10", "Item9"), Ordering::Greater);
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("a2b", "a2b"), Ordering::Equal);
    }

    #[test]
    fn color_mix_averages_channels() {
        let black = Color::named("black").unwrap();
        let white = Color::named("white").unwrap();
        assert_eq!(black.mix(white), Color::new(0x7f, 0x7f, 0x7f));
    }

    #[test]
    fn hex_colors_parse_in_both_widths() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::new(255, 255, 255)));
        assert_eq!(Color::from_hex("#102030"), Some(Color::new(0x10, 0x20, 0x30)));
        assert_eq!(Color::from_hex("#12345"), None);
    }

    #[test]
    fn map_keys_use_canonical_strings() {
        let m = Data::map_from(vec![(Data::Str("hp".into()), Data::Number(10.0))]);
        let Data::Map(map) = &m else { panic!("expected map") };
        assert!(map.contains_key("hp"));
    }
}
