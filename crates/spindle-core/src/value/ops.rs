//! Polymorphic operations over [`Data`] values.
//!
//! Collections are copy-on-write: member mutation returns a new container.
//! Comparison handles the deferred `all`/`any` checker on either side.

use std::cmp::Ordering;

use super::{natural_cmp, Checker, Data};
use crate::error::EngineError;

/// Arithmetic and boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Subtract => "-",
            Op::Multiply => "*",
            Op::Divide => "/",
            Op::Modulo => "%",
            Op::And => "and",
            Op::Or => "or",
        }
    }
}

/// Relational, containment, and type-test operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOp {
    Is,
    Contains,
    Matches,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    IsOfType,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Interpret a member key: a number, an ordinal string (`1st`, `2nd`, ...),
/// or a name. Returns a 1-based index when the key is positional.
fn positional_key(key: &Data) -> Option<i64> {
    match key {
        Data::Number(n) if n.fract() == 0.0 => Some(*n as i64),
        Data::Str(s) => ordinal_index(s),
        _ => None,
    }
}

/// Parse `1st`/`2nd`/`3rd`/`4th`... into a 1-based index.
pub fn ordinal_index(s: &str) -> Option<i64> {
    if s.len() < 3 {
        return None;
    }
    let (digits, suffix) = s.split_at(s.len() - 2);
    if !matches!(suffix, "st" | "nd" | "rd" | "th") {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    (n > 0).then_some(n)
}

fn index_into<T: Clone>(items: &[T], index: i64) -> Option<T> {
    if index >= 1 && (index as usize) <= items.len() {
        Some(items[index as usize - 1].clone())
    } else {
        None
    }
}

impl Data {
    /// Read a member: array index, string pseudo-members
    /// (`length`/`last`/`any`/`all`), or map key lookup.
    pub fn member(&self, key: &Data) -> Result<Data, EngineError> {
        let fail = || {
            Err(EngineError::unsupported(format!(
                "a {} has no member {}",
                self.type_name(),
                key
            )))
        };
        match self {
            Data::Array(items) => {
                if let Some(i) = positional_key(key) {
                    return index_into(items, i).ok_or_else(|| {
                        EngineError::eval(format!(
                            "position {i} is out of range for an array of {} item(s)",
                            items.len()
                        ))
                    });
                }
                match key {
                    Data::Str(s) if s == "length" => Ok(Data::Number(items.len() as f64)),
                    Data::Str(s) if s == "last" => index_into(items, items.len() as i64)
                        .ok_or_else(|| EngineError::eval("the array is empty")),
                    Data::Str(s) if s == "all" || s == "any" => Ok(Data::Checker(Checker {
                        all: s == "all",
                        items: items.clone(),
                    })),
                    _ => fail(),
                }
            }
            Data::Str(text) => {
                let chars: Vec<Data> =
                    text.chars().map(|c| Data::Str(c.to_string())).collect();
                if let Some(i) = positional_key(key) {
                    return index_into(&chars, i).ok_or_else(|| {
                        EngineError::eval(format!(
                            "position {i} is out of range for a string of {} character(s)",
                            chars.len()
                        ))
                    });
                }
                match key {
                    Data::Str(s) if s == "length" => Ok(Data::Number(chars.len() as f64)),
                    Data::Str(s) if s == "last" => index_into(&chars, chars.len() as i64)
                        .ok_or_else(|| EngineError::eval("the string is empty")),
                    Data::Str(s) if s == "all" || s == "any" => Ok(Data::Checker(Checker {
                        all: s == "all",
                        items: chars,
                    })),
                    _ => fail(),
                }
            }
            Data::Map(map) => match map.get(&key.to_string()) {
                Some((_, value)) => Ok(value.clone()),
                None => Err(EngineError::eval(format!(
                    "the datamap has no entry named {key}"
                ))),
            },
            Data::Set(items) => match key {
                Data::Str(s) if s == "length" => Ok(Data::Number(items.len() as f64)),
                Data::Str(s) if s == "all" || s == "any" => Ok(Data::Checker(Checker {
                    all: s == "all",
                    items: items.clone(),
                })),
                _ => fail(),
            },
            _ => fail(),
        }
    }

    /// Copy-on-write member assignment: returns a new container with the
    /// index/key replaced or inserted.
    pub fn set_member(&self, key: &Data, value: Data) -> Result<Data, EngineError> {
        match self {
            Data::Array(items) => {
                let i = positional_key(key).ok_or_else(|| {
                    EngineError::unsupported(format!("cannot assign member {key} of an array"))
                })?;
                let mut items = items.clone();
                if i >= 1 && (i as usize) <= items.len() {
                    items[i as usize - 1] = value;
                } else if i as usize == items.len() + 1 {
                    items.push(value);
                } else {
                    return Err(EngineError::eval(format!(
                        "position {i} is out of range for an array of {} item(s)",
                        items.len()
                    )));
                }
                Ok(Data::Array(items))
            }
            Data::Map(map) => {
                let mut map = map.clone();
                map.insert(key.to_string(), (key.clone(), value));
                Ok(Data::Map(map))
            }
            other => Err(EngineError::unsupported(format!(
                "cannot assign members of a {}",
                other.type_name()
            ))),
        }
    }

    /// Copy-on-write member deletion: returns a new container without the
    /// index/key.
    pub fn delete_member(&self, key: &Data) -> Result<Data, EngineError> {
        match self {
            Data::Array(items) => {
                let i = positional_key(key).ok_or_else(|| {
                    EngineError::unsupported(format!("cannot delete member {key} of an array"))
                })?;
                if i < 1 || (i as usize) > items.len() {
                    return Err(EngineError::eval(format!(
                        "position {i} is out of range for an array of {} item(s)",
                        items.len()
                    )));
                }
                let mut items = items.clone();
                items.remove(i as usize - 1);
                Ok(Data::Array(items))
            }
            Data::Map(map) => {
                let mut map = map.clone();
                if map.remove(&key.to_string()).is_none() {
                    return Err(EngineError::eval(format!(
                        "the datamap has no entry named {key}"
                    )));
                }
                Ok(Data::Map(map))
            }
            other => Err(EngineError::unsupported(format!(
                "cannot delete members of a {}",
                other.type_name()
            ))),
        }
    }

    /// Arithmetic and boolean operators, with the type-specific meanings:
    /// array concatenation, set union/difference, color channel averaging.
    pub fn operate(&self, op: Op, rhs: &Data) -> Result<Data, EngineError> {
        let fail = || {
            Err(EngineError::unsupported(format!(
                "cannot use {} between a {} and a {}",
                op.symbol(),
                self.type_name(),
                rhs.type_name()
            )))
        };
        match (self, rhs) {
            (Data::Number(a), Data::Number(b)) => {
                let n = match op {
                    Op::Add => a + b,
                    Op::Subtract => a - b,
                    Op::Multiply => a * b,
                    Op::Divide => {
                        if *b == 0.0 {
                            return Err(EngineError::eval("cannot divide by zero"));
                        }
                        a / b
                    }
                    Op::Modulo => {
                        if *b == 0.0 {
                            return Err(EngineError::eval("cannot modulo by zero"));
                        }
                        a % b
                    }
                    Op::And | Op::Or => return fail(),
                };
                Ok(Data::Number(n))
            }
            (Data::Str(a), Data::Str(b)) => match op {
                Op::Add => Ok(Data::Str(format!("{a}{b}"))),
                _ => fail(),
            },
            (Data::Bool(a), Data::Bool(b)) => match op {
                Op::And => Ok(Data::Bool(*a && *b)),
                Op::Or => Ok(Data::Bool(*a || *b)),
                _ => fail(),
            },
            (Data::Array(a), Data::Array(b)) => match op {
                Op::Add => {
                    let mut out = a.clone();
                    out.extend(b.iter().cloned());
                    Ok(Data::Array(out))
                }
                Op::Subtract => Ok(Data::Array(
                    a.iter().filter(|x| !b.contains(x)).cloned().collect(),
                )),
                _ => fail(),
            },
            (Data::Set(a), Data::Set(b)) => match op {
                Op::Add => {
                    let mut out = a.clone();
                    out.extend(b.iter().cloned());
                    Ok(Data::set_from(out))
                }
                Op::Subtract => Ok(Data::set_from(
                    a.iter().filter(|x| !b.contains(x)).cloned().collect(),
                )),
                _ => fail(),
            },
            (Data::Map(a), Data::Map(b)) => match op {
                Op::Add => {
                    let mut out = a.clone();
                    for (k, entry) in b {
                        out.insert(k.clone(), entry.clone());
                    }
                    Ok(Data::Map(out))
                }
                _ => fail(),
            },
            (Data::Color(a), Data::Color(b)) => match op {
                Op::Add => Ok(Data::Color(a.mix(*b))),
                _ => fail(),
            },
            (Data::Changer(a), Data::Changer(b)) => match op {
                Op::Add => Ok(Data::Changer(a.clone().compose(b.clone()))),
                _ => fail(),
            },
            _ => fail(),
        }
    }

    /// Relational, containment, and type tests. `Is` is structural value
    /// equality; `Matches` is equality or right-hand type check; checkers
    /// quantify over their items on either side.
    pub fn test(&self, op: TestOp, rhs: &Data) -> Result<bool, EngineError> {
        // Quantifiers test lazily, element by element.
        if let Data::Checker(c) = self {
            let mut results = c.items.iter().map(|item| item.test(op, rhs));
            return if c.all {
                results.try_fold(true, |acc, r| Ok(acc && r?))
            } else {
                results.try_fold(false, |acc, r| Ok(acc || r?))
            };
        }
        if let Data::Checker(c) = rhs {
            let mut results = c.items.iter().map(|item| self.test(op, item));
            return if c.all {
                results.try_fold(true, |acc, r| Ok(acc && r?))
            } else {
                results.try_fold(false, |acc, r| Ok(acc || r?))
            };
        }

        match op {
            TestOp::Is => Ok(self == rhs),
            TestOp::Matches => match rhs {
                Data::Type(t) => Ok(self.is_of_type(*t)),
                _ => Ok(self == rhs),
            },
            TestOp::IsOfType => match rhs {
                Data::Type(t) => Ok(self.is_of_type(*t)),
                other => Err(EngineError::eval(format!(
                    "'is a' requires a datatype on the right, not a {}",
                    other.type_name()
                ))),
            },
            TestOp::Contains => match self {
                Data::Str(s) => match rhs {
                    Data::Str(needle) => Ok(s.contains(needle.as_str())),
                    _ => Ok(false),
                },
                Data::Array(items) | Data::Set(items) => Ok(items.contains(rhs)),
                Data::Map(map) => Ok(map.contains_key(&rhs.to_string())),
                other => Err(EngineError::unsupported(format!(
                    "a {} cannot contain values",
                    other.type_name()
                ))),
            },
            TestOp::Less | TestOp::Greater | TestOp::LessOrEqual | TestOp::GreaterOrEqual => {
                let ord = self.compare(rhs)?;
                Ok(match op {
                    TestOp::Less => ord == Ordering::Less,
                    TestOp::Greater => ord == Ordering::Greater,
                    TestOp::LessOrEqual => ord != Ordering::Greater,
                    TestOp::GreaterOrEqual => ord != Ordering::Less,
                    _ => unreachable!(),
                })
            }
        }
    }

    /// Ordering for relational tests and `(sorted:)`: numbers compare
    /// numerically, strings by the alphanumeric comparator.
    pub fn compare(&self, rhs: &Data) -> Result<Ordering, EngineError> {
        match (self, rhs) {
            (Data::Number(a), Data::Number(b)) => {
                a.partial_cmp(b).ok_or_else(|| EngineError::eval("cannot order NaN"))
            }
            (Data::Str(a), Data::Str(b)) => Ok(natural_cmp(a, b)),
            _ => Err(EngineError::unsupported(format!(
                "cannot order a {} against a {}",
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    /// Unary operators.
    pub fn unary(&self, op: UnaryOp) -> Result<Data, EngineError> {
        match (op, self) {
            (UnaryOp::Not, Data::Bool(b)) => Ok(Data::Bool(!b)),
            (UnaryOp::Negate, Data::Number(n)) => Ok(Data::Number(-n)),
            (UnaryOp::Not, other) => Err(EngineError::unsupported(format!(
                "cannot use 'not' on a {}",
                other.type_name()
            ))),
            (UnaryOp::Negate, other) => Err(EngineError::unsupported(format!(
                "cannot negate a {}",
                other.type_name()
            ))),
        }
    }

    /// Expand a collection into individual values for a spread argument.
    pub fn spread(&self) -> Result<Vec<Data>, EngineError> {
        match self {
            Data::Array(items) | Data::Set(items) => Ok(items.clone()),
            Data::Str(s) => Ok(s.chars().map(|c| Data::Str(c.to_string())).collect()),
            other => Err(EngineError::unsupported(format!(
                "a {} cannot be spread into arguments",
                other.type_name()
            ))),
        }
    }
}
